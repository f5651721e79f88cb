//! Byte-level views over fully decoded chunks.
//!
//! These stop at "decoded bytes plus declared integer properties":
//! turning the result into a texture, an audio buffer, or a shaped
//! font is the embedder's job. Every accessor requires the chunk to be
//! fully unpacked first; run packed chunks through
//! [`crate::unpack::unpack_chunk`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

use crate::chunk::{ResourceChunk, ResourceDataType};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("chunk is \"{found}\", expected {expected}")]
    WrongType { expected: &'static str, found: String },

    #[error("chunk is still compressed or encrypted; unpack it first")]
    StillPacked,

    #[error("chunk properties missing or inconsistent: {0}")]
    BadProperties(String),

    #[error("declared size {declared} exceeds available payload of {available} bytes")]
    SizeMismatch { declared: usize, available: usize },

    #[error("text payload is not valid UTF-8")]
    InvalidText,
}

/// Text encoding declared in a TEXT chunk's second property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Undefined,
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Unknown(u32),
}

impl TextEncoding {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Undefined,
            1 => Self::Utf8,
            2 => Self::Utf8Bom,
            10 => Self::Utf16Le,
            11 => Self::Utf16Be,
            n => Self::Unknown(n),
        }
    }
}

/// Font style declared in an FNTG chunk's third property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Undefined,
    Regular,
    Bold,
    Italic,
    Unknown(u32),
}

impl FontStyle {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Undefined,
            1 => Self::Regular,
            2 => Self::Bold,
            3 => Self::Italic,
            n => Self::Unknown(n),
        }
    }
}

/// One glyph record from an FNTG chunk (32 bytes on disk).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontGlyphInfo {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Unicode codepoint value.
    pub value: i32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub advance_x: i32,
}

/// RAWD: raw file bytes. props[0] declares the byte size.
pub fn load_raw(chunk: &ResourceChunk) -> Result<Vec<u8>, DataError> {
    expect_type(chunk, ResourceDataType::Raw, "RAWD")?;
    expect_unpacked(chunk)?;
    let size = prop(chunk, 0, "raw size")? as usize;
    bounded(size, chunk.data.raw.len())?;
    Ok(chunk.data.raw[..size].to_vec())
}

/// TEXT: text bytes as a `String`. props[0] declares the byte size,
/// props[1] the encoding; only the UTF-8 encodings are representable.
pub fn load_text(chunk: &ResourceChunk) -> Result<String, DataError> {
    expect_type(chunk, ResourceDataType::Text, "TEXT")?;
    expect_unpacked(chunk)?;
    let size = prop(chunk, 0, "text size")? as usize;
    bounded(size, chunk.data.raw.len())?;

    let encoding = TextEncoding::from_code(chunk.data.props.get(1).copied().unwrap_or(0));
    let bytes = match encoding {
        TextEncoding::Undefined | TextEncoding::Utf8 => &chunk.data.raw[..size],
        // Strip the BOM the packer preserved.
        TextEncoding::Utf8Bom => chunk.data.raw[..size]
            .strip_prefix(&[0xEF, 0xBB, 0xBF][..])
            .unwrap_or(&chunk.data.raw[..size]),
        TextEncoding::Utf16Le | TextEncoding::Utf16Be | TextEncoding::Unknown(_) => {
            return Err(DataError::BadProperties(format!(
                "unsupported text encoding {encoding:?}"
            )))
        }
    };
    String::from_utf8(bytes.to_vec()).map_err(|_| DataError::InvalidText)
}

/// FNTG: the glyph table. props[3] declares the glyph count; the raw
/// buffer holds that many 32-byte glyph records.
pub fn load_font_glyphs(chunk: &ResourceChunk) -> Result<Vec<FontGlyphInfo>, DataError> {
    expect_type(chunk, ResourceDataType::FontGlyphs, "FNTG")?;
    expect_unpacked(chunk)?;
    let count = prop(chunk, 3, "glyph count")? as usize;
    bounded(count.saturating_mul(32), chunk.data.raw.len())?;

    let mut cursor = Cursor::new(chunk.data.raw.as_slice());
    let mut glyphs = Vec::with_capacity(count);
    for _ in 0..count {
        glyphs.push(FontGlyphInfo {
            x: read_i32(&mut cursor)?,
            y: read_i32(&mut cursor)?,
            width: read_i32(&mut cursor)?,
            height: read_i32(&mut cursor)?,
            value: read_i32(&mut cursor)?,
            offset_x: read_i32(&mut cursor)?,
            offset_y: read_i32(&mut cursor)?,
            advance_x: read_i32(&mut cursor)?,
        });
    }
    Ok(glyphs)
}

/// LINK: the path of an externally linked file. props[0] declares the
/// path size; the stored path may carry alignment padding.
pub fn link_path(chunk: &ResourceChunk) -> Result<String, DataError> {
    expect_type(chunk, ResourceDataType::Link, "LINK")?;
    expect_unpacked(chunk)?;
    let size = prop(chunk, 0, "link path size")? as usize;
    bounded(size, chunk.data.raw.len())?;

    let bytes = &chunk.data.raw[..size];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8(bytes[..end].to_vec()).map_err(|_| DataError::InvalidText)
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn expect_type(
    chunk: &ResourceChunk,
    expected: ResourceDataType,
    tag: &'static str,
) -> Result<(), DataError> {
    if chunk.info.data_type() != Some(expected) {
        return Err(DataError::WrongType {
            expected: tag,
            found: chunk.info.type_str(),
        });
    }
    Ok(())
}

fn expect_unpacked(chunk: &ResourceChunk) -> Result<(), DataError> {
    if chunk.info.is_packed() {
        return Err(DataError::StillPacked);
    }
    Ok(())
}

fn prop(chunk: &ResourceChunk, index: usize, what: &str) -> Result<u32, DataError> {
    chunk
        .data
        .props
        .get(index)
        .copied()
        .ok_or_else(|| DataError::BadProperties(format!("missing property {index} ({what})")))
}

fn bounded(declared: usize, available: usize) -> Result<(), DataError> {
    if declared > available {
        return Err(DataError::SizeMismatch {
            declared,
            available,
        });
    }
    Ok(())
}

fn read_i32(cursor: &mut Cursor<&[u8]>) -> Result<i32, DataError> {
    cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| DataError::BadProperties("glyph record overruns the payload".into()))
}
