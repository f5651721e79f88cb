//! Chunk records and chunk payloads.
//!
//! A resource is stored as one or more 32-byte chunk records, each
//! followed by `packed_size` payload bytes. When a payload is neither
//! compressed nor encrypted it carries the canonical layout
//! `propCount u32 | props[propCount] u32 | raw bytes`; otherwise it is
//! opaque until run through [`crate::unpack::unpack_chunk`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use tracing::warn;

use crate::checksum::compute_crc32;
use crate::error::{Error, Result};

/// Resource kind identified by the record's FourCC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDataType {
    Null,
    Raw,
    Text,
    Image,
    Wave,
    Vertex,
    FontGlyphs,
    Link,
    Directory,
}

impl ResourceDataType {
    pub fn from_four_cc(four_cc: &[u8; 4]) -> Option<Self> {
        match four_cc {
            b"NULL" => Some(Self::Null),
            b"RAWD" => Some(Self::Raw),
            b"TEXT" => Some(Self::Text),
            b"IMGE" => Some(Self::Image),
            b"WAVE" => Some(Self::Wave),
            b"VRTX" => Some(Self::Vertex),
            b"FNTG" => Some(Self::FontGlyphs),
            b"LINK" => Some(Self::Link),
            b"CDIR" => Some(Self::Directory),
            _ => None,
        }
    }
}

/// Compression algorithm declared by a chunk record.
///
/// All codes defined by the format are carried; only `None` and `Lz4`
/// are decodable, the rest surface as result code 3 during unpack.
/// Codes the format does not define at all land in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Rle,
    Deflate,
    Lz4,
    Lzma2,
    Qoi,
    Unknown(u8),
}

impl CompressionType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Rle,
            10 => Self::Deflate,
            20 => Self::Lz4,
            30 => Self::Lzma2,
            40 => Self::Qoi,
            n => Self::Unknown(n),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Rle => 1,
            Self::Deflate => 10,
            Self::Lz4 => 20,
            Self::Lzma2 => 30,
            Self::Qoi => 40,
            Self::Unknown(n) => n,
        }
    }
}

/// Cipher algorithm declared by a chunk record.
///
/// Same carrying rule as [`CompressionType`]: every defined code parses,
/// only `None`, `Aes` and `Xchacha20Poly1305` are decodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherType {
    None,
    Xor,
    Des,
    Tdes,
    Idea,
    Aes,
    AesGcm,
    Xtea,
    Blowfish,
    Rsa,
    Salsa20,
    Chacha20,
    Xchacha20,
    Xchacha20Poly1305,
    Unknown(u8),
}

impl CipherType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Xor,
            10 => Self::Des,
            11 => Self::Tdes,
            20 => Self::Idea,
            30 => Self::Aes,
            31 => Self::AesGcm,
            40 => Self::Xtea,
            50 => Self::Blowfish,
            60 => Self::Rsa,
            70 => Self::Salsa20,
            71 => Self::Chacha20,
            72 => Self::Xchacha20,
            73 => Self::Xchacha20Poly1305,
            n => Self::Unknown(n),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Xor => 1,
            Self::Des => 10,
            Self::Tdes => 11,
            Self::Idea => 20,
            Self::Aes => 30,
            Self::AesGcm => 31,
            Self::Xtea => 40,
            Self::Blowfish => 50,
            Self::Rsa => 60,
            Self::Salsa20 => 70,
            Self::Chacha20 => 71,
            Self::Xchacha20 => 72,
            Self::Xchacha20Poly1305 => 73,
            Self::Unknown(n) => n,
        }
    }
}

/// Chunk record (32 bytes on disk).
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    /// FourCC type tag.
    pub type_tag: [u8; 4],
    /// Caller-chosen resource id; shared by every record of a linked
    /// resource.
    pub id: u32,
    pub comp_type: CompressionType,
    pub cipher_type: CipherType,
    pub flags: u16,
    /// On-disk payload length, cipher trailer bytes included.
    pub packed_size: u32,
    /// Fully decoded payload length.
    pub base_size: u32,
    /// Offset of the next record of the same resource, 0 = terminal.
    pub next_offset: u32,
    pub reserved: u32,
    /// CRC-32 of the payload as stored.
    pub crc32: u32,
}

impl ChunkInfo {
    /// Size of a chunk record on disk.
    pub const SIZE: usize = 32;

    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut type_tag = [0u8; 4];
        reader.read_exact(&mut type_tag)?;
        let id = reader.read_u32::<LittleEndian>()?;
        let comp_type = CompressionType::from_code(reader.read_u8()?);
        let cipher_type = CipherType::from_code(reader.read_u8()?);
        let flags = reader.read_u16::<LittleEndian>()?;
        let packed_size = reader.read_u32::<LittleEndian>()?;
        let base_size = reader.read_u32::<LittleEndian>()?;
        let next_offset = reader.read_u32::<LittleEndian>()?;
        let reserved = reader.read_u32::<LittleEndian>()?;
        let crc32 = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            type_tag,
            id,
            comp_type,
            cipher_type,
            flags,
            packed_size,
            base_size,
            next_offset,
            reserved,
            crc32,
        })
    }

    pub fn data_type(&self) -> Option<ResourceDataType> {
        ResourceDataType::from_four_cc(&self.type_tag)
    }

    /// True while the payload is compressed and/or encrypted.
    pub fn is_packed(&self) -> bool {
        self.comp_type != CompressionType::None || self.cipher_type != CipherType::None
    }

    /// FourCC as printable text, for diagnostics.
    pub fn type_str(&self) -> String {
        String::from_utf8_lossy(&self.type_tag).into_owned()
    }
}

/// Decoded chunk payload: declared integer properties plus raw bytes,
/// both exclusively owned.
#[derive(Debug, Clone, Default)]
pub struct ChunkData {
    pub props: Vec<u32>,
    pub raw: Vec<u8>,
}

impl ChunkData {
    /// Builds chunk data from a packed payload.
    ///
    /// When the record declares no compression and no cipher, the
    /// canonical property layout is parsed; otherwise the bytes are kept
    /// opaque (zero props) for [`crate::unpack::unpack_chunk`].
    pub fn from_packed(info: &ChunkInfo, packed: &[u8]) -> Result<Self> {
        if info.is_packed() {
            return Ok(Self {
                props: Vec::new(),
                raw: packed.to_vec(),
            });
        }
        Self::parse_properties(packed)
    }

    /// Parses the `propCount | props | raw` layout.
    ///
    /// The cursor is bounded by the actual buffer: a property count that
    /// does not fit the available bytes is an error, never an
    /// out-of-bounds read.
    pub(crate) fn parse_properties(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let prop_count = cursor.read_u32::<LittleEndian>().map_err(|_| {
            Error::MalformedPayload("payload shorter than the property count field".into())
        })?;

        let available = bytes.len() - 4;
        let prop_bytes = (prop_count as usize)
            .checked_mul(4)
            .filter(|&n| n <= available)
            .ok_or_else(|| {
                Error::MalformedPayload(format!(
                    "property count {prop_count} exceeds payload of {} bytes",
                    bytes.len()
                ))
            })?;

        let mut props = Vec::with_capacity(prop_count as usize);
        for _ in 0..prop_count {
            props.push(cursor.read_u32::<LittleEndian>()?);
        }
        let raw = bytes[4 + prop_bytes..].to_vec();
        Ok(Self { props, raw })
    }

    /// Reads `packed_size` payload bytes for `info` and decodes them.
    ///
    /// The stored CRC-32 is advisory: a mismatch logs a warning and the
    /// data is still returned.
    pub fn read_from<R: Read>(mut reader: R, info: &ChunkInfo) -> Result<Self> {
        let mut packed = vec![0u8; info.packed_size as usize];
        reader.read_exact(&mut packed)?;

        if compute_crc32(&packed) != info.crc32 {
            warn!(
                "[{}] id {:#010x}: CRC32 does not match, data can be corrupted",
                info.type_str(),
                info.id
            );
        }
        Self::from_packed(info, &packed)
    }
}

/// One loaded resource chunk: record plus decoded (or still-opaque)
/// payload.
#[derive(Debug, Clone)]
pub struct ResourceChunk {
    pub info: ChunkInfo,
    pub data: ChunkData,
}
