//! Central directory: the CDIR chunk mapping resource names to ids.
//!
//! The directory is optional; archives packed without one simply force
//! callers to address resources by numeric id.

use byteorder::{LittleEndian, ReadBytesExt};
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{debug, info, warn};

use crate::chunk::{ChunkData, ChunkInfo, ResourceDataType};
use crate::error::{Error, Result};
use crate::header::FileHeader;

/// Upper bound on a directory entry's stored name length.
pub const MAX_FILENAME_SIZE: usize = 1024;

/// Fixed-field prefix of a directory entry: id, offset, reserved,
/// fileNameSize (4 × u32), followed by the name bytes.
const DIR_ENTRY_FIXED_SIZE: usize = 16;

/// One name→id mapping.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub id: u32,
    /// File offset of the resource's first chunk record.
    pub offset: u32,
    pub reserved: u32,
    /// Stored name bytes, verbatim (no terminator assumed). The packer
    /// pads names to 4-byte alignment with zeros.
    name: Vec<u8>,
}

impl DirEntry {
    /// Name as printable text, padding stripped.
    pub fn name(&self) -> Cow<'_, str> {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end])
    }

    /// Comparison bounded by the caller's name length, matching the
    /// stored field byte-for-byte from the start.
    fn matches(&self, name: &str) -> bool {
        self.name.starts_with(name.as_bytes())
    }
}

/// Decoded central directory.
#[derive(Debug, Clone, Default)]
pub struct CentralDir {
    pub entries: Vec<DirEntry>,
}

impl CentralDir {
    /// Load the directory chunk addressed by the file header.
    ///
    /// A zero `cd_offset` means the archive has no directory: that is
    /// informational, not an error, and yields an empty directory.
    pub(crate) fn read<R: Read + Seek>(mut reader: R, header: &FileHeader) -> Result<Self> {
        if header.cd_offset == 0 {
            info!("CDIR: no central directory available");
            return Ok(Self::default());
        }

        reader.seek(SeekFrom::Start(header.cd_offset as u64))?;
        let cd_info = ChunkInfo::read(&mut reader)?;
        if cd_info.data_type() != Some(ResourceDataType::Directory) {
            return Err(Error::WrongChunkType {
                expected: "CDIR",
                found: cd_info.type_str(),
            });
        }
        debug!("CDIR: central directory found at offset {:#010x}", header.cd_offset);

        // Directory chunks are stored uncompressed and unencrypted by
        // convention; the generic payload path decodes them.
        let cd_data = ChunkData::read_from(&mut reader, &cd_info)?;
        Self::parse(&cd_data)
    }

    /// Walk the decoded directory payload: props[0] is the entry count,
    /// raw holds the entries.
    fn parse(data: &ChunkData) -> Result<Self> {
        let count = data.props.first().copied().unwrap_or(0) as usize;
        if count > data.raw.len() / DIR_ENTRY_FIXED_SIZE {
            return Err(Error::MalformedPayload(format!(
                "directory entry count {count} exceeds payload of {} bytes",
                data.raw.len()
            )));
        }

        let mut cursor = Cursor::new(data.raw.as_slice());
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let id = read_field(&mut cursor)?;
            let offset = read_field(&mut cursor)?;
            let reserved = read_field(&mut cursor)?;
            let name_size = read_field(&mut cursor)? as usize;
            if name_size > MAX_FILENAME_SIZE {
                return Err(Error::MalformedPayload(format!(
                    "directory entry name length {name_size} exceeds maximum {MAX_FILENAME_SIZE}"
                )));
            }
            // Copy bounded by the stored length, never by a terminator.
            let mut name = vec![0u8; name_size];
            cursor.read_exact(&mut name).map_err(|_| {
                Error::MalformedPayload("directory entry name overruns the chunk payload".into())
            })?;
            entries.push(DirEntry {
                id,
                offset,
                reserved,
                name,
            });
        }

        debug!("CDIR: central directory file entries count: {}", entries.len());
        Ok(Self { entries })
    }

    /// Resolve `name` to a resource id. Linear scan, first match wins;
    /// returns 0 (the reserved invalid id) when absent.
    pub fn resource_id(&self, name: &str) -> u32 {
        for entry in &self.entries {
            if entry.matches(name) {
                return entry.id;
            }
        }
        warn!("resource name not found in central directory: {name}");
        0
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn read_field(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor.read_u32::<LittleEndian>().map_err(|_| {
        Error::MalformedPayload("directory entry overruns the chunk payload".into())
    })
}
