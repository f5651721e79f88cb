use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{Error, Result};

/// File signature, offset 0.
pub const RRES_MAGIC: &[u8; 4] = b"rres";
/// The single supported format version (1.0).
pub const RRES_VERSION: u16 = 100;

/// File header (16 bytes at offset 0).
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub id: [u8; 4],
    pub version: u16,
    /// Number of top-level chunk records following the header.
    pub chunk_count: u16,
    /// Byte offset of the central directory chunk, 0 = not present.
    pub cd_offset: u32,
    pub reserved: u32,
}

impl FileHeader {
    /// Size of the header on disk.
    pub const SIZE: usize = 16;

    /// Reads and validates the file header. Signature or version
    /// mismatch rejects the whole file.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut id = [0u8; 4];
        reader.read_exact(&mut id)?;
        if &id != RRES_MAGIC {
            return Err(Error::InvalidSignature(id));
        }
        let version = reader.read_u16::<LittleEndian>()?;
        if version != RRES_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let chunk_count = reader.read_u16::<LittleEndian>()?;
        let cd_offset = reader.read_u32::<LittleEndian>()?;
        let reserved = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            id,
            version,
            chunk_count,
            cd_offset,
            reserved,
        })
    }
}
