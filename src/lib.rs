pub mod archive;
pub mod checksum;
pub mod chunk;
pub mod crypto;
pub mod data;
pub mod directory;
pub mod error;
pub mod header;
pub mod password;
pub mod unpack;

pub use archive::ResourceArchive;
pub use checksum::compute_crc32;
pub use chunk::{ChunkData, ChunkInfo, CipherType, CompressionType, ResourceChunk, ResourceDataType};
pub use directory::{CentralDir, DirEntry, MAX_FILENAME_SIZE};
pub use error::{Error, Result};
pub use header::{FileHeader, RRES_MAGIC, RRES_VERSION};
pub use password::{CipherContext, DEFAULT_PASSWORD};
pub use unpack::{unpack_chunk, UnpackError};
