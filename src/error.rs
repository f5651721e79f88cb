//! Error types for archive reading.
//!
//! Pipeline errors (unsupported algorithm, wrong password, failed
//! decompression) live in [`crate::unpack::UnpackError`] and carry the
//! format's numeric result codes; everything here is structural.

use thiserror::Error;

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// IO error (open/read/seek failure, truncated header or record)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File signature is not `rres`
    #[error("invalid rres signature: expected \"rres\", got {0:?}")]
    InvalidSignature([u8; 4]),

    /// File version is not the single supported version constant
    #[error("unsupported rres version: {0}")]
    UnsupportedVersion(u16),

    /// Requested resource id is not present in the archive
    #[error("resource id {0:#010x} not found")]
    ResourceNotFound(u32),

    /// A chunk at a known offset carries the wrong FourCC
    #[error("expected a {expected} chunk, got \"{found}\"")]
    WrongChunkType { expected: &'static str, found: String },

    /// A `nextOffset` chain points at a record with a different id
    #[error("linked chunk at offset {offset:#x} has id {found:#010x}, expected {expected:#010x}")]
    BrokenChain { offset: u32, found: u32, expected: u32 },

    /// Payload bytes do not match their declared layout
    #[error("malformed chunk payload: {0}")]
    MalformedPayload(String),
}
