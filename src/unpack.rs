//! Two-stage unpack pipeline: decryption, then decompression.
//!
//! Each stage is skipped when its algorithm code is "none" and the
//! stages short-circuit on the first failure, so exactly one result is
//! produced per call. A stage that runs rewrites its algorithm field in
//! the chunk record to "none" and adjusts `packed_size`; once either
//! stage has run, the fully decoded buffer is reinterpreted under the
//! canonical `propCount | props | raw` layout and the chunk's
//! properties and raw bytes are repopulated in place.

use thiserror::Error;
use tracing::{debug, warn};

use crate::chunk::{ChunkData, CipherType, CompressionType, ResourceChunk};
use crate::crypto::{self, AES_TRAILER_SIZE, XCHACHA20_TRAILER_SIZE};
use crate::password::CipherContext;

/// Pipeline failure. Variants 1–4 map onto the result codes the format
/// defines for its unpack operation (0 is success); see
/// [`code`](Self::code).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpackError {
    /// Result code 1: the record declares a cipher this reader does not
    /// implement.
    #[error("chunk cipher algorithm not supported")]
    UnsupportedCipher,

    /// Result code 2: integrity check failed, wrong password or
    /// corrupted ciphertext.
    #[error("wrong password or corrupted ciphertext")]
    WrongPassword,

    /// Result code 3: the record declares a compression algorithm this
    /// reader does not implement.
    #[error("chunk compression algorithm not supported")]
    UnsupportedCompression,

    /// Result code 4: the decompressor rejected the data.
    #[error("chunk data decompression failed")]
    DecompressionFailed,

    /// The decoded buffer does not match the declared property layout.
    /// Data-corruption family; reports the legacy code 4.
    #[error("decoded payload layout is malformed: {0}")]
    MalformedLayout(String),
}

impl UnpackError {
    /// Numeric result code as defined by the format (1–4; 0 is
    /// success and never constructed as an error).
    pub fn code(&self) -> u32 {
        match self {
            Self::UnsupportedCipher => 1,
            Self::WrongPassword => 2,
            Self::UnsupportedCompression => 3,
            Self::DecompressionFailed | Self::MalformedLayout(_) => 4,
        }
    }
}

/// Run the unpack pipeline over `chunk` in place.
///
/// On success the chunk's payload holds decoded bytes, its properties
/// are populated, and its record reads `comp_type == None`,
/// `cipher_type == None`. On failure the chunk is left untouched except
/// for stages that already completed.
pub fn unpack_chunk(chunk: &mut ResourceChunk, ctx: &CipherContext) -> Result<(), UnpackError> {
    let mut changed = false;

    // STEP 1: data decryption
    match chunk.info.cipher_type {
        CipherType::None => {}
        CipherType::Aes => {
            let password = ctx.password_bytes();
            let plaintext = crypto::decrypt_aes_ctr(&chunk.data.raw, &password)
                .map_err(|e| decryption_failure(chunk, e))?;
            chunk.info.packed_size -= AES_TRAILER_SIZE as u32;
            chunk.data.raw = plaintext;
            chunk.info.cipher_type = CipherType::None;
            changed = true;
            debug!(
                "[{}] data decrypted successfully (AES-CTR)",
                chunk.info.type_str()
            );
        }
        CipherType::Xchacha20Poly1305 => {
            let password = ctx.password_bytes();
            let plaintext = crypto::decrypt_xchacha20_poly1305(&chunk.data.raw, &password)
                .map_err(|e| decryption_failure(chunk, e))?;
            chunk.info.packed_size -= XCHACHA20_TRAILER_SIZE as u32;
            chunk.data.raw = plaintext;
            chunk.info.cipher_type = CipherType::None;
            changed = true;
            debug!(
                "[{}] data decrypted successfully (XChaCha20-Poly1305)",
                chunk.info.type_str()
            );
        }
        CipherType::Xor
        | CipherType::Des
        | CipherType::Tdes
        | CipherType::Idea
        | CipherType::AesGcm
        | CipherType::Xtea
        | CipherType::Blowfish
        | CipherType::Rsa
        | CipherType::Salsa20
        | CipherType::Chacha20
        | CipherType::Xchacha20
        | CipherType::Unknown(_) => {
            warn!(
                "[{}] chunk data encryption algorithm not supported (code {})",
                chunk.info.type_str(),
                chunk.info.cipher_type.code()
            );
            return Err(UnpackError::UnsupportedCipher);
        }
    }

    // STEP 2: data decompression
    match chunk.info.comp_type {
        CompressionType::None => {}
        CompressionType::Lz4 => {
            let base_size = chunk.info.base_size as usize;
            let decompressed =
                lz4_flex::decompress(&chunk.data.raw, base_size).map_err(|e| {
                    warn!(
                        "[{}] chunk data decompression failed: {e}",
                        chunk.info.type_str()
                    );
                    UnpackError::DecompressionFailed
                })?;
            if decompressed.len() != base_size {
                warn!(
                    "decompressed data could be corrupted, unexpected size (expected {base_size}, got {})",
                    decompressed.len()
                );
            }
            chunk.info.packed_size = decompressed.len() as u32;
            chunk.data.raw = decompressed;
            chunk.info.comp_type = CompressionType::None;
            changed = true;
            debug!(
                "[{}] data decompressed successfully (LZ4)",
                chunk.info.type_str()
            );
        }
        CompressionType::Rle
        | CompressionType::Deflate
        | CompressionType::Lzma2
        | CompressionType::Qoi
        | CompressionType::Unknown(_) => {
            warn!(
                "[{}] chunk data compression algorithm not supported (code {})",
                chunk.info.type_str(),
                chunk.info.comp_type.code()
            );
            return Err(UnpackError::UnsupportedCompression);
        }
    }

    // The decoded buffer now contains propCount + props + raw; rebuild
    // the in-memory view from it.
    if changed {
        chunk.data = ChunkData::parse_properties(&chunk.data.raw)
            .map_err(|e| UnpackError::MalformedLayout(e.to_string()))?;
    }

    Ok(())
}

fn decryption_failure(chunk: &ResourceChunk, err: crypto::CryptoError) -> UnpackError {
    warn!(
        "[{}] data decryption failed, wrong password or corrupted data: {err}",
        chunk.info.type_str()
    );
    UnpackError::WrongPassword
}
