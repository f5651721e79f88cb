//! Key derivation and the two cipher suites used by rrespacker archives.
//!
//! Key derivation: Argon2i(password, salt) → 32-byte key, with a
//! 16 MiB working set, 3 passes, single lane (the parameters the
//! packer encrypts with). The password input is always the full 16-byte
//! zero-padded buffer; the padding participates in derivation.
//!
//! Trailer layouts are a wire contract with the packer and must not
//! change (`packed_size` includes the trailer bytes):
//!
//! - AES-256-CTR:        `[ ciphertext | salt (16) | MD5 (16) ]`
//! - XChaCha20-Poly1305: `[ ciphertext | salt (16) | nonce (24) | tag (16) ]`
//!
//! Key, salt and nonce buffers are wiped before being discarded, on
//! success and on failure.

use aes::cipher::{KeyIvInit, StreamCipher};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{Key, KeyInit, Tag, XChaCha20Poly1305, XNonce};
use thiserror::Error;
use zeroize::Zeroizing;

/// salt[16] + MD5[16] appended after AES-CTR ciphertext.
pub const AES_TRAILER_SIZE: usize = 16 + 16;
/// salt[16] + nonce[24] + tag[16] appended after XChaCha20 ciphertext.
pub const XCHACHA20_TRAILER_SIZE: usize = 16 + 24 + 16;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("decryption failed — wrong password or corrupted data")]
    DecryptionFailed,

    #[error("encrypted payload too short: {actual} bytes, trailer alone is {trailer}")]
    TooShort { actual: usize, trailer: usize },
}

/// Derive the 256-bit chunk key from the zero-padded password buffer
/// and the salt recovered from the payload trailer.
pub fn derive_key(
    password: &[u8; 16],
    salt: &[u8; 16],
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let params = Params::new(16 * 1024, 3, 1, Some(32))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2i, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password, salt, &mut *key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Decrypt an AES-256-CTR payload and verify its trailing MD5 digest.
///
/// The counter block starts at zero and increments big-endian, matching
/// the packer's stream cipher. Integrity comes from recomputing MD5
/// over the plaintext and comparing it byte-for-byte with the stored
/// digest: a mismatch means wrong password or corrupted ciphertext.
pub fn decrypt_aes_ctr(packed: &[u8], password: &[u8; 16]) -> Result<Vec<u8>, CryptoError> {
    if packed.len() < AES_TRAILER_SIZE {
        return Err(CryptoError::TooShort {
            actual: packed.len(),
            trailer: AES_TRAILER_SIZE,
        });
    }
    let cipher_len = packed.len() - AES_TRAILER_SIZE;

    let mut salt = Zeroizing::new([0u8; 16]);
    salt.copy_from_slice(&packed[cipher_len..cipher_len + 16]);
    let stored_md5 = &packed[cipher_len + 16..];

    let key = derive_key(password, &salt)?;

    let mut plaintext = packed[..cipher_len].to_vec();
    let mut cipher = Aes256Ctr::new_from_slices(&key[..], &[0u8; 16])
        .map_err(|_| CryptoError::DecryptionFailed)?;
    cipher.apply_keystream(&mut plaintext);

    let digest = md5::compute(&plaintext);
    if digest.0.as_slice() != stored_md5 {
        return Err(CryptoError::DecryptionFailed);
    }
    Ok(plaintext)
}

/// Open an XChaCha20-Poly1305 payload (detached tag, empty associated
/// data). Verification and decryption are a single atomic call; a bad
/// tag means wrong password or corrupted ciphertext.
pub fn decrypt_xchacha20_poly1305(
    packed: &[u8],
    password: &[u8; 16],
) -> Result<Vec<u8>, CryptoError> {
    if packed.len() < XCHACHA20_TRAILER_SIZE {
        return Err(CryptoError::TooShort {
            actual: packed.len(),
            trailer: XCHACHA20_TRAILER_SIZE,
        });
    }
    let cipher_len = packed.len() - XCHACHA20_TRAILER_SIZE;

    let mut salt = Zeroizing::new([0u8; 16]);
    salt.copy_from_slice(&packed[cipher_len..cipher_len + 16]);
    let mut nonce = Zeroizing::new([0u8; 24]);
    nonce.copy_from_slice(&packed[cipher_len + 16..cipher_len + 40]);
    let tag = &packed[cipher_len + 40..];

    let key = derive_key(password, &salt)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let mut plaintext = packed[..cipher_len].to_vec();
    cipher
        .decrypt_in_place_detached(
            XNonce::from_slice(&nonce[..]),
            b"",
            &mut plaintext,
            Tag::from_slice(tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(plaintext)
}
