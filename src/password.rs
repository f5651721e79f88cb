//! Cipher password context.
//!
//! Earlier revisions of this format's readers kept one process-wide
//! password pointer; here the secret lives in an explicit
//! [`CipherContext`] handle passed to every unpack call, so concurrent
//! loads with different passwords cannot race. A caller wanting a
//! "current default" simply holds one context. The context has no
//! internal lock: mutation must be externally serialized relative to
//! unpack calls sharing the same handle.

use tracing::warn;
use zeroize::{Zeroize, Zeroizing};

/// Default password used by the rrespacker tool when none is supplied.
/// Known and public: padding for unprotected archives, not a
/// production secret.
pub const DEFAULT_PASSWORD: &str = "password12345";

/// Maximum password length in bytes; the 16-byte buffer keeps at least
/// one byte of zero padding.
pub const MAX_PASSWORD_LEN: usize = 15;

/// Holds the zero-padded cipher password for the unpack pipeline.
///
/// The buffer is wiped on [`clear`](Self::clear) and on drop.
#[derive(Default)]
pub struct CipherContext {
    buffer: [u8; 16],
    set: bool,
}

impl CipherContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context pre-loaded with a password; longer-than-maximum inputs
    /// leave the context on the default password (see
    /// [`set_password`](Self::set_password)).
    pub fn with_password(pass: &str) -> Self {
        let mut ctx = Self::new();
        ctx.set_password(pass);
        ctx
    }

    /// Install `pass` as the cipher password.
    ///
    /// Passwords longer than [`MAX_PASSWORD_LEN`] bytes are rejected,
    /// not truncated: a warning is logged and the previous password is
    /// left unchanged.
    pub fn set_password(&mut self, pass: &str) {
        if pass.len() > MAX_PASSWORD_LEN {
            warn!(
                "cipher password of {} bytes exceeds the {MAX_PASSWORD_LEN}-byte maximum, keeping previous password",
                pass.len()
            );
            return;
        }
        self.buffer.zeroize();
        self.buffer[..pass.len()].copy_from_slice(pass.as_bytes());
        self.set = true;
    }

    /// Current password as text, without the zero padding. Falls back
    /// to [`DEFAULT_PASSWORD`] when none has been set.
    pub fn password(&self) -> &str {
        if !self.set {
            return DEFAULT_PASSWORD;
        }
        let end = self.buffer.iter().position(|&b| b == 0).unwrap_or(16);
        // The buffer only ever holds bytes copied from a &str.
        std::str::from_utf8(&self.buffer[..end]).unwrap_or("")
    }

    /// The 16-byte zero-padded buffer handed to key derivation. The
    /// padding participates in derivation (wire contract).
    pub(crate) fn password_bytes(&self) -> Zeroizing<[u8; 16]> {
        let mut buf = Zeroizing::new([0u8; 16]);
        if self.set {
            buf.copy_from_slice(&self.buffer);
        } else {
            buf[..DEFAULT_PASSWORD.len()].copy_from_slice(DEFAULT_PASSWORD.as_bytes());
        }
        buf
    }

    /// Overwrite the buffer with zeros and forget that a password was
    /// set; the next read yields the default again.
    pub fn clear(&mut self) {
        self.buffer.zeroize();
        self.set = false;
    }
}

impl Drop for CipherContext {
    fn drop(&mut self) {
        self.buffer.zeroize();
    }
}
