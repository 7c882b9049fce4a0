//! [`SymmetricKey`]: the in-memory form of the long-lived AES-256 key.

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::{KeyError, KEY_LEN};

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// When this type is dropped, the memory is overwritten with zeroes to
/// minimise the window during which key material lives in RAM.
#[derive(Clone)]
pub struct SymmetricKey(Box<[u8; KEY_LEN]>);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    /// Copy key bytes out of a slice.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] if the slice is not [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEY_LEN {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut buf = Box::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut buf[..]);
        Self(buf)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Non-secret identifier for logs: hex of the first 8 bytes of SHA-256(key).
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_slice());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("SymmetricKey([REDACTED])")
    }
}
