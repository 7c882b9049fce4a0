//! AES-256-GCM encryption and decryption of whole payloads.
//!
//! **Nonces are never caller-chosen.** Every call to [`encrypt`] draws a fresh
//! 96-bit nonce from the OS CSPRNG. GCM nonce reuse under one key is
//! catastrophic: it breaks both confidentiality and authentication.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Nonce, Tag,
};
use thiserror::Error;
use tracing::debug;

use crate::key::SymmetricKey;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// The output of one authenticated encryption.
///
/// The ciphertext is exactly as long as the plaintext; the tag is detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Random nonce used for this encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted bytes.
    pub ciphertext: Vec<u8>,
    /// Authentication tag over nonce, ciphertext and associated data.
    pub tag: [u8; TAG_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// AES-GCM refused to encrypt (only reachable for payloads beyond the GCM length limit).
    #[error("aead encryption failed")]
    Encryption,

    /// Tag verification failed. No plaintext is released.
    #[error("authentication failed")]
    Authentication,
}

/// Encrypt `plaintext` under `key`, binding `associated_data` into the tag.
///
/// Pass an empty slice to bind no associated data.
///
/// # Errors
///
/// Returns [`CipherError::Encryption`] on an internal AEAD error (unreachable
/// for in-memory payloads).
pub fn encrypt(
    plaintext: &[u8],
    key: &SymmetricKey,
    associated_data: &[u8],
) -> Result<SealedPayload, CipherError> {
    let cipher = build_cipher(key);

    use aes_gcm::aead::rand_core::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), associated_data, &mut ciphertext)
        .map_err(|_| CipherError::Encryption)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    debug!(bytes = plaintext.len(), "payload encrypted");
    Ok(SealedPayload {
        nonce,
        ciphertext,
        tag: tag_bytes,
    })
}

/// Verify and decrypt a [`SealedPayload`].
///
/// The tag is checked before anything is returned; on mismatch the working
/// buffer is dropped and the caller receives only the error.
///
/// # Errors
///
/// Returns [`CipherError::Authentication`] if the key, associated data,
/// nonce, ciphertext or tag do not match what was sealed.
pub fn decrypt(
    payload: &SealedPayload,
    key: &SymmetricKey,
    associated_data: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key);
    let mut buffer = payload.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&payload.nonce),
            associated_data,
            &mut buffer,
            Tag::from_slice(&payload.tag),
        )
        .map_err(|_| CipherError::Authentication)?;
    Ok(buffer)
}

fn build_cipher(key: &SymmetricKey) -> Aes256Gcm {
    Aes256Gcm::new(key.as_bytes().into())
}
