//! AES-256-GCM payload encryption primitives.
//!
//! This module is intentionally free of filesystem and serialisation concerns.
//! It provides the raw encrypt/decrypt operations used by the pipeline; the
//! envelope codec turns a [`SealedPayload`] into text and back.
//!
//! # Sizes
//!
//! ```text
//! key 32 bytes | nonce 12 bytes (random per call) | tag 16 bytes (detached)
//! ```

pub mod cipher;

pub use cipher::{CipherError, SealedPayload, NONCE_LEN, TAG_LEN};
