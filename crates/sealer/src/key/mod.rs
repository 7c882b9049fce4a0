//! Key lifecycle: load, first-run generation, and guarded persistence.
//!
//! # Lifecycle
//!
//! 1. The CLI builds a [`KeyStore`] for the configured key path and passes it
//!    (or the key it yields) into every operation; there is no global key.
//! 2. [`KeyStore::load_or_create`] returns the existing key verbatim, or
//!    generates one and publishes it with an atomic create-if-absent.
//! 3. [`KeyStore::save`] never replaces an existing key unless overwrite is
//!    explicitly requested (`sealer keygen --force`).
//!
//! # Security invariants
//!
//! - Key bytes are never logged; only [`SymmetricKey::fingerprint`] is.
//! - Losing the key file makes every envelope it produced unrecoverable.

pub mod material;
pub mod store;

pub use material::SymmetricKey;
pub use store::{KeyError, KeyStore};

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;
