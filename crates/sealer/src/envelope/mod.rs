//! The persisted envelope: the only place raw cryptographic bytes cross into text.
//!
//! # Format
//!
//! ```text
//! {
//!     "nonce": "<base64 of 12 bytes>",
//!     "ciphertext": "<base64 of N bytes>",
//!     "tag": "<base64 of 16 bytes>"
//! }
//! ```
//!
//! Standard base64 with padding. Field names are exact and required; order
//! and unknown extra fields are ignored on read.

pub mod codec;

pub use codec::{decode, encode, from_json, to_json, EnvelopeError};
