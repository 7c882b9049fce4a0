//! Shared error taxonomy and envelope/report types for the `file-sealer` crates.

pub mod error;
pub mod protocol;

pub use error::SealError;
pub use protocol::EnvelopeDocument;
