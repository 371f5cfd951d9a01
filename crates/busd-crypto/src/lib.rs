//! Message encryption and header-digest primitives.
//!
//! Stateless transforms applied to a message's wire buffer on its way to or
//! from a transport link: authenticated encryption of the body region with
//! the session's negotiated key, and a digest over the canonical header
//! fields used to detect header tampering. Key negotiation itself happens
//! elsewhere; this crate only consumes the resulting key blobs.

#![forbid(unsafe_code)]

use thiserror::Error;

use busd_core::BlobType;

mod body;
mod digest;

pub use body::{EXPANSION_BYTES, NONCE_BYTES, decrypt, encrypt, message_nonce};
pub use digest::{DIGEST_BYTES, hash_header_fields};

/// Crypto-layer errors.
///
/// Decryption failures are deliberately collapsed into one variant: callers
/// (and the wire) learn that a message failed to decrypt, never which step
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// A malformed argument; nothing was transformed.
    #[error("invalid parameter: {0}")]
    InvalidParam(&'static str),

    /// The key blob's type cannot be used for message encryption.
    #[error("key type {0} cannot encrypt or decrypt messages")]
    UnsupportedKeyType(BlobType),

    /// The message failed to decrypt.
    #[error("message decryption failed")]
    DecryptFailed,
}
