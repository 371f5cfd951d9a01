//! Core types for the busd data plane.
//!
//! This crate defines the vocabulary shared by the routing and crypto layers:
//! messages and their header-field layout, typed secret-material containers,
//! the transport-link capability trait, and the registry of live links.
//!
//! Routing policy lives in `busd-router`; message encryption in
//! `busd-crypto`. Nothing here performs I/O.

#![forbid(unsafe_code)]

use std::fmt;

pub mod keyblob;
pub mod link;
pub mod message;
pub mod registry;

pub use keyblob::{BlobType, KeyBlob};
pub use link::{ConnectionId, LinkError, LinkRef, RemoteLink};
pub use message::{COMPRESSIBLE, FIELD_COUNT, FieldId, HeaderFields, HeaderValue, Message};
pub use registry::{LinkRegistry, RegistryError};

/// Application-level session identifier.
///
/// Zero is reserved: it is never a bindable session and denotes "no session"
/// on a message, or the direct-link candidate set in routing contexts.
pub type SessionId = u32;

/// Unique name of a remote bus instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerName(String);

impl PeerName {
    /// Construct a peer name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
