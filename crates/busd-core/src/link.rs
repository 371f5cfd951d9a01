//! The capability surface of one transport connection to an adjacent daemon.
//!
//! Routing code never owns a connection's I/O machinery; it sees a
//! [`RemoteLink`]: a prompt `send`, an observable closing state, and the
//! session-use-count contract. The count tracks how many active sessions
//! route through the link and is deliberately distinct from the `Arc`
//! reference count that keeps the link object alive — the link's owner
//! decides teardown when the session count returns to zero.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::message::Message;

/// Stable identity of a transport link.
///
/// Membership and removal in routing tables compare by id, never by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send failures reported by a link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The link is mid-teardown and cannot accept traffic. Routing treats
    /// this as a cue to fail over to another candidate.
    #[error("link is closing")]
    Closing,

    /// Any other transport-level send failure.
    #[error("send failed: {0}")]
    Send(String),
}

/// One transport connection to an adjacent daemon.
///
/// `send` must be prompt: it either queues the message or returns an error,
/// and never blocks indefinitely — callers hold routing locks across it.
pub trait RemoteLink: Send + Sync {
    /// Stable identity of this link.
    fn id(&self) -> ConnectionId;

    /// Unique name of the daemon on the far side.
    fn remote_name(&self) -> &str;

    /// Queue a message for transmission.
    fn send(&self, msg: &Message) -> Result<(), LinkError>;

    /// Record that one more session routes through this link.
    fn add_session_ref(&self);

    /// Record that one session no longer routes through this link.
    ///
    /// When the count returns to zero the link's owner may retire it.
    fn release_session_ref(&self);

    /// Number of sessions currently routed through this link.
    fn session_refs(&self) -> usize;

    /// Whether the link is mid-teardown.
    fn is_closing(&self) -> bool;
}

impl core::fmt::Debug for dyn RemoteLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RemoteLink")
            .field("id", &self.id())
            .field("remote_name", &self.remote_name())
            .field("session_refs", &self.session_refs())
            .field("is_closing", &self.is_closing())
            .finish()
    }
}

/// Shared ownership handle for a link.
pub type LinkRef = Arc<dyn RemoteLink>;
