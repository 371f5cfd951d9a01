//! In-memory test doubles for the busd data plane.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use busd_core::{ConnectionId, LinkError, Message, RemoteLink};

/// An in-memory [`RemoteLink`] with scriptable outcomes.
///
/// Records every send attempt and every accepted message serial, tracks the
/// session-use count, and can be flipped into the closing state or primed
/// with a one-shot failure.
pub struct MemoryLink {
    id: ConnectionId,
    name: String,
    session_refs: AtomicUsize,
    closing: AtomicBool,
    attempts: AtomicUsize,
    sent: Mutex<Vec<u32>>,
    fail_next: Mutex<Option<LinkError>>,
}

impl MemoryLink {
    /// Create a link with the given id and remote name.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(id),
            name: name.into(),
            session_refs: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
        })
    }

    /// Flip the closing state.
    pub fn set_closing(&self, closing: bool) {
        self.closing.store(closing, Ordering::Release);
    }

    /// Make the next send fail with `err`, once.
    pub fn fail_next_with(&self, err: LinkError) {
        *self.fail_next.lock() = Some(err);
    }

    /// Serials of every accepted message, in order.
    #[must_use]
    pub fn sent_serials(&self) -> Vec<u32> {
        self.sent.lock().clone()
    }

    /// Number of accepted messages.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Number of send attempts, accepted or not.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }
}

impl RemoteLink for MemoryLink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn remote_name(&self) -> &str {
        &self.name
    }

    fn send(&self, msg: &Message) -> Result<(), LinkError> {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        if self.closing.load(Ordering::Acquire) {
            return Err(LinkError::Closing);
        }
        self.sent.lock().push(msg.serial());
        Ok(())
    }

    fn add_session_ref(&self) {
        self.session_refs.fetch_add(1, Ordering::AcqRel);
    }

    fn release_session_ref(&self) {
        let prev = self.session_refs.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "session ref released below zero on link {}", self.id);
    }

    fn session_refs(&self) -> usize {
        self.session_refs.load(Ordering::Acquire)
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }
}
