//! Registry of live transport links.
//!
//! One registry is created at daemon startup and passed by reference to
//! whatever needs link lookup; there is no process-global list.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::link::{ConnectionId, LinkRef};

/// Registry errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A link with the same id is already registered.
    #[error("link {0} is already registered")]
    AlreadyRegistered(ConnectionId),
}

/// Owned map of live links by id.
#[derive(Default)]
pub struct LinkRegistry {
    links: Mutex<HashMap<ConnectionId, LinkRef>>,
}

impl LinkRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link under its id.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyRegistered`] when the id is taken.
    pub fn register(&self, link: LinkRef) -> Result<(), RegistryError> {
        let id = link.id();
        let mut links = self.links.lock();
        if links.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        debug!(link = %id, remote = %link.remote_name(), "link registered");
        links.insert(id, link);
        Ok(())
    }

    /// Remove and return the link with the given id.
    pub fn deregister(&self, id: ConnectionId) -> Option<LinkRef> {
        let removed = self.links.lock().remove(&id);
        if removed.is_some() {
            debug!(link = %id, "link deregistered");
        }
        removed
    }

    /// Look up a link by id.
    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<LinkRef> {
        self.links.lock().get(&id).cloned()
    }

    /// Number of registered links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.lock().len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.lock().is_empty()
    }

    /// Ids of all registered links, in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.links.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl fmt::Debug for LinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::link::{LinkError, RemoteLink};
    use crate::message::Message;

    struct StubLink {
        id: ConnectionId,
        name: String,
    }

    impl StubLink {
        fn new(id: u64, name: &str) -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(id),
                name: name.to_owned(),
            })
        }
    }

    impl RemoteLink for StubLink {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn remote_name(&self) -> &str {
            &self.name
        }

        fn send(&self, _msg: &Message) -> Result<(), LinkError> {
            Ok(())
        }

        fn add_session_ref(&self) {}

        fn release_session_ref(&self) {}

        fn session_refs(&self) -> usize {
            0
        }

        fn is_closing(&self) -> bool {
            false
        }
    }

    #[test]
    fn register_then_get() {
        let registry = LinkRegistry::new();
        registry.register(StubLink::new(1, ":bus.1")).unwrap();

        let link = registry.get(ConnectionId::new(1)).expect("registered");
        assert_eq!(link.remote_name(), ":bus.1");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = LinkRegistry::new();
        registry.register(StubLink::new(1, ":bus.1")).unwrap();

        let err = registry.register(StubLink::new(1, ":bus.2")).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered(ConnectionId::new(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_returns_the_link() {
        let registry = LinkRegistry::new();
        registry.register(StubLink::new(3, ":bus.3")).unwrap();

        let removed = registry.deregister(ConnectionId::new(3)).expect("present");
        assert_eq!(removed.id(), ConnectionId::new(3));
        assert!(registry.is_empty());
        assert!(registry.deregister(ConnectionId::new(3)).is_none());
    }

    #[test]
    fn ids_are_sorted() {
        let registry = LinkRegistry::new();
        registry.register(StubLink::new(9, ":bus.9")).unwrap();
        registry.register(StubLink::new(2, ":bus.2")).unwrap();
        registry.register(StubLink::new(5, ":bus.5")).unwrap();

        let ids: Vec<u64> = registry.ids().into_iter().map(ConnectionId::raw).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
