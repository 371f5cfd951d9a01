//! The per-peer route record.
//!
//! One [`SessionRouteTable`] exists per remote peer. It keeps two containers
//! behind a single lock: the insertion-ordered set of direct daemon-to-daemon
//! links the peer is reachable through, and the active session bindings.
//! Direct links are a registry with no use-count contract; every binding
//! holds exactly one session ref on its link, taken at bind time and released
//! exactly once when the binding goes away.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use busd_core::{ConnectionId, LinkError, LinkRef, Message, PeerName, SessionId};

/// Routing errors surfaced to the dispatch layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No entry in the table for the requested session.
    #[error("no route to {peer} for session {session_id}")]
    NoRoute {
        /// The peer this record routes for.
        peer: PeerName,
        /// The unresolved session.
        session_id: SessionId,
    },

    /// A bind precondition was not satisfied.
    #[error("route rejected for {peer}: {reason}")]
    RouteRejected {
        /// The peer this record routes for.
        peer: PeerName,
        /// Why the bind was refused.
        reason: &'static str,
    },

    /// Unbind named a session with no binding (strict mode only).
    #[error("no binding for session {session_id} on {peer}")]
    SessionNotBound {
        /// The peer this record routes for.
        peer: PeerName,
        /// The unknown session.
        session_id: SessionId,
    },

    /// The chosen link refused the message.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Route-table behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterConfig {
    strict_unbind: bool,
}

impl RouterConfig {
    /// Defaults: unbinding an unknown session logs and succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface unbind of an unknown session as an error instead of logging.
    #[must_use]
    pub const fn with_strict_unbind(mut self, strict: bool) -> Self {
        self.strict_unbind = strict;
        self
    }
}

#[derive(Default)]
struct Routes {
    /// Direct-link candidates, in insertion order.
    direct: Vec<LinkRef>,
    /// Active bindings; insertion order kept per session.
    bound: BTreeMap<SessionId, Vec<LinkRef>>,
}

impl Routes {
    fn has_direct(&self, id: ConnectionId) -> bool {
        self.direct.iter().any(|link| link.id() == id)
    }

    fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.bound.is_empty()
    }
}

/// Routing record for one remote peer.
///
/// Every operation takes the record's single lock for its whole duration,
/// including the send attempts inside [`forward`](Self::forward) — links are
/// required to send promptly, so the lock is never held across indefinite
/// blocking.
pub struct SessionRouteTable {
    peer: PeerName,
    config: RouterConfig,
    routes: Mutex<Routes>,
}

impl SessionRouteTable {
    /// Create the record for `peer`, reachable through `first_link`.
    #[must_use]
    pub fn new(peer: PeerName, first_link: LinkRef) -> Self {
        Self::with_config(peer, first_link, RouterConfig::default())
    }

    /// Create the record with explicit behavior knobs.
    #[must_use]
    pub fn with_config(peer: PeerName, first_link: LinkRef, config: RouterConfig) -> Self {
        Self {
            peer,
            config,
            routes: Mutex::new(Routes {
                direct: vec![first_link],
                bound: BTreeMap::new(),
            }),
        }
    }

    /// The peer this record routes for.
    #[must_use]
    pub const fn peer(&self) -> &PeerName {
        &self.peer
    }

    /// Deliver `msg` on the session carried in its header.
    ///
    /// # Errors
    /// See [`forward_on_session`](Self::forward_on_session).
    pub fn forward(&self, msg: &Message) -> Result<(), RouteError> {
        self.forward_on_session(msg, msg.session_id())
    }

    /// Deliver `msg` on `session_id`.
    ///
    /// Session 0 delivers over the direct-link candidates. Candidates are
    /// tried in order; a link reporting [`LinkError::Closing`] is skipped in
    /// favor of the next one, and any other outcome ends the scan.
    ///
    /// # Errors
    /// [`RouteError::NoRoute`] when the table has no entry for the session;
    /// otherwise the outcome of the last attempted send.
    pub fn forward_on_session(&self, msg: &Message, session_id: SessionId) -> Result<(), RouteError> {
        let routes = self.routes.lock();
        let candidates: &[LinkRef] = if session_id == 0 {
            &routes.direct
        } else {
            routes.bound.get(&session_id).map_or(&[], Vec::as_slice)
        };

        let mut closing = false;
        for link in candidates {
            match link.send(msg) {
                Err(LinkError::Closing) => {
                    debug!(
                        peer = %self.peer,
                        session_id,
                        link = %link.id(),
                        "link closing, trying next candidate"
                    );
                    closing = true;
                }
                Err(err) => {
                    warn!(peer = %self.peer, session_id, link = %link.id(), error = %err, "send failed");
                    return Err(err.into());
                }
                Ok(()) => return Ok(()),
            }
        }

        if closing {
            // Every candidate was mid-teardown; report what the last one said.
            return Err(LinkError::Closing.into());
        }
        warn!(peer = %self.peer, session_id, "no route for session");
        Err(RouteError::NoRoute {
            peer: self.peer.clone(),
            session_id,
        })
    }

    /// The current route for `session_id`, with no failover scan.
    ///
    /// Session 0 returns the first direct-link candidate.
    #[must_use]
    pub fn route_for(&self, session_id: SessionId) -> Option<LinkRef> {
        let routes = self.routes.lock();
        if session_id == 0 {
            routes.direct.first().cloned()
        } else {
            routes.bound.get(&session_id).and_then(|links| links.first()).cloned()
        }
    }

    /// Register `link` as a direct-link candidate.
    ///
    /// Idempotent; returns `false` when the link was already registered.
    /// Direct links carry no session-use count.
    pub fn add_direct_link(&self, link: LinkRef) -> bool {
        let mut routes = self.routes.lock();
        if routes.has_direct(link.id()) {
            debug!(peer = %self.peer, link = %link.id(), "direct link already registered");
            return false;
        }
        debug!(peer = %self.peer, link = %link.id(), remote = %link.remote_name(), "direct link added");
        routes.direct.push(link);
        true
    }

    /// Whether `link_id` is a registered direct-link candidate.
    #[must_use]
    pub fn can_use_route(&self, link_id: ConnectionId) -> bool {
        self.routes.lock().has_direct(link_id)
    }

    /// Remove every entry referencing `link_id`.
    ///
    /// Each removed binding releases one session ref on the link; the
    /// direct-set removal releases none. Returns `true` when the record is
    /// now completely empty and should be destroyed by its owner.
    pub fn remove_link(&self, link_id: ConnectionId) -> bool {
        let mut routes = self.routes.lock();
        routes.direct.retain(|link| link.id() != link_id);
        routes.bound.retain(|session_id, links| {
            links.retain(|link| {
                if link.id() == link_id {
                    debug!(peer = %self.peer, session_id, link = %link_id, "binding removed with link");
                    link.release_session_ref();
                    false
                } else {
                    true
                }
            });
            !links.is_empty()
        });
        routes.is_empty()
    }

    /// Bind `session_id` to an explicitly chosen link.
    ///
    /// The link must already be a registered direct-link candidate; a session
    /// rides on an established daemon-to-daemon link, never an arbitrary one.
    /// On success the link gains one session ref.
    ///
    /// # Errors
    /// [`RouteError::RouteRejected`] when the precondition fails; no state or
    /// ref-count change in that case.
    pub fn bind_session(&self, session_id: SessionId, link: LinkRef) -> Result<(), RouteError> {
        if session_id == 0 {
            return Err(self.rejected("session id 0 is reserved for direct links"));
        }
        let mut routes = self.routes.lock();
        if !routes.has_direct(link.id()) {
            warn!(
                peer = %self.peer,
                session_id,
                link = %link.id(),
                "bind rejected: link is not a registered direct link"
            );
            return Err(self.rejected("link is not a registered direct link"));
        }
        if routes
            .bound
            .get(&session_id)
            .is_some_and(|links| links.iter().any(|l| l.id() == link.id()))
        {
            warn!(peer = %self.peer, session_id, link = %link.id(), "bind rejected: already bound");
            return Err(self.rejected("session is already bound to this link"));
        }

        link.add_session_ref();
        debug!(peer = %self.peer, session_id, link = %link.id(), "session bound");
        routes.bound.entry(session_id).or_default().push(link);
        Ok(())
    }

    /// Bind `session_id` to the best direct-link candidate and return it.
    ///
    /// The current policy picks the first candidate unconditionally; it is a
    /// deliberate placeholder until hop counts and session options are
    /// exchanged between daemons.
    ///
    /// # Errors
    /// [`RouteError::RouteRejected`] when no direct-link candidate exists.
    pub fn bind_session_best_route(&self, session_id: SessionId) -> Result<LinkRef, RouteError> {
        if session_id == 0 {
            return Err(self.rejected("session id 0 is reserved for direct links"));
        }
        let mut routes = self.routes.lock();
        let Some(link) = routes.direct.first().cloned() else {
            warn!(peer = %self.peer, session_id, "bind rejected: no direct link candidates");
            return Err(self.rejected("no direct link candidates"));
        };

        link.add_session_ref();
        debug!(peer = %self.peer, session_id, link = %link.id(), "session bound to best route");
        routes.bound.entry(session_id).or_default().push(link.clone());
        Ok(link)
    }

    /// Remove the oldest binding for exactly `session_id`, releasing one
    /// session ref on its link.
    ///
    /// # Errors
    /// With [`RouterConfig::with_strict_unbind`], an unknown session yields
    /// [`RouteError::SessionNotBound`]; otherwise it only logs.
    pub fn unbind_session(&self, session_id: SessionId) -> Result<(), RouteError> {
        let mut routes = self.routes.lock();
        if let Some(links) = routes.bound.get_mut(&session_id) {
            let link = links.remove(0);
            if links.is_empty() {
                routes.bound.remove(&session_id);
            }
            debug!(peer = %self.peer, session_id, link = %link.id(), "session unbound");
            link.release_session_ref();
            return Ok(());
        }

        warn!(peer = %self.peer, session_id, "unbind for unknown session");
        if self.config.strict_unbind {
            Err(RouteError::SessionNotBound {
                peer: self.peer.clone(),
                session_id,
            })
        } else {
            Ok(())
        }
    }

    /// All sessions currently routed through `link_id`.
    ///
    /// Used to notify session-loss listeners before a link is torn down.
    #[must_use]
    pub fn sessions_for_link(&self, link_id: ConnectionId) -> Vec<SessionId> {
        let routes = self.routes.lock();
        routes
            .bound
            .iter()
            .filter(|(_, links)| links.iter().any(|l| l.id() == link_id))
            .map(|(session_id, _)| *session_id)
            .collect()
    }

    /// Whether the record holds no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.lock().is_empty()
    }

    /// Number of direct-link candidates.
    #[must_use]
    pub fn direct_link_count(&self) -> usize {
        self.routes.lock().direct.len()
    }

    /// Total number of session binding entries.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.routes.lock().bound.values().map(Vec::len).sum()
    }

    fn rejected(&self, reason: &'static str) -> RouteError {
        RouteError::RouteRejected {
            peer: self.peer.clone(),
            reason,
        }
    }
}
