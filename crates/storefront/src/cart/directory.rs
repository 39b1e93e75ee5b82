//! Cart directory with double-check locking for actor creation.
//!
//! Maps session identifiers to cart handles and guarantees that at most one
//! cart actor is ever created per identifier.
//!
//! # Double-Check Locking
//!
//! ```text
//! Fast path (cart already exists):
//!   1. Read lock, look up the session
//!   2. Found → attach to the existing handle
//!
//! Slow path (first contact):
//!   1. Write lock
//!   2. Look up again; found → another caller won the race, attach to it
//!   3. Spawn the actor and register its handle
//! ```
//!
//! Entries are never removed implicitly. A checked-out cart stays resolvable
//! so late commands are rejected. An external retention policy may call
//! [`CartDirectory::evict_checked_out`], which trades the handle for a
//! tombstone: the identifier still resolves to "checked out" and can never be
//! reused for a fresh cart.

use std::collections::{HashMap, HashSet};

use session_cart_core::{CartStatus, SessionId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::CartSettings;
use super::actor::{self, CartHandle, SpawnError};

/// Errors from [`CartDirectory::create_or_attach`].
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The session was checked out and its handle evicted.
    #[error("session {0} was checked out and evicted")]
    Evicted(SessionId),

    /// Registering another cart would exceed the configured limit.
    #[error("cart limit of {limit} sessions reached")]
    CapacityExhausted { limit: usize },

    /// The actor task could not be started.
    #[error("failed to start cart actor: {0}")]
    Spawn(#[from] SpawnError),
}

impl DirectoryError {
    /// Whether retrying may succeed.
    ///
    /// Capacity frees up when the retention policy evicts checked-out carts.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

/// How a handle was obtained from [`CartDirectory::create_or_attach`].
#[derive(Debug, Clone)]
pub enum Registration {
    /// This call created and registered the cart.
    Created(CartHandle),
    /// The cart already existed.
    Attached(CartHandle),
    /// The cart did not exist on the fast path but another caller created it
    /// before this one took the write lock.
    RaceLost(CartHandle),
}

impl Registration {
    /// Whether this call created the cart.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Borrow the handle.
    #[must_use]
    pub const fn handle(&self) -> &CartHandle {
        match self {
            Self::Created(handle) | Self::Attached(handle) | Self::RaceLost(handle) => handle,
        }
    }

    /// Take the handle.
    #[must_use]
    pub fn into_handle(self) -> CartHandle {
        match self {
            Self::Created(handle) | Self::Attached(handle) | Self::RaceLost(handle) => handle,
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    live: HashMap<SessionId, CartHandle>,
    evicted: HashSet<SessionId>,
}

/// Registry of cart actors, shared by all sessions.
///
/// Owned explicitly and injected into the
/// [`Dispatcher`](super::Dispatcher); there is no process-wide instance.
#[derive(Debug)]
pub struct CartDirectory {
    entries: RwLock<Entries>,
    mailbox_capacity: usize,
    max_live_sessions: usize,
}

impl CartDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new(settings: &CartSettings) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            mailbox_capacity: settings.mailbox_capacity,
            max_live_sessions: settings.max_live_sessions,
        }
    }

    /// Return the cart for `session`, creating it if it does not exist.
    ///
    /// Existing carts are returned whatever their status. Concurrent calls for
    /// the same new identifier create exactly one cart.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::Evicted`] if the session was checked out and evicted
    /// - [`DirectoryError::CapacityExhausted`] if a new cart would exceed the limit
    /// - [`DirectoryError::Spawn`] if no runtime is available for the actor
    pub async fn create_or_attach(
        &self,
        session: &SessionId,
    ) -> Result<Registration, DirectoryError> {
        {
            let entries = self.entries.read().await;
            if let Some(handle) = entries.live.get(session) {
                return Ok(Registration::Attached(handle.clone()));
            }
            if entries.evicted.contains(session) {
                return Err(DirectoryError::Evicted(session.clone()));
            }
        }

        let mut entries = self.entries.write().await;

        if let Some(handle) = entries.live.get(session) {
            debug!(%session, "creation race lost, attaching to existing cart");
            return Ok(Registration::RaceLost(handle.clone()));
        }
        if entries.evicted.contains(session) {
            return Err(DirectoryError::Evicted(session.clone()));
        }
        if entries.live.len() >= self.max_live_sessions {
            warn!(%session, limit = self.max_live_sessions, "cart limit reached");
            return Err(DirectoryError::CapacityExhausted {
                limit: self.max_live_sessions,
            });
        }

        let handle = actor::spawn(session.clone(), self.mailbox_capacity)?;
        entries.live.insert(session.clone(), handle.clone());
        info!(%session, carts = entries.live.len(), "cart created");

        Ok(Registration::Created(handle))
    }

    /// Look up an existing cart without creating one.
    pub async fn get(&self, session: &SessionId) -> Option<CartHandle> {
        self.entries.read().await.live.get(session).cloned()
    }

    /// Status of `session`, or `None` if the directory has never seen it.
    pub async fn status(&self, session: &SessionId) -> Option<CartStatus> {
        let entries = self.entries.read().await;
        if let Some(handle) = entries.live.get(session) {
            return Some(handle.status());
        }
        entries
            .evicted
            .contains(session)
            .then_some(CartStatus::CheckedOut)
    }

    /// Number of registered carts, checked out or not, excluding evicted ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.live.len()
    }

    /// Whether no carts are registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.live.is_empty()
    }

    /// Configured limit on registered carts.
    #[must_use]
    pub const fn max_live_sessions(&self) -> usize {
        self.max_live_sessions
    }

    /// Identifiers of registered carts that are still `Active`.
    pub async fn active_sessions(&self) -> Vec<SessionId> {
        self.entries
            .read()
            .await
            .live
            .iter()
            .filter(|(_, handle)| handle.status().is_active())
            .map(|(session, _)| session.clone())
            .collect()
    }

    /// Drop the handles of checked-out carts, keeping a tombstone for each.
    ///
    /// Intended for an external retention policy. Returns how many handles
    /// were evicted.
    pub async fn evict_checked_out(&self) -> usize {
        let mut guard = self.entries.write().await;
        let Entries { live, evicted } = &mut *guard;

        let before = live.len();
        live.retain(|session, handle| {
            if handle.status().is_checked_out() {
                evicted.insert(session.clone());
                false
            } else {
                true
            }
        });

        let count = before - live.len();
        if count > 0 {
            info!(evicted = count, remaining = live.len(), "evicted checked-out carts");
        }
        count
    }
}
