//! Session-scoped cart engine.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ──create_or_attach──▶ CartDirectory ──spawn──▶ CartActor (one task per session)
//!     │                                  │                       ▲
//!     └──────── CartHandle ◀─────────────┘                       │
//!               (mailbox sender + status watch) ─── Envelope ────┘
//! ```
//!
//! - [`actor`] - Single-writer cart state machine running as a tokio task
//! - [`directory`] - Injected registry with atomic create-or-attach
//! - [`dispatcher`] - Public entry point; snapshot-returning commands and
//!   fire-and-forget checkout
//! - [`retention`] - Periodic eviction of checked-out carts
//!
//! Commands for one session are applied strictly in mailbox order. Commands
//! for different sessions share nothing except the directory lock, which is
//! only held for map lookups and inserts.

pub mod actor;
pub mod directory;
pub mod dispatcher;
pub mod retention;

use std::time::Duration;

pub use actor::CartHandle;
pub use directory::{CartDirectory, DirectoryError, Registration};
pub use dispatcher::{CheckoutAccepted, DispatchError, Dispatcher};

/// Default bound on queued commands per cart.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Default limit on registered carts.
pub const DEFAULT_MAX_LIVE_SESSIONS: usize = 100_000;

/// Default number of create-or-attach attempts per command.
pub const DEFAULT_ATTACH_ATTEMPTS: u32 = 3;

/// Default base delay between create-or-attach attempts.
pub const DEFAULT_ATTACH_BACKOFF: Duration = Duration::from_millis(25);

/// Default period between sweeps for checked-out carts.
pub const DEFAULT_EVICT_INTERVAL: Duration = Duration::from_secs(30);

/// Tuning for the cart engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSettings {
    /// Bound on queued commands per cart actor.
    pub mailbox_capacity: usize,
    /// Maximum number of carts the directory will hold handles for.
    pub max_live_sessions: usize,
    /// How long a caller waits for its command; `None` waits indefinitely.
    pub command_timeout: Option<Duration>,
    /// Attempts at create-or-attach before giving up on a transient failure.
    pub attach_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number.
    pub attach_backoff: Duration,
    /// Period between sweeps that free the slots of checked-out carts.
    pub evict_interval: Duration,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            max_live_sessions: DEFAULT_MAX_LIVE_SESSIONS,
            command_timeout: None,
            attach_attempts: DEFAULT_ATTACH_ATTEMPTS,
            attach_backoff: DEFAULT_ATTACH_BACKOFF,
            evict_interval: DEFAULT_EVICT_INTERVAL,
        }
    }
}
