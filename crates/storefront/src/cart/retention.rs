//! Retention policy for checked-out carts.
//!
//! Checked-out carts keep their directory slot until swept. The sweep
//! replaces each with a tombstone, so capacity frees up while the identifier
//! still answers `SessionClosed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::CartDirectory;

/// Spawn a background task that evicts checked-out carts every `every`.
///
/// The first sweep runs immediately. The task runs until aborted or the
/// runtime shuts down.
pub fn spawn_eviction(directory: Arc<CartDirectory>, every: Duration) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(1));
    info!(?every, "spawning checked-out cart eviction task");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            directory.evict_checked_out().await;
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use session_cart_core::SessionId;

    use super::*;
    use crate::cart::{CartSettings, DirectoryError, Dispatcher};

    #[tokio::test(start_paused = true)]
    async fn test_sweep_frees_capacity_held_by_checked_out_carts() {
        let settings = CartSettings {
            max_live_sessions: 2,
            attach_attempts: 1,
            ..CartSettings::default()
        };
        let dispatcher = Dispatcher::with_settings(&settings);
        let directory = Arc::clone(dispatcher.directory());

        for name in ["first", "second"] {
            let session = SessionId::new(name);
            dispatcher.list(&session).await.unwrap();
            dispatcher.checkout(&session).await.unwrap();
            directory.get(&session).await.unwrap().checked_out().await;
        }
        assert!(directory.active_sessions().await.is_empty());

        let newcomer = SessionId::new("third");
        assert!(matches!(
            directory.create_or_attach(&newcomer).await,
            Err(DirectoryError::CapacityExhausted { limit: 2 })
        ));

        let sweeper = spawn_eviction(Arc::clone(&directory), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(directory.is_empty().await);
        let registration = directory.create_or_attach(&newcomer).await.unwrap();
        assert!(registration.is_created());

        // Swept identifiers stay closed
        assert!(matches!(
            directory.create_or_attach(&SessionId::new("first")).await,
            Err(DirectoryError::Evicted(_))
        ));

        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_repeat() {
        let dispatcher = Dispatcher::with_settings(&CartSettings::default());
        let directory = Arc::clone(dispatcher.directory());
        let sweeper = spawn_eviction(Arc::clone(&directory), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let session = SessionId::new("late");
        dispatcher.list(&session).await.unwrap();
        dispatcher.checkout(&session).await.unwrap();
        directory.get(&session).await.unwrap().checked_out().await;
        assert_eq!(directory.len().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(directory.is_empty().await);

        sweeper.abort();
    }
}
