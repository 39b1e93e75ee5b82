//! Command dispatcher.
//!
//! The only entry point front ends use. Every call resolves the session's
//! cart through the injected [`CartDirectory`] (creating it on first contact)
//! and then follows one of two contracts:
//!
//! - [`Dispatcher::submit`] (and the `add`/`remove`/`list` wrappers) waits
//!   for the cart to apply the command and returns the resulting snapshot.
//! - [`Dispatcher::checkout`] returns as soon as the cart's mailbox has
//!   accepted the checkout; no snapshot is produced.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use session_cart_core::{CartCommand, CartSnapshot, ItemId, SessionId};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::CartSettings;
use super::actor::{CartHandle, Outcome};
use super::directory::{CartDirectory, DirectoryError};

/// Errors surfaced to dispatcher callers.
///
/// A caller that receives any of these must not assume the command changed
/// the cart, except for [`DispatchError::TimedOut`]: it is only reported for
/// queued commands, which the cart applies exactly once regardless.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The cart has been checked out.
    #[error("session {session} is already checked out")]
    SessionClosed { session: SessionId },

    /// The cart could not be created or reached.
    #[error("could not dispatch to session {session}: {reason}")]
    DispatchFailure { session: SessionId, reason: String },

    /// The command was queued but the caller stopped waiting for the reply.
    #[error("session {session} did not respond within {after:?}")]
    TimedOut { session: SessionId, after: Duration },
}

impl DispatchError {
    /// Session the failed command was addressed to.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        match self {
            Self::SessionClosed { session }
            | Self::DispatchFailure { session, .. }
            | Self::TimedOut { session, .. } => session,
        }
    }
}

/// Acknowledgement that a checkout was queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutAccepted {
    pub session: SessionId,
}

/// Routes commands to per-session cart actors.
///
/// Cheap to clone; all clones share the same directory.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    directory: Arc<CartDirectory>,
    command_timeout: Option<Duration>,
    attach_attempts: u32,
    attach_backoff: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over an existing directory.
    #[must_use]
    pub fn new(directory: Arc<CartDirectory>, settings: &CartSettings) -> Self {
        Self {
            directory,
            command_timeout: settings.command_timeout,
            attach_attempts: settings.attach_attempts.max(1),
            attach_backoff: settings.attach_backoff,
        }
    }

    /// Create a dispatcher with its own, empty directory.
    #[must_use]
    pub fn with_settings(settings: &CartSettings) -> Self {
        Self::new(Arc::new(CartDirectory::new(settings)), settings)
    }

    /// The directory this dispatcher resolves carts through.
    #[must_use]
    pub const fn directory(&self) -> &Arc<CartDirectory> {
        &self.directory
    }

    /// Apply `command` to the session's cart and return the resulting snapshot.
    ///
    /// With a command timeout configured, the same deadline covers queueing
    /// and the reply. A command still unqueued at the deadline is dropped and
    /// reported as [`DispatchError::DispatchFailure`]; once queued it is
    /// applied exactly once, even if the caller gets
    /// [`DispatchError::TimedOut`].
    ///
    /// # Errors
    ///
    /// - [`DispatchError::SessionClosed`] if the cart is checked out
    /// - [`DispatchError::DispatchFailure`] if the cart cannot be created, reached
    ///   or queued to before the deadline
    /// - [`DispatchError::TimedOut`] if the queued command is not answered in time
    #[instrument(
        skip(self, command),
        fields(
            session = %session,
            command = command.name(),
            item = command.item().map(ItemId::as_str),
        )
    )]
    pub async fn submit(
        &self,
        session: &SessionId,
        command: CartCommand,
    ) -> Result<CartSnapshot, DispatchError> {
        let deadline = self.deadline();

        let (handle, reply) = self
            .queue_within(session, deadline, self.queue_command(session, command))
            .await?;

        let answer = match deadline {
            Some((at, after)) => tokio::time::timeout_at(at, reply).await.map_err(|_| {
                warn!(?after, "command timed out after it was queued");
                DispatchError::TimedOut {
                    session: session.clone(),
                    after,
                }
            })?,
            None => reply.await,
        };

        match answer {
            Ok(Outcome::Applied(snapshot)) => Ok(snapshot),
            Ok(Outcome::Rejected) => Err(DispatchError::SessionClosed {
                session: session.clone(),
            }),
            Err(_) => Err(unreachable_cart(&handle)),
        }
    }

    /// Add one unit of `item`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::submit`].
    pub async fn add(
        &self,
        session: &SessionId,
        item: impl Into<ItemId>,
    ) -> Result<CartSnapshot, DispatchError> {
        self.submit(session, CartCommand::Add(item.into())).await
    }

    /// Remove one unit of `item`; absent items are left alone.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::submit`].
    pub async fn remove(
        &self,
        session: &SessionId,
        item: impl Into<ItemId>,
    ) -> Result<CartSnapshot, DispatchError> {
        self.submit(session, CartCommand::Remove(item.into())).await
    }

    /// Read the cart, creating it if this is the session's first contact.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::submit`].
    pub async fn list(&self, session: &SessionId) -> Result<CartSnapshot, DispatchError> {
        self.submit(session, CartCommand::List).await
    }

    /// Queue the session's checkout without waiting for it to be applied.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::SessionClosed`] if the cart is already checked out
    /// - [`DispatchError::DispatchFailure`] if the cart cannot be created or
    ///   reached, or its mailbox stays full past the command timeout
    #[instrument(skip(self), fields(session = %session))]
    pub async fn checkout(&self, session: &SessionId) -> Result<CheckoutAccepted, DispatchError> {
        self.queue_within(session, self.deadline(), self.queue_checkout(session))
            .await
    }

    async fn queue_command(
        &self,
        session: &SessionId,
        command: CartCommand,
    ) -> Result<(CartHandle, oneshot::Receiver<Outcome>), DispatchError> {
        let handle = self.attach(session).await?;
        let reply = handle
            .enqueue(command)
            .await
            .map_err(|_| unreachable_cart(&handle))?;
        Ok((handle, reply))
    }

    async fn queue_checkout(&self, session: &SessionId) -> Result<CheckoutAccepted, DispatchError> {
        let handle = self.attach(session).await?;
        if handle.status().is_checked_out() {
            return Err(DispatchError::SessionClosed {
                session: session.clone(),
            });
        }

        handle
            .request_checkout()
            .await
            .map_err(|_| unreachable_cart(&handle))?;

        info!("checkout accepted");
        Ok(CheckoutAccepted {
            session: session.clone(),
        })
    }

    /// Create-or-attach with a bounded retry on transient directory failures.
    async fn attach(&self, session: &SessionId) -> Result<CartHandle, DispatchError> {
        let mut attempt = 1;
        loop {
            match self.directory.create_or_attach(session).await {
                Ok(registration) => return Ok(registration.into_handle()),
                Err(DirectoryError::Evicted(session)) => {
                    return Err(DispatchError::SessionClosed { session });
                }
                Err(err) if err.is_transient() && attempt < self.attach_attempts => {
                    warn!(attempt, error = %err, "create-or-attach failed, retrying");
                    tokio::time::sleep(self.attach_backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(DispatchError::DispatchFailure {
                        session: session.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    /// Deadline for a command starting now, paired with the configured timeout.
    fn deadline(&self) -> Option<(Instant, Duration)> {
        self.command_timeout
            .map(|after| (Instant::now() + after, after))
    }

    /// Run the attach-and-enqueue phase, giving up at `deadline`.
    ///
    /// Nothing has reached the cart when this gives up, so the caller sees a
    /// dispatch failure rather than a timeout.
    async fn queue_within<T>(
        &self,
        session: &SessionId,
        deadline: Option<(Instant, Duration)>,
        work: impl Future<Output = Result<T, DispatchError>>,
    ) -> Result<T, DispatchError> {
        let Some((at, after)) = deadline else {
            return work.await;
        };

        tokio::time::timeout_at(at, work).await.unwrap_or_else(|_| {
            warn!(?after, "command not queued before the deadline");
            Err(DispatchError::DispatchFailure {
                session: session.clone(),
                reason: format!("command not queued within {after:?}"),
            })
        })
    }
}

/// Classify a cart whose mailbox or reply channel is gone.
fn unreachable_cart(handle: &CartHandle) -> DispatchError {
    if handle.status().is_checked_out() {
        DispatchError::SessionClosed {
            session: handle.session().clone(),
        }
    } else {
        DispatchError::DispatchFailure {
            session: handle.session().clone(),
            reason: "cart actor is no longer running".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use session_cart_core::CartStatus;

    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_settings(&CartSettings::default())
    }

    #[tokio::test]
    async fn test_list_materializes_empty_cart() {
        let dispatcher = dispatcher();
        let session = SessionId::new("s");

        let snapshot = dispatcher.list(&session).await.unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(
            dispatcher.directory().status(&session).await,
            Some(CartStatus::Active)
        );
    }

    #[tokio::test]
    async fn test_add_add_add_remove_scenario() {
        let dispatcher = dispatcher();
        let session = SessionId::new("S");

        dispatcher.add(&session, "apple").await.unwrap();
        dispatcher.add(&session, "apple").await.unwrap();
        dispatcher.add(&session, "banana").await.unwrap();
        let snapshot = dispatcher.remove(&session, "apple").await.unwrap();

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            serde_json::json!({"apple": 1, "banana": 1})
        );
    }

    #[tokio::test]
    async fn test_remove_on_empty_cart_is_noop() {
        let dispatcher = dispatcher();
        let snapshot = dispatcher.remove(&SessionId::new("S"), "car").await.unwrap();
        assert_eq!(snapshot, CartSnapshot::empty());
    }

    #[tokio::test]
    async fn test_checkout_then_add_is_rejected() {
        let dispatcher = dispatcher();
        let session = SessionId::new("S");
        dispatcher.add(&session, "apple").await.unwrap();

        let accepted = dispatcher.checkout(&session).await.unwrap();
        assert_eq!(accepted.session, session);

        let err = dispatcher.add(&session, "banana").await.unwrap_err();
        assert!(matches!(err, DispatchError::SessionClosed { .. }));
        assert_eq!(err.session(), &session);

        let err = dispatcher.checkout(&session).await.unwrap_err();
        assert!(matches!(err, DispatchError::SessionClosed { .. }));
    }

    #[tokio::test]
    async fn test_capacity_exhaustion_is_dispatch_failure() {
        let settings = CartSettings {
            max_live_sessions: 1,
            attach_attempts: 2,
            attach_backoff: Duration::from_millis(1),
            ..CartSettings::default()
        };
        let dispatcher = Dispatcher::with_settings(&settings);
        dispatcher.list(&SessionId::new("a")).await.unwrap();

        let err = dispatcher.list(&SessionId::new("b")).await.unwrap_err();
        assert!(matches!(err, DispatchError::DispatchFailure { .. }));
        assert!(err.to_string().contains("cart limit of 1"));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_eviction_frees_capacity() {
        let settings = CartSettings {
            max_live_sessions: 1,
            attach_attempts: 5,
            attach_backoff: Duration::from_millis(20),
            ..CartSettings::default()
        };
        let dispatcher = Dispatcher::with_settings(&settings);
        let first = SessionId::new("first");

        dispatcher.list(&first).await.unwrap();
        dispatcher.checkout(&first).await.unwrap();
        dispatcher
            .directory()
            .get(&first)
            .await
            .unwrap()
            .checked_out()
            .await;

        let directory = Arc::clone(dispatcher.directory());
        let evictor = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            directory.evict_checked_out().await
        });

        let snapshot = dispatcher.add(&SessionId::new("second"), "apple").await.unwrap();
        assert_eq!(snapshot.quantity("apple"), 1);
        assert_eq!(evictor.await.unwrap(), 1);

        // The evicted identifier stays closed
        let err = dispatcher.list(&first).await.unwrap_err();
        assert!(matches!(err, DispatchError::SessionClosed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unqueued_command_is_dispatch_failure() {
        let settings = CartSettings {
            command_timeout: Some(Duration::from_millis(50)),
            ..CartSettings::default()
        };
        let dispatcher = Dispatcher::with_settings(&settings);
        let session = SessionId::new("s");

        let err = dispatcher
            .queue_within(
                &session,
                dispatcher.deadline(),
                std::future::pending::<Result<(), DispatchError>>(),
            )
            .await
            .unwrap_err();
        match err {
            DispatchError::DispatchFailure { reason, .. } => {
                assert_eq!(reason, "command not queued within 50ms");
            }
            other => panic!("expected dispatch failure, got {other:?}"),
        }

        // Commands that answer in time are unaffected
        assert!(dispatcher.add(&session, "apple").await.is_ok());
    }

    #[tokio::test]
    async fn test_queued_command_applies_despite_reply_timeout() {
        let settings = CartSettings {
            command_timeout: Some(Duration::ZERO),
            ..CartSettings::default()
        };
        let impatient = Dispatcher::with_settings(&settings);
        let patient = Dispatcher::new(Arc::clone(impatient.directory()), &CartSettings::default());
        let session = SessionId::new("s");

        let result = impatient.add(&session, "apple").await;
        assert!(matches!(
            result,
            Ok(_) | Err(DispatchError::TimedOut { .. })
        ));

        let snapshot = patient.list(&session).await.unwrap();
        assert_eq!(snapshot.quantity("apple"), 1);
    }
}
