//! Cart actor.
//!
//! Each cart runs as its own tokio task that owns a [`CartState`] and drains a
//! bounded mailbox one envelope at a time. Nothing else ever touches the
//! state, so commands for one session form a strictly serial history.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──checkout──▶ CheckedOut
//!   │                     │
//!   │ add/remove/list     │ mailbox closed, queued commands rejected,
//!   ▼                     ▼ task ends
//! snapshot reply       Outcome::Rejected
//! ```
//!
//! The [`CartHandle`] outlives the task: its status watch keeps reporting
//! `CheckedOut` so late commands are rejected instead of reviving the cart.

use session_cart_core::{CartCommand, CartSnapshot, CartState, CartStatus, SessionId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// Reply to a [`CartCommand`].
#[derive(Debug)]
pub(crate) enum Outcome {
    /// The command was applied; the snapshot reflects the state afterwards.
    Applied(CartSnapshot),
    /// The cart was already checked out; nothing changed.
    Rejected,
}

/// Mailbox message.
#[derive(Debug)]
pub(crate) enum Envelope {
    Command {
        command: CartCommand,
        respond_to: oneshot::Sender<Outcome>,
    },
    Checkout,
}

/// The actor's mailbox no longer accepts messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MailboxClosed;

/// Errors starting a cart actor.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// Spawning requires a running tokio runtime on the calling thread.
    #[error("no tokio runtime is available to host the cart actor")]
    NoRuntime,
}

/// Cheaply cloneable reference to a running (or finished) cart actor.
#[derive(Debug, Clone)]
pub struct CartHandle {
    session: SessionId,
    mailbox: mpsc::Sender<Envelope>,
    status: watch::Receiver<CartStatus>,
}

impl CartHandle {
    /// Session this cart belongs to.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Latest lifecycle status published by the actor.
    #[must_use]
    pub fn status(&self) -> CartStatus {
        *self.status.borrow()
    }

    /// Wait until the actor has applied its checkout.
    ///
    /// Returns early if the actor stopped without checking out.
    pub async fn checked_out(&self) {
        let mut status = self.status.clone();
        let _ = status.wait_for(|status| status.is_checked_out()).await;
    }

    /// Queue a command and return the receiver for its reply.
    pub(crate) async fn enqueue(
        &self,
        command: CartCommand,
    ) -> Result<oneshot::Receiver<Outcome>, MailboxClosed> {
        let (respond_to, response) = oneshot::channel();
        self.mailbox
            .send(Envelope::Command {
                command,
                respond_to,
            })
            .await
            .map_err(|_| MailboxClosed)?;
        Ok(response)
    }

    /// Queue a checkout. Returns once the mailbox has accepted it.
    pub(crate) async fn request_checkout(&self) -> Result<(), MailboxClosed> {
        self.mailbox
            .send(Envelope::Checkout)
            .await
            .map_err(|_| MailboxClosed)
    }
}

/// Start a new, empty, `Active` cart for `session`.
pub(crate) fn spawn(session: SessionId, mailbox_capacity: usize) -> Result<CartHandle, SpawnError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| SpawnError::NoRuntime)?;

    let (mailbox_tx, mailbox_rx) = mpsc::channel(mailbox_capacity.max(1));
    let (status_tx, status_rx) = watch::channel(CartStatus::Active);

    let actor = CartActor {
        state: CartState::new(),
        mailbox: mailbox_rx,
        status: status_tx,
    };
    let span = info_span!("cart", session = %session);
    runtime.spawn(actor.run().instrument(span));

    Ok(CartHandle {
        session,
        mailbox: mailbox_tx,
        status: status_rx,
    })
}

struct CartActor {
    state: CartState,
    mailbox: mpsc::Receiver<Envelope>,
    status: watch::Sender<CartStatus>,
}

impl CartActor {
    async fn run(mut self) {
        debug!("cart actor started");

        while let Some(envelope) = self.mailbox.recv().await {
            match envelope {
                Envelope::Command {
                    command,
                    respond_to,
                } => {
                    let snapshot = self.apply(command);
                    if respond_to.send(Outcome::Applied(snapshot)).is_err() {
                        debug!("caller stopped waiting, command was applied anyway");
                    }
                }
                Envelope::Checkout => {
                    self.check_out().await;
                    return;
                }
            }
        }

        debug!("all handles dropped, cart actor stopping");
    }

    fn apply(&mut self, command: CartCommand) -> CartSnapshot {
        match command {
            CartCommand::Add(item) => {
                let quantity = self.state.add(item.clone());
                debug!(%item, quantity = quantity.get(), "item added");
            }
            CartCommand::Remove(item) => match self.state.remove(&item) {
                Some(remaining) => debug!(%item, remaining, "item removed"),
                None => debug!(%item, "item not in cart, remove ignored"),
            },
            CartCommand::List => {}
        }
        self.state.snapshot()
    }

    /// Publish `CheckedOut`, stop accepting envelopes and reject whatever was
    /// queued behind the checkout.
    async fn check_out(&mut self) {
        // Status first: a sender that sees the closed mailbox must also see CheckedOut
        self.status.send_replace(CartStatus::CheckedOut);
        self.mailbox.close();

        let snapshot = self.state.snapshot();
        info!(
            items = snapshot.len(),
            quantity = snapshot.total_quantity(),
            "cart checked out"
        );

        let mut rejected = 0_usize;
        while let Some(envelope) = self.mailbox.recv().await {
            if let Envelope::Command { respond_to, .. } = envelope {
                let _ = respond_to.send(Outcome::Rejected);
            }
            rejected += 1;
        }
        if rejected > 0 {
            warn!(rejected, "rejected envelopes queued behind checkout");
        }
    }
}
