//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. The visitor's session
//! carries the identifier of their current cart.

use session_cart_core::SessionId;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "cart_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Session keys.
pub mod keys {
    /// Key for the identifier of the visitor's current cart.
    pub const CART_SESSION_ID: &str = "cart_session_id";
}

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Get the visitor's cart identifier, minting and storing one on first contact.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn cart_session_id(session: &Session) -> Result<SessionId, tower_sessions::session::Error> {
    if let Some(id) = session.get::<SessionId>(keys::CART_SESSION_ID).await? {
        return Ok(id);
    }

    let id = SessionId::generate();
    session.insert(keys::CART_SESSION_ID, &id).await?;
    tracing::debug!(cart_session = %id, "minted cart session id");
    Ok(id)
}

/// Forget the visitor's cart identifier so the next request mints a new one.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn forget_cart_session_id(
    session: &Session,
) -> Result<Option<SessionId>, tower_sessions::session::Error> {
    session.remove::<SessionId>(keys::CART_SESSION_ID).await
}
