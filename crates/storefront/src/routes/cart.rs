//! Cart route handlers.
//!
//! Each handler resolves the visitor's cart identifier from their session
//! (minting one on first contact) and forwards exactly one command to the
//! dispatcher. Responses are JSON; rendering is left to the client.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use session_cart_core::{CartAction, CartCommand, CartSnapshot, SessionId};
use tower_sessions::Session;
use tracing::instrument;

use crate::cart::DispatchError;
use crate::error::{AppError, Result};
use crate::middleware::{cart_session_id, forget_cart_session_id};
use crate::state::AppState;

/// Item form data for add and remove.
#[derive(Debug, Deserialize)]
pub struct ItemForm {
    pub item_id: String,
}

/// Query string of the combined action endpoint (`?type=add&itemID=apple`).
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "itemID")]
    pub item_id: Option<String>,
}

/// Cart contents returned by every snapshot-producing route.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub session: SessionId,
    pub items: CartSnapshot,
    pub item_count: u64,
}

impl CartResponse {
    fn new(session: SessionId, items: CartSnapshot) -> Self {
        let item_count = items.total_quantity();
        Self {
            session,
            items,
            item_count,
        }
    }
}

/// Acknowledgement returned by checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session: SessionId,
    pub status: &'static str,
}

// =============================================================================
// Dispatch Helpers
// =============================================================================

/// Run a snapshot-producing command for the visitor's cart.
async fn run(state: &AppState, session: &Session, command: CartCommand) -> Result<CartResponse> {
    let id = cart_session_id(session).await?;

    match state.dispatcher().submit(&id, command).await {
        Ok(snapshot) => Ok(CartResponse::new(id, snapshot)),
        Err(err) => Err(release_if_closed(session, err).await),
    }
}

/// Queue checkout for the visitor's cart and start them on a fresh one.
async fn run_checkout(state: &AppState, session: &Session) -> Result<CheckoutResponse> {
    let id = cart_session_id(session).await?;

    match state.dispatcher().checkout(&id).await {
        Ok(accepted) => {
            // Checked-out identifiers are never reused
            forget_cart_session_id(session).await?;
            Ok(CheckoutResponse {
                session: accepted.session,
                status: "accepted",
            })
        }
        Err(err) => Err(release_if_closed(session, err).await),
    }
}

/// Drop a closed cart's identifier from the session so the next request gets
/// a new cart, then hand the error back.
async fn release_if_closed(session: &Session, err: DispatchError) -> AppError {
    if matches!(err, DispatchError::SessionClosed { .. }) {
        if let Err(e) = forget_cart_session_id(session).await {
            tracing::error!("Failed to clear closed cart from session: {e}");
        }
    }
    AppError::Cart(err)
}

fn item_command(kind: &str, form: &ItemForm) -> Result<CartCommand> {
    match CartAction::parse(kind, Some(&form.item_id))? {
        CartAction::Command(command) => Ok(command),
        CartAction::Checkout => Err(AppError::BadRequest(format!("{kind} is not an item command"))),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart, creating it on first contact.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartResponse>> {
    run(&state, &session, CartCommand::List).await.map(Json)
}

/// Add one unit of an item.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ItemForm>,
) -> Result<Json<CartResponse>> {
    let command = item_command("add", &form)?;
    run(&state, &session, command).await.map(Json)
}

/// Remove one unit of an item.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<ItemForm>,
) -> Result<Json<CartResponse>> {
    let command = item_command("remove", &form)?;
    run(&state, &session, command).await.map(Json)
}

/// Check out the cart without waiting for it to be applied.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Result<Response> {
    let response = run_checkout(&state, &session).await?;
    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// Combined action endpoint: `add`, `remove`, `list` or `checkout`.
#[instrument(skip(state, session))]
pub async fn action(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ActionQuery>,
) -> Result<Response> {
    match CartAction::parse(&query.kind, query.item_id.as_deref())? {
        CartAction::Command(command) => {
            let response = run(&state, &session, command).await?;
            Ok(Json(response).into_response())
        }
        CartAction::Checkout => {
            let response = run_checkout(&state, &session).await?;
            Ok((StatusCode::ACCEPTED, Json(response)).into_response())
        }
    }
}
