//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness (cart directory below its limit)
//!
//! # Cart (JSON)
//! GET  /cart                   - Current cart (creates it on first contact)
//! POST /cart/add               - Add one unit of {"item_id": ...}
//! POST /cart/remove            - Remove one unit of {"item_id": ...}
//!
//! # Checkout
//! POST /checkout               - Queue checkout (202), start a fresh cart
//!
//! # Combined
//! GET  /action?type=&itemID=   - add | remove | list | checkout
//! ```

pub mod cart;
pub mod health;

use axum::{
    Router,
    extract::Request,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .route("/action", get(cart::action))
}

/// Build the full application: routes, sessions, request IDs and tracing.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    routes()
        .layer(session_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
