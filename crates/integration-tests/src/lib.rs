//! Integration tests for the session cart service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p session-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_dispatcher` - Cart engine behavior through the public dispatcher
//! - `storefront_api` - HTTP routes, driven in-process with `tower::ServiceExt`
//!
//! This library holds the shared harness: an in-process client that keeps
//! the session cookie between requests the way a browser would.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use session_cart_storefront::cart::{CartSettings, Dispatcher};
use session_cart_storefront::config::StorefrontConfig;
use session_cart_storefront::routes;
use session_cart_storefront::state::AppState;
use tower::ServiceExt;

/// Response body size limit for tests.
const BODY_LIMIT: usize = 1024 * 1024;

/// Build the full application around a fresh dispatcher.
///
/// Returns the router and a dispatcher sharing its cart directory, so tests
/// can inspect carts directly.
#[must_use]
pub fn test_app(settings: CartSettings) -> (Router, Dispatcher) {
    let config = StorefrontConfig {
        cart: settings,
        ..StorefrontConfig::default()
    };
    let dispatcher = Dispatcher::with_settings(&config.cart);
    let state = AppState::with_dispatcher(config, dispatcher.clone());
    (routes::app(state), dispatcher)
}

/// Decoded response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// Cart session identifier reported in the body.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.body.get("session").and_then(Value::as_str)
    }

    /// Quantity of `item` in the reported cart, 0 when absent.
    #[must_use]
    pub fn quantity(&self, item: &str) -> u64 {
        self.body
            .get("items")
            .and_then(|items| items.get(item))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

/// One simulated visitor.
pub struct Visitor {
    app: Router,
    cookie: Option<String>,
}

impl Visitor {
    /// A visitor with no session cookie yet.
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    /// Issue a GET request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or served.
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    /// Issue a POST request with an optional JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or served.
    pub async fn post(&mut self, uri: &str, body: Option<Value>) -> TestResponse {
        self.send(Method::POST, uri, body).await
    }

    #[allow(clippy::unwrap_used)]
    async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            // A removal cookie carries an empty value
            self.cookie = pair
                .split_once('=')
                .filter(|(_, value)| !value.is_empty())
                .map(|_| pair.to_string());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}
