//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartDirectory, Dispatcher};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the cart dispatcher and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Create a new application state with a fresh cart directory.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let directory = Arc::new(CartDirectory::new(&config.cart));
        let dispatcher = Dispatcher::new(directory, &config.cart);
        Self::with_dispatcher(config, dispatcher)
    }

    /// Create application state around an existing dispatcher.
    #[must_use]
    pub fn with_dispatcher(config: StorefrontConfig, dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, dispatcher }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the cart dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
