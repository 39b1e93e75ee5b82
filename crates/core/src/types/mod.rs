//! Core types for the session cart.
//!
//! This module provides type-safe wrappers for the cart domain concepts.

pub mod cart;
pub mod command;
pub mod id;
pub mod status;

pub use cart::{CartSnapshot, CartState};
pub use command::{ActionError, CartAction, CartCommand};
pub use id::*;
pub use status::CartStatus;
