//! Session Cart Core - Shared types library.
//!
//! This crate provides the cart types shared by the session cart components:
//! - `storefront` - Cart actors, the actor directory, the command dispatcher
//!   and the thin HTTP host in front of them
//! - `integration-tests` - End-to-end tests against the dispatcher and router
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O, no
//! runtime, no HTTP. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Opaque identifiers, cart state and snapshots, commands, statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
