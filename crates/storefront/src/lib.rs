//! Session Cart Storefront library.
//!
//! This crate provides the cart engine and its HTTP host as a library,
//! allowing it to be tested and reused.
//!
//! - [`cart`] - Cart actors, the directory and the dispatcher
//! - [`routes`] - Thin JSON host in front of the dispatcher

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
