//! VIX storefront library.
//!
//! Catalog browsing, cart, checkout and the admin back-office, over a
//! hosted table store with a local mirror as fallback. The binary front
//! end lives in `vix-cli`; everything here is usable and testable without
//! it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mirror;
pub mod state;

pub use error::{AppError, Result};
pub use state::AppState;
