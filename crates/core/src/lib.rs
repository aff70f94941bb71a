//! VIX Core - Shared domain types.
//!
//! This crate provides the types used across all VIX components:
//! - `storefront` - Catalog, cart, checkout and admin back-office services
//! - `cli` - Command-line front end for shoppers and administrators
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, phone numbers, statuses and records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
