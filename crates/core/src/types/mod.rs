//! Core types for VIX.
//!
//! This module provides type-safe wrappers for common domain concepts and
//! the records exchanged with the remote table store.

mod de;
pub mod id;
pub mod order;
pub mod phone;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderWithItems};
pub use phone::{Phone, PhoneError};
pub use price::{CurrencyCode, Price};
pub use product::{NewProduct, Product};
pub use status::*;
