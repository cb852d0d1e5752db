//! Core types for Cartbridge.
//!
//! This module provides type-safe wrappers for cart domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart::{CartDataError, CartItem, CartSnapshot, MergeLine, ProductSnapshot};
pub use id::*;
pub use price::{CurrencyCode, Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::ReconciliationState;
