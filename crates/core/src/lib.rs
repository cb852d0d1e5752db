//! Cartbridge Core - Shared cart value types.
//!
//! This crate provides the value types exchanged between the cart stores and
//! the reconciliation engine:
//! - `storefront` - Reconciliation engine, store adapters and HTTP surface
//! - `cli` - Command-line tools for catalog and remote cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! Snapshots are immutable values: every derived figure (subtotal, total,
//! item count) is recomputed from the line items when a snapshot is built or
//! deserialized.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, quantities, cart snapshots and the
//!   reconciliation state enum

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
