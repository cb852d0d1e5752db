//! Types stored in the shopper's session.

pub mod session;

pub use session::{CurrentCustomer, keys as session_keys};
