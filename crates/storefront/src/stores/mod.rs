//! Backing stores for the two cart representations.
//!
//! - [`guest`] - the anonymous cart, local to the shopper and synchronous
//! - [`remote`] - the authenticated cart, owned by a remote service and async
//!
//! The reconciliation engine only talks to these through the
//! [`GuestCartStore`] and [`AuthenticatedCartService`] traits, so either side
//! can be swapped for a fake in tests.

pub mod guest;
pub mod remote;

pub use guest::{GuestCartError, GuestCartStore, MemoryGuestStore};
pub use remote::{
    AuthenticatedCartService, HttpCartService, MemoryCartService, MergeKey, RemoteCart,
    RemoteError,
};
