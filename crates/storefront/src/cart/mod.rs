//! Cart reconciliation.
//!
//! A shopper starts with a guest cart. When they log in, the guest lines are
//! merged into their authenticated cart exactly once, and the guest cart is
//! cleared only after the authenticated cart has been read back non-empty.
//! Until then the shopper keeps seeing their guest lines.
//!
//! - [`engine`] - the per-shopper state machine and consumer API
//! - [`view`] - pure derivation of the cart shown to the shopper
//! - [`dispatch`] - routing of mutations to the right store
//! - [`merge`] - the line conflict rule applied by merge-capable stores

pub mod dispatch;
pub mod engine;
pub mod merge;
pub mod view;

pub use dispatch::{CartMutation, Route};
pub use engine::{CartEngine, Diagnostics, EngineConfig};

use cartbridge_core::{IdError, QuantityError};
use serde::Serialize;
use thiserror::Error;

use crate::stores::{GuestCartError, RemoteError};

/// Error category reported by [`CartEngine::last_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A call to the authenticated cart service failed.
    RemoteUnavailable,
    /// Merge-in succeeded but the authenticated cart read back empty.
    MergeIncomplete,
    /// A mutation was rejected as invalid.
    InvalidOperand,
}

impl ErrorKind {
    /// Stable name for logs and API responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteUnavailable => "remote_unavailable",
            Self::MergeIncomplete => "merge_incomplete",
            Self::InvalidOperand => "invalid_operand",
        }
    }
}

/// Errors returned by cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The authenticated cart service could not complete the call. The cart
    /// is unchanged.
    #[error("cart service unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    /// The request was invalid.
    #[error("invalid cart operation: {0}")]
    InvalidOperand(String),
}

impl CartError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::InvalidOperand(_) => ErrorKind::InvalidOperand,
        }
    }
}

impl From<GuestCartError> for CartError {
    fn from(err: GuestCartError) -> Self {
        Self::InvalidOperand(err.to_string())
    }
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::InvalidOperand(err.to_string())
    }
}

impl From<IdError> for CartError {
    fn from(err: IdError) -> Self {
        Self::InvalidOperand(err.to_string())
    }
}

/// Result of one engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No login session; nothing to do.
    Idle,
    /// A merge is owed but the shopper is not currently authenticated.
    AwaitingAuth,
    /// The session already settled earlier.
    Settled(cartbridge_core::ReconciliationState),
    /// The guest cart was empty, so no merge was needed.
    NotNeeded,
    /// The merge was confirmed and the guest cart cleared.
    Committed,
    /// The merge attempt failed and will be retried on the next tick.
    Failed(ErrorKind),
    /// Another tick is already merging this session.
    ReentrantMergeIgnored,
    /// The session was reset while the merge was in flight; its result was
    /// discarded.
    Superseded,
}
