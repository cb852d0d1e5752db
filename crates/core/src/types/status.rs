//! Status enums for cart reconciliation.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Progress of the guest-to-authenticated cart merge for one login session.
///
/// ```text
/// Idle ──login, guest empty──────────────▶ NotNeeded
///  │
///  └─login, guest non-empty─▶ Pending ─tick─▶ Merging ─confirmed─▶ Committed
///                                               ▲   │
///                                          tick │   │ error / empty re-fetch
///                                               │   ▼
///                                              Failed
///
/// any state ──logout──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationState {
    /// No principal, or nothing has happened yet in this session.
    #[default]
    Idle,
    /// Principal just authenticated with a non-empty guest cart; merge owed.
    Pending,
    /// Merge call in flight. Only one attempt may hold this state.
    Merging,
    /// Merge confirmed and the guest cart cleared.
    Committed,
    /// Last attempt errored or could not be confirmed; retried on next tick.
    Failed,
    /// Authenticated with an empty guest cart; nothing to merge.
    NotNeeded,
}

impl ReconciliationState {
    /// Whether a merge is still owed for this session.
    #[must_use]
    pub const fn is_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Merging | Self::Failed)
    }

    /// Whether the session has reached a terminal state.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Committed | Self::NotNeeded)
    }

    /// Stable snake_case name, as used in logs and JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Merging => "merging",
            Self::Committed => "committed",
            Self::Failed => "failed",
            Self::NotNeeded => "not_needed",
        }
    }
}

impl fmt::Display for ReconciliationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
