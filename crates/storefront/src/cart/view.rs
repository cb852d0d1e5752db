//! The cart shown to the shopper.
//!
//! Derived on every read from the reconciliation state and whatever the two
//! stores hold right now. Holds no state of its own.

use cartbridge_core::{CartSnapshot, ReconciliationState};

/// Pick the snapshot to show.
///
/// - Not authenticated: the guest cart.
/// - A non-empty authenticated cart always wins.
/// - Settled (`Committed` or `NotNeeded`): the authenticated cart, even if
///   empty or absent.
/// - Merge outstanding (`Pending`, `Merging`, `Failed`) with guest lines: the
///   guest cart, so the shopper never sees their lines vanish mid-merge.
/// - Anything else: an empty cart.
///
/// Totals come from whichever snapshot is returned; they are never carried
/// across.
#[must_use]
pub fn derive(
    state: ReconciliationState,
    authenticated: bool,
    guest: CartSnapshot,
    remote: Option<CartSnapshot>,
) -> CartSnapshot {
    if !authenticated {
        return guest;
    }

    match remote {
        Some(remote) if !remote.is_empty() => remote,
        remote if state.is_settled() => remote.unwrap_or_default(),
        _ if state.is_outstanding() && !guest.is_empty() => guest,
        _ => CartSnapshot::empty(),
    }
}
