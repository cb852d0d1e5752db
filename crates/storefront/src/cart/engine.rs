//! Per-shopper cart reconciliation engine.
//!
//! # Lifecycle
//!
//! [`CartEngine::observe`] takes the current [`AuthStatus`] and detects login
//! and logout edges. [`CartEngine::tick`] drives an owed merge forward.
//! Hosts usually call [`CartEngine::sync`], which does both, once per render
//! or request.
//!
//! A merge attempt runs as: merge-in, settle delay, re-fetch. The guest cart
//! is cleared only if the re-fetch returns a non-empty cart; anything else
//! leaves the session `Failed` and the next tick tries again with the same
//! merge key.
//!
//! # Sessions
//!
//! Everything the engine tracks is scoped to one login session. Logging out,
//! or a different customer logging in, resets the session and bumps a
//! generation counter; an attempt still in flight from the old session then
//! drops its result instead of touching the new one.
//!
//! Session state sits behind a `std::sync::Mutex` that is never held across
//! an `.await`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use cartbridge_core::{CartSnapshot, MergeLine, ProductId, Quantity, ReconciliationState};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::dispatch::{self, CartMutation, Route};
use super::{CartError, ErrorKind, TickOutcome, view};
use crate::auth::{AuthSignal, AuthStatus, AuthWatcher, Principal};
use crate::stores::{AuthenticatedCartService, GuestCartStore, MergeKey, RemoteError};

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wait between a successful merge-in and the confirming re-fetch.
    ///
    /// Gives an eventually consistent cart service time to catch up. The
    /// re-fetch result, not this delay, decides whether the guest cart is
    /// cleared.
    pub settle_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
        }
    }
}

/// Point-in-time view of the engine's bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Reconciliation state of the current session.
    pub state: ReconciliationState,
    /// Last observed auth status (`unknown`, `guest`, `authenticated`).
    pub auth: &'static str,
    /// Customer of the current login session.
    pub customer_id: Option<String>,
    /// Merge attempts made in the current session.
    pub merge_attempts: u32,
    /// Most recent failure, if not yet cleared.
    pub last_error: Option<ErrorKind>,
    /// Whether auth is undetermined or engine work is in flight.
    pub loading: bool,
}

#[derive(Debug, Default)]
struct Session {
    /// Last observed status.
    auth: AuthStatus,
    /// Principal of the current login session. Survives `Unknown` blips.
    principal: Option<Principal>,
    state: ReconciliationState,
    generation: u64,
    merge_key: Option<MergeKey>,
    attempts: u32,
    last_error: Option<ErrorKind>,
}

impl Session {
    fn reset(&mut self) {
        self.principal = None;
        self.state = ReconciliationState::Idle;
        self.generation += 1;
        self.merge_key = None;
        self.attempts = 0;
        self.last_error = None;
    }
}

/// Reconciles one shopper's guest and authenticated carts.
pub struct CartEngine<G, A> {
    guest: G,
    remote: A,
    config: EngineConfig,
    session: Mutex<Session>,
    in_flight: AtomicUsize,
}

impl<G, A> CartEngine<G, A>
where
    G: GuestCartStore,
    A: AuthenticatedCartService,
{
    /// Create an engine in the `Idle` state with auth `Unknown`.
    pub fn new(guest: G, remote: A, config: EngineConfig) -> Self {
        Self {
            guest,
            remote,
            config,
            session: Mutex::new(Session::default()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The guest cart store.
    pub const fn guest(&self) -> &G {
        &self.guest
    }

    /// The authenticated cart service.
    pub const fn remote(&self) -> &A {
        &self.remote
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn busy(&self) -> InFlight<'_> {
        InFlight::enter(&self.in_flight)
    }

    // =========================================================================
    // State machine
    // =========================================================================

    /// Record the current auth status and react to login or logout edges.
    ///
    /// - `Unknown` is recorded but never changes the reconciliation state.
    /// - `Guest` ends any login session.
    /// - `Authenticated` starts a login session if none is active. A different
    ///   principal ends the current session first.
    pub fn observe(&self, status: AuthStatus) {
        let mut session = self.session();

        match &status {
            AuthStatus::Unknown => {}
            AuthStatus::Guest => {
                if session.principal.is_some() || session.state != ReconciliationState::Idle {
                    info!(
                        from = %session.state,
                        "Logged out, resetting cart reconciliation"
                    );
                    session.reset();
                }
            }
            AuthStatus::Authenticated(principal) => {
                if let Some(current) = &session.principal
                    && current != principal
                {
                    info!(
                        from = %current.customer_id(),
                        to = %principal.customer_id(),
                        "Principal changed, starting a new login session"
                    );
                    session.reset();
                }

                if session.principal.is_none() {
                    self.begin_session(&mut session, principal);
                }
                // Keep the freshest token for this customer.
                session.principal = Some(principal.clone());
            }
        }

        session.auth = status;
    }

    fn begin_session(&self, session: &mut Session, principal: &Principal) {
        if session.state != ReconciliationState::Idle {
            return;
        }
        if self.guest.snapshot().is_empty() {
            session.state = ReconciliationState::NotNeeded;
            info!(customer = %principal.customer_id(), "Logged in with empty guest cart, no merge needed");
        } else {
            session.state = ReconciliationState::Pending;
            session.merge_key = Some(MergeKey::generate());
            info!(customer = %principal.customer_id(), "Logged in with guest cart, merge pending");
        }
    }

    /// Drive an owed merge forward by one attempt.
    ///
    /// Returns without calling the cart service unless the session is
    /// `Pending` or `Failed`, the shopper is authenticated, and the guest
    /// cart still has lines. A tick that finds another attempt in flight
    /// returns [`TickOutcome::ReentrantMergeIgnored`].
    ///
    /// Merge failures are never returned as errors. They leave the session
    /// `Failed` with `last_error` set, and the guest cart untouched.
    pub async fn tick(&self) -> TickOutcome {
        let (principal, key, generation, lines) = {
            let mut session = self.session();

            match session.state {
                ReconciliationState::Merging => {
                    debug!("Merge already in flight, ignoring re-entrant tick");
                    return TickOutcome::ReentrantMergeIgnored;
                }
                ReconciliationState::Idle => return TickOutcome::Idle,
                state @ (ReconciliationState::Committed | ReconciliationState::NotNeeded) => {
                    return TickOutcome::Settled(state);
                }
                ReconciliationState::Pending | ReconciliationState::Failed => {}
            }

            let Some(principal) = session.auth.principal().cloned() else {
                return TickOutcome::AwaitingAuth;
            };

            let guest = self.guest.snapshot();
            if guest.is_empty() {
                session.state = ReconciliationState::NotNeeded;
                session.merge_key = None;
                info!(customer = %principal.customer_id(), "Guest cart emptied before merge, nothing to merge");
                return TickOutcome::NotNeeded;
            }

            let key = *session.merge_key.get_or_insert_with(MergeKey::generate);
            session.state = ReconciliationState::Merging;
            session.attempts += 1;
            info!(
                customer = %principal.customer_id(),
                attempt = session.attempts,
                lines = guest.items().len(),
                %key,
                "Merging guest cart"
            );

            (principal, key, session.generation, guest.merge_lines())
        };

        let latch = MergeLatch::new(&self.session, generation);
        let result = self.attempt_merge(&principal, key, &lines).await;
        latch.release();

        let mut session = self.session();
        if session.generation != generation {
            info!(customer = %principal.customer_id(), "Session reset during merge, discarding result");
            return TickOutcome::Superseded;
        }

        match result {
            Ok(Some(cart)) if !cart.is_empty() => {
                self.guest.clear();
                session.state = ReconciliationState::Committed;
                session.merge_key = None;
                session.last_error = None;
                info!(
                    customer = %principal.customer_id(),
                    items = cart.item_count(),
                    "Guest cart merged and cleared"
                );
                TickOutcome::Committed
            }
            Ok(_) => {
                session.state = ReconciliationState::Failed;
                session.last_error = Some(ErrorKind::MergeIncomplete);
                warn!(
                    customer = %principal.customer_id(),
                    attempt = session.attempts,
                    "Merge accepted but authenticated cart still empty, keeping guest cart"
                );
                TickOutcome::Failed(ErrorKind::MergeIncomplete)
            }
            Err(e) => {
                session.state = ReconciliationState::Failed;
                session.last_error = Some(ErrorKind::RemoteUnavailable);
                warn!(
                    customer = %principal.customer_id(),
                    attempt = session.attempts,
                    error = %e,
                    "Merge failed, keeping guest cart"
                );
                TickOutcome::Failed(ErrorKind::RemoteUnavailable)
            }
        }
    }

    /// Merge-in, settle, re-fetch. The re-fetch starts only after merge-in
    /// has resolved.
    async fn attempt_merge(
        &self,
        principal: &Principal,
        key: MergeKey,
        lines: &[MergeLine],
    ) -> Result<Option<CartSnapshot>, RemoteError> {
        let _busy = self.busy();
        self.remote.merge_in(principal, key, lines).await?;
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        self.remote.snapshot(principal).await
    }

    /// Observe `status`, then tick.
    pub async fn sync(&self, status: AuthStatus) -> TickOutcome {
        self.observe(status);
        self.tick().await
    }

    /// Poll `signal` once, then [`sync`](Self::sync).
    pub async fn sync_with<S: AuthSignal + ?Sized>(&self, signal: &S) -> TickOutcome {
        self.sync(signal.status()).await
    }

    /// Sync on the current status and again on every change, until the
    /// signal's sender is dropped.
    pub async fn follow(&self, mut watcher: AuthWatcher) {
        self.sync_with(&watcher).await;
        while let Some(status) = watcher.changed().await {
            let outcome = self.sync(status).await;
            debug!(?outcome, "Auth change handled");
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The cart to show the shopper right now.
    ///
    /// Reads the authenticated cart when a principal is authenticated. A
    /// failed read counts as absent and is recorded as `RemoteUnavailable`.
    #[instrument(skip(self))]
    pub async fn unified_snapshot(&self) -> CartSnapshot {
        let (state, principal) = {
            let session = self.session();
            (session.state, session.auth.principal().cloned())
        };

        let guest = self.guest.snapshot();
        let remote = match &principal {
            Some(principal) => {
                let _busy = self.busy();
                match self.remote.snapshot(principal).await {
                    Ok(cart) => cart,
                    Err(e) => {
                        warn!(error = %e, "Failed to read authenticated cart");
                        self.record_error(ErrorKind::RemoteUnavailable);
                        None
                    }
                }
            }
            None => None,
        };

        view::derive(state, principal.is_some(), guest, remote)
    }

    /// Whether auth is undetermined, a merge is running, or a cart service
    /// call is outstanding.
    pub fn is_loading(&self) -> bool {
        let session = self.session();
        session.auth.is_unknown()
            || session.state == ReconciliationState::Merging
            || self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Most recent failure. Cleared on commit, on logout, or by
    /// [`clear_error`](Self::clear_error).
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.session().last_error
    }

    /// Forget the last failure.
    pub fn clear_error(&self) {
        self.session().last_error = None;
    }

    /// Reconciliation state of the current session. Diagnostic only.
    pub fn reconciliation_state(&self) -> ReconciliationState {
        self.session().state
    }

    /// Snapshot of the engine's bookkeeping.
    pub fn diagnostics(&self) -> Diagnostics {
        let loading = self.is_loading();
        let session = self.session();
        Diagnostics {
            state: session.state,
            auth: session.auth.label(),
            customer_id: session
                .principal
                .as_ref()
                .map(|p| p.customer_id().to_string()),
            merge_attempts: session.attempts,
            last_error: session.last_error,
            loading,
        }
    }

    fn record_error(&self, kind: ErrorKind) {
        self.session().last_error = Some(kind);
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// `InvalidOperand` for an unknown product on the guest side,
    /// `RemoteUnavailable` if the authenticated cart service fails.
    pub async fn add(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Add {
            product_id: product_id.clone(),
            quantity,
        })
        .await
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// `InvalidOperand` if the line does not exist on the guest side,
    /// `RemoteUnavailable` if the authenticated cart service fails.
    pub async fn update(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Update {
            product_id: product_id.clone(),
            quantity,
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// `InvalidOperand` if the line does not exist on the guest side,
    /// `RemoteUnavailable` if the authenticated cart service fails.
    pub async fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Remove {
            product_id: product_id.clone(),
        })
        .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// `RemoteUnavailable` if the authenticated cart service fails.
    pub async fn clear(&self) -> Result<CartSnapshot, CartError> {
        self.mutate(CartMutation::Clear).await
    }

    async fn mutate(&self, mutation: CartMutation) -> Result<CartSnapshot, CartError> {
        let route = Route::for_status(&self.session().auth);
        let _busy = matches!(route, Route::Remote(_)).then(|| self.busy());

        let result = dispatch::apply(&route, &mutation, &self.guest, &self.remote).await;
        if let Err(e) = &result {
            debug!(
                operation = mutation.name(),
                route = route.label(),
                error = %e,
                "Cart mutation failed"
            );
            self.record_error(e.kind());
        }
        result
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Holds the `Merging` latch for one attempt.
///
/// If the attempt is dropped before [`release`](Self::release), for example
/// because the request driving it was cancelled, the session falls back to
/// `Failed` so the next tick retries instead of waiting on a merge that will
/// never finish.
struct MergeLatch<'a> {
    session: &'a Mutex<Session>,
    generation: u64,
    armed: bool,
}

impl<'a> MergeLatch<'a> {
    const fn new(session: &'a Mutex<Session>, generation: u64) -> Self {
        Self {
            session,
            generation,
            armed: true,
        }
    }

    fn release(mut self) {
        self.armed = false;
    }
}

impl Drop for MergeLatch<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.generation == self.generation
            && session.state == ReconciliationState::Merging
        {
            session.state = ReconciliationState::Failed;
            session.last_error = Some(ErrorKind::RemoteUnavailable);
            warn!("Merge attempt abandoned, will retry on next tick");
        }
    }
}

/// Counts an outstanding cart service call for [`CartEngine::is_loading`].
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
