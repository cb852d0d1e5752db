//! Authentication signal consumed by the cart engine.
//!
//! Authentication itself happens elsewhere. The engine only needs to know,
//! at each tick, whether a principal is authenticated and which one.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

/// An authenticated customer, as far as the cart is concerned.
///
/// Two principals are equal when they name the same customer; a refreshed
/// access token does not start a new login session.
#[derive(Clone)]
pub struct Principal {
    customer_id: String,
    access_token: SecretString,
}

impl Principal {
    /// Create a principal from a customer ID and the token the auth provider issued.
    #[must_use]
    pub fn new(customer_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            access_token: SecretString::from(access_token.into()),
        }
    }

    /// Stable customer identifier.
    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Bearer token for the authenticated cart service.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.customer_id == other.customer_id
    }
}

impl Eq for Principal {}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("customer_id", &self.customer_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Tri-state authentication status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// The host has not finished determining who the shopper is.
    #[default]
    Unknown,
    /// Anonymous shopper.
    Guest,
    /// Logged-in customer.
    Authenticated(Principal),
}

impl AuthStatus {
    /// The authenticated principal, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(principal) => Some(principal),
            Self::Unknown | Self::Guest => None,
        }
    }

    /// Whether a principal is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the status is still being determined.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Short label for logs and diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Guest => "guest",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// Source of the current authentication status.
pub trait AuthSignal {
    /// Current status. Called once per engine tick.
    fn status(&self) -> AuthStatus;
}

impl AuthSignal for AuthStatus {
    fn status(&self) -> AuthStatus {
        self.clone()
    }
}

/// Push-style authentication signal backed by a `tokio` watch channel.
///
/// The auth layer calls [`AuthWatch::set`]; observers poll
/// [`AuthSignal::status`] or wait for the next edge with
/// [`AuthWatcher::changed`].
#[derive(Debug, Clone)]
pub struct AuthWatch {
    tx: watch::Sender<AuthStatus>,
}

impl Default for AuthWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthWatch {
    /// Create a signal starting in [`AuthStatus::Unknown`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthStatus::Unknown);
        Self { tx }
    }

    /// Publish a new status. Observers are only woken if the status changed.
    pub fn set(&self, status: AuthStatus) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> AuthWatcher {
        AuthWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl AuthSignal for AuthWatch {
    fn status(&self) -> AuthStatus {
        self.tx.borrow().clone()
    }
}

/// Receiving half of an [`AuthWatch`].
#[derive(Debug, Clone)]
pub struct AuthWatcher {
    rx: watch::Receiver<AuthStatus>,
}

impl AuthWatcher {
    /// Wait for the next status change and return it.
    ///
    /// Returns `None` once every [`AuthWatch`] handle has been dropped.
    pub async fn changed(&mut self) -> Option<AuthStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl AuthSignal for AuthWatcher {
    fn status(&self) -> AuthStatus {
        self.rx.borrow().clone()
    }
}
