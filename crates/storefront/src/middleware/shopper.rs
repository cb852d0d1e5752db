//! Shopper identification from the session.
//!
//! Every visitor gets a shopper ID on first contact, stored in their session
//! and used to find their cart engine. The auth status is derived from the
//! customer login recorded in the same session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::AuthStatus;
use crate::error::AppError;
use crate::models::{CurrentCustomer, session_keys};

/// The shopper making the request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(shopper: Shopper) -> impl IntoResponse {
///     format!("{} is {}", shopper.id, shopper.status.label())
/// }
/// ```
pub struct Shopper {
    /// Key of the shopper's cart engine.
    pub id: Uuid,
    /// Auth status as recorded in the session.
    pub status: AuthStatus,
    session: Session,
}

impl Shopper {
    /// The shopper's session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let id = match session.get::<Uuid>(session_keys::SHOPPER_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(session_keys::SHOPPER_ID, id).await?;
                tracing::debug!(shopper = %id, "New shopper");
                id
            }
        };

        let status = session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await?
            .map_or(AuthStatus::Guest, |customer| {
                AuthStatus::Authenticated(customer.principal())
            });

        Ok(Self {
            id,
            status,
            session,
        })
    }
}

/// Record the logged-in customer in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Forget the logged-in customer. The shopper ID, and with it the guest
/// cart, is kept.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}
