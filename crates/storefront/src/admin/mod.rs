//! Admin back-office: login gate, product management, order management
//! and client-side filters.

mod auth;
mod filters;
mod orders;
mod products;

pub use auth::{AdminCredentials, LoginAttempt, is_logged_in, login, logout};
pub use filters::{DateBucket, OrderFilter, ProductFilter};
pub use orders::{OrderList, OrderSource, OrderStats};
pub use products::{
    DEFAULT_COLORS, DEFAULT_SIZES, ImageError, ImageInput, MAX_IMAGE_BYTES, ProductForm,
    ProductFormErrors, generate_sku,
};

use thiserror::Error;

use crate::gateway::{GatewayError, TableStore};
use crate::mirror::Mirror;

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Username, password or secret code did not match.
    #[error("invalid admin credentials")]
    InvalidCredentials,

    /// No admin credentials are configured, so nobody can log in.
    #[error("admin login is not configured")]
    NotConfigured,

    /// The operation needs an admin session.
    #[error("admin login required")]
    NotLoggedIn,

    #[error("invalid product: {0}")]
    InvalidProduct(ProductFormErrors),

    #[error("image rejected: {0}")]
    Image(#[from] ImageError),

    /// The store refused the mutation for lack of privileges.
    #[error("permission denied: {0}")]
    PermissionDenied(#[source] GatewayError),

    #[error("store error: {0}")]
    Gateway(#[source] GatewayError),
}

impl From<GatewayError> for AdminError {
    fn from(err: GatewayError) -> Self {
        if err.is_permission_denied() {
            Self::PermissionDenied(err)
        } else {
            Self::Gateway(err)
        }
    }
}

impl AdminError {
    /// Message shown to the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid username, password or secret code.".to_string(),
            Self::NotConfigured => "Admin access is not configured.".to_string(),
            Self::NotLoggedIn => "Please log in as an administrator first.".to_string(),
            Self::InvalidProduct(errors) => format!("Please fix the product form: {errors}"),
            Self::Image(err) => err.to_string(),
            Self::PermissionDenied(_) => {
                "You do not have permission to do this. Please contact the administrator."
                    .to_string()
            }
            Self::Gateway(GatewayError::NotFound(_)) => "The record no longer exists.".to_string(),
            Self::Gateway(_) => "The operation failed. Please try again.".to_string(),
        }
    }
}

/// Product and order management over a table store, keeping the mirrored
/// caches in step.
pub struct AdminPanel<'a, S> {
    store: &'a S,
    mirror: &'a Mirror,
}

impl<'a, S: TableStore> AdminPanel<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, mirror: &'a Mirror) -> Self {
        Self { store, mirror }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_errors_are_classified() {
        let err = AdminError::from(GatewayError::api(401, "42501", "permission denied"));
        assert!(matches!(err, AdminError::PermissionDenied(_)));
        assert!(err.user_message().contains("contact the administrator"));

        let err = AdminError::from(GatewayError::api(500, "XX000", "boom"));
        assert!(matches!(err, AdminError::Gateway(_)));
        assert!(!err.user_message().contains("boom"));
    }
}
