//! Unified error handling with Sentry integration.
//!
//! Every module has its own error enum; `AppError` wraps them for the
//! application layer and decides what the user is told. Internal details
//! never reach the user message.

use thiserror::Error;

use crate::admin::AdminError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::mirror::MirrorError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Table store operation failed.
    #[error("Store error: {0}")]
    Gateway(#[from] GatewayError),

    /// Local mirror could not be opened.
    #[error("Mirror error: {0}")]
    Mirror(#[from] MirrorError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Admin operation failed.
    #[error("Admin error: {0}")]
    Admin(#[from] AdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the error points at a fault in the system rather than in the
    /// user's input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Gateway(_) | Self::Mirror(_) => true,
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::Remote(_)
                    | CheckoutError::Authentication(_)
                    | CheckoutError::PartialWrite { .. }
            ),
            Self::Admin(err) => matches!(err, AdminError::Gateway(_)),
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Message safe to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => format!("Configuration problem: {err}"),
            Self::Gateway(_) => "The store is unavailable right now. Please try again.".to_string(),
            Self::Mirror(_) => "Local storage is unavailable.".to_string(),
            Self::Checkout(err) => err.user_message().to_string(),
            Self::Admin(err) => err.user_message(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
        }
    }

    /// Log the error, sending internal failures to Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::warn!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
