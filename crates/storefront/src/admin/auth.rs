//! Admin login gate.
//!
//! Three values are checked together: username, password and a separate
//! secret code. Every comparison runs regardless of earlier mismatches,
//! and none of them grants access alone.

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::AdminError;
use crate::mirror::Mirror;

/// Configured admin credential triple.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    password: SecretString,
    secret_code: SecretString,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("secret_code", &"[REDACTED]")
            .finish()
    }
}

impl AdminCredentials {
    #[must_use]
    pub const fn new(username: String, password: SecretString, secret_code: SecretString) -> Self {
        Self {
            username,
            password,
            secret_code,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether `attempt` matches all three values.
    #[must_use]
    pub fn verify(&self, attempt: &LoginAttempt<'_>) -> bool {
        let username = equals(self.username.trim(), attempt.username.trim());
        let password = equals(self.password.expose_secret(), attempt.password);
        let secret = equals(self.secret_code.expose_secret(), attempt.secret_code.trim());
        username && password && secret
    }
}

/// Values typed at the login gate.
#[derive(Clone, Copy)]
pub struct LoginAttempt<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub secret_code: &'a str,
}

/// Compare without stopping at the first differing byte.
fn equals(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0 && a.len() == b.len()
}

/// Check the attempt and persist the admin flag on success.
///
/// # Errors
///
/// Returns `NotConfigured` when no credentials are configured and
/// `InvalidCredentials` when any of the three values is wrong.
#[instrument(skip_all, fields(username = %attempt.username))]
pub fn login(
    credentials: Option<&AdminCredentials>,
    mirror: &Mirror,
    attempt: &LoginAttempt<'_>,
) -> Result<(), AdminError> {
    let Some(credentials) = credentials else {
        tracing::warn!("Admin login attempted but no credentials are configured");
        return Err(AdminError::NotConfigured);
    };

    if !credentials.verify(attempt) {
        tracing::warn!("Admin login rejected");
        return Err(AdminError::InvalidCredentials);
    }

    mirror.save_admin_flag(true);
    tracing::info!("Admin logged in");
    Ok(())
}

/// Clear the persisted admin flag.
pub fn logout(mirror: &Mirror) {
    mirror.save_admin_flag(false);
    tracing::info!("Admin logged out");
}

/// Whether the persisted admin flag is set.
#[must_use]
pub fn is_logged_in(mirror: &Mirror) -> bool {
    mirror.load_admin_flag()
}
