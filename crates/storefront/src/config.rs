//! Store configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (remote backend)
//! - `VIX_SUPABASE_URL` - Project URL of the hosted table store
//! - `VIX_SUPABASE_ANON_KEY` - Project anon (public) API key
//!
//! ## Optional
//! - `VIX_BACKEND` - `remote` or `local` (default: remote)
//! - `VIX_MIRROR_DIR` - Local mirror directory (default: .vix)
//! - `VIX_ADMIN_USERNAME`, `VIX_ADMIN_PASSWORD`, `VIX_ADMIN_SECRET` - Admin
//!   credential triple; all three or none
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::admin::AdminCredentials;

const DEFAULT_MIRROR_DIR: &str = ".vix";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which table store backs the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Hosted store over HTTP.
    #[default]
    Remote,
    /// Tables kept in the mirror directory.
    Local,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            other => Err(format!("expected 'remote' or 'local', got '{other}'")),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Hosted store settings; present whenever `backend` is `Remote`
    pub remote: Option<RemoteConfig>,
    /// Directory of the local mirror
    pub mirror_dir: PathBuf,
    /// Admin credential triple; admin login is refused when absent
    pub admin: Option<AdminCredentials>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Hosted table store settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Project URL (e.g., `https://abc.supabase.co`)
    pub url: Url,
    /// Anon API key
    pub anon_key: SecretString,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let backend = env
            .or_default("VIX_BACKEND", "remote")
            .parse::<BackendKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("VIX_BACKEND".to_string(), e))?;

        let remote = match backend {
            BackendKind::Remote => Some(RemoteConfig::from_env(&env)?),
            BackendKind::Local => RemoteConfig::from_env(&env).ok(),
        };

        Ok(Self {
            backend,
            remote,
            mirror_dir: PathBuf::from(env.or_default("VIX_MIRROR_DIR", DEFAULT_MIRROR_DIR)),
            admin: admin_from_env(&env)?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a local-only store in `mirror_dir`.
    #[must_use]
    pub fn local(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Local,
            remote: None,
            mirror_dir: mirror_dir.into(),
            admin: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl RemoteConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let raw_url = env.required("VIX_SUPABASE_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("VIX_SUPABASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VIX_SUPABASE_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        Ok(Self {
            url,
            anon_key: SecretString::from(env.required("VIX_SUPABASE_ANON_KEY")?),
        })
    }
}

fn admin_from_env<F: Fn(&str) -> Option<String>>(
    env: &Env<F>,
) -> Result<Option<AdminCredentials>, ConfigError> {
    const KEYS: [&str; 3] = ["VIX_ADMIN_USERNAME", "VIX_ADMIN_PASSWORD", "VIX_ADMIN_SECRET"];

    match KEYS.map(|key| env.optional(key)) {
        [None, None, None] => Ok(None),
        [Some(username), Some(password), Some(secret)] => Ok(Some(AdminCredentials::new(
            username,
            SecretString::from(password),
            SecretString::from(secret),
        ))),
        values => {
            let missing = KEYS
                .iter()
                .zip(values.iter())
                .find(|(_, value)| value.is_none())
                .map_or("VIX_ADMIN_SECRET", |(key, _)| *key);
            Err(ConfigError::MissingEnvVar(missing.to_string()))
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source; blank values count as unset.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}
