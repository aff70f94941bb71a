//! Remote data gateway.
//!
//! A thin query-builder client over the hosted relational table store.
//! Every call returns `Result`; callers branch on the error before touching
//! the value.
//!
//! # Backends
//!
//! - [`RestClient`] - PostgREST-compatible HTTP API (`/rest/v1/<table>`),
//!   with anonymous session recovery through `/auth/v1/signup`
//! - [`LocalTables`] - the same table semantics persisted through a mirror
//!   backend, for local-only mode
//!
//! [`Backend`] selects one of them at runtime from configuration.

mod local;
mod rest;

pub use local::LocalTables;
pub use rest::RestClient;

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::mirror::MirrorError;

/// Tables exposed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Orders,
    OrderItems,
    AdminUsers,
    UserRoles,
}

impl Table {
    /// Table name on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
            Self::AdminUsers => "admin_users",
            Self::UserRoles => "user_roles",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when talking to a table store.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (unreachable host, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error payload.
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error code (Postgres SQLSTATE or `PGRSTxxx`).
        code: String,
        /// Provider error message.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A row addressed by id does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Establishing a session failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The configured URL cannot address the store.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Local-only backend storage failed.
    #[error("Local store error: {0}")]
    Local(#[from] MirrorError),
}

impl GatewayError {
    /// Build an API error.
    #[must_use]
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Provider error code, if the store returned one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } if !code.is_empty() => Some(code),
            _ => None,
        }
    }

    /// Whether the failure is an authentication problem (missing, expired
    /// or rejected session) that a fresh session may fix.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::AuthenticationFailed(_) => true,
            Self::Api {
                status,
                code,
                message,
            } => *status == 401 || code.starts_with("PGRST30") || message.contains("JWT"),
            _ => false,
        }
    }

    /// Whether the store refused the operation for lack of privileges.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Api {
                status,
                code,
                message,
            } => *status == 403 || code == "42501" || message.contains("row-level security"),
            _ => false,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    /// Match rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// Filtered column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Expected value, in its textual form.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether a JSON row satisfies the filter.
    #[must_use]
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        row.get(&self.column)
            .and_then(scalar_text)
            .is_some_and(|text| text == self.value)
    }
}

/// Case-insensitive substring match over several columns (any may match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    columns: Vec<String>,
    term: String,
}

impl Search {
    /// Searched columns.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Search term as given.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Whether a JSON row satisfies the search.
    #[must_use]
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        let needle = self.term.to_lowercase();
        self.columns.iter().any(|column| {
            row.get(column)
                .and_then(scalar_text)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
    }
}

/// Sort order of a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    pub column: String,
    pub ascending: bool,
}

/// Select query: equality filters, an optional search, order and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    filters: Vec<Filter>,
    search: Option<Search>,
    order: Option<Ordering>,
    limit: Option<usize>,
}

impl Query {
    /// Select every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Case-insensitive substring search over `columns`.
    #[must_use]
    pub fn search(mut self, columns: &[&str], term: impl Into<String>) -> Self {
        self.search = Some(Search {
            columns: columns.iter().map(|c| (*c).to_owned()).collect(),
            term: term.into(),
        });
        self
    }

    /// Order by `column`.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Ordering {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Order by creation time, newest first.
    #[must_use]
    pub fn newest_first(self) -> Self {
        self.order_by("created_at", false)
    }

    /// Return at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub const fn search_terms(&self) -> Option<&Search> {
        self.search.as_ref()
    }

    #[must_use]
    pub const fn ordering(&self) -> Option<&Ordering> {
        self.order.as_ref()
    }

    #[must_use]
    pub const fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a JSON row passes every filter and the search.
    #[must_use]
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
            && self.search.as_ref().is_none_or(|s| s.matches(row))
    }
}

/// Text form of a scalar JSON value, as compared by filters.
fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Store trait
// =============================================================================

/// Create/read/update/delete access to the store's tables.
pub trait TableStore: Sync {
    /// Select rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the store cannot be reached, rejects the
    /// query, or returns rows that do not decode as `T`.
    fn select<T>(
        &self,
        table: Table,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<T>, GatewayError>> + Send
    where
        T: DeserializeOwned + Send;

    /// Insert `rows` and return them as stored (with generated columns).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the store rejects the insert.
    fn insert<B, T>(
        &self,
        table: Table,
        rows: &[B],
    ) -> impl Future<Output = Result<Vec<T>, GatewayError>> + Send
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send;

    /// Apply `patch` to every row matching `filter` and return the updated rows.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the store rejects the update.
    fn update<B, T>(
        &self,
        table: Table,
        filter: &Filter,
        patch: &B,
    ) -> impl Future<Output = Result<Vec<T>, GatewayError>> + Send
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send;

    /// Delete every row matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the store rejects the delete.
    fn delete(
        &self,
        table: Table,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Re-establish a session with the store.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::AuthenticationFailed` if no session could be
    /// obtained.
    fn reauthenticate(&self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Select the row with primary key `id`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` if no such row exists.
    fn select_by_id<T>(
        &self,
        table: Table,
        id: i64,
    ) -> impl Future<Output = Result<T, GatewayError>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            let query = Query::new().eq("id", id).limit(1);
            self.select::<T>(table, &query)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| GatewayError::NotFound(format!("{table} #{id}")))
        }
    }

    /// Update the row with primary key `id` and return it.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NotFound` if no row was updated.
    fn update_by_id<B, T>(
        &self,
        table: Table,
        id: i64,
        patch: &B,
    ) -> impl Future<Output = Result<T, GatewayError>> + Send
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        async move {
            let filter = Filter::eq("id", id);
            self.update::<B, T>(table, &filter, patch)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| GatewayError::NotFound(format!("{table} #{id}")))
        }
    }

    /// Delete the row with primary key `id`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the store rejects the delete.
    fn delete_by_id(
        &self,
        table: Table,
        id: i64,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async move { self.delete(table, &Filter::eq("id", id)).await }
    }
}

// =============================================================================
// Runtime-selected backend
// =============================================================================

/// Table store selected by configuration.
#[derive(Clone)]
pub enum Backend {
    /// Hosted store over HTTP.
    Remote(RestClient),
    /// Local-only tables kept in the mirror directory.
    Local(LocalTables),
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(_) => f.write_str("Backend::Remote"),
            Self::Local(_) => f.write_str("Backend::Local"),
        }
    }
}

impl TableStore for Backend {
    async fn select<T>(&self, table: Table, query: &Query) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
    {
        match self {
            Self::Remote(client) => client.select(table, query).await,
            Self::Local(tables) => tables.select(table, query).await,
        }
    }

    async fn insert<B, T>(&self, table: Table, rows: &[B]) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        match self {
            Self::Remote(client) => client.insert(table, rows).await,
            Self::Local(tables) => tables.insert(table, rows).await,
        }
    }

    async fn update<B, T>(
        &self,
        table: Table,
        filter: &Filter,
        patch: &B,
    ) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        match self {
            Self::Remote(client) => client.update(table, filter, patch).await,
            Self::Local(tables) => tables.update(table, filter, patch).await,
        }
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError> {
        match self {
            Self::Remote(client) => client.delete(table, filter).await,
            Self::Local(tables) => tables.delete(table, filter).await,
        }
    }

    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        match self {
            Self::Remote(client) => client.reauthenticate().await,
            Self::Local(tables) => tables.reauthenticate().await,
        }
    }
}
