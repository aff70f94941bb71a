//! Integration tests for the VIX store.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vix-integration-tests
//! ```
//!
//! The tests drive the storefront library end to end against
//! [`ScriptedStore`]: real local tables underneath, with failures injected
//! per operation and table so the fallback and recovery paths can be
//! exercised without a hosted store.
//!
//! # Test Categories
//!
//! - `catalog` - Store, cache and default-catalog fallback
//! - `checkout` - Cart arithmetic, validation and order submission
//! - `admin` - Login gate, product and order management, filters

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use vix_core::Product;
use vix_storefront::AppState;
use vix_storefront::admin::{AdminCredentials, LoginAttempt};
use vix_storefront::catalog::default_catalog;
use vix_storefront::checkout::CustomerInfo;
use vix_storefront::config::StoreConfig;
use vix_storefront::gateway::{Filter, GatewayError, LocalTables, Query, Table, TableStore};
use vix_storefront::mirror::{MemoryMirror, Mirror, MirrorBackend};

/// Table store operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Select,
    Insert,
    Update,
    Delete,
}

/// [`LocalTables`] with scripted failures.
///
/// Each `(Op, Table)` pair has a queue of errors; a call pops the next one
/// and fails with it instead of touching the tables. Calls and session
/// recoveries are counted.
pub struct ScriptedStore {
    tables: LocalTables,
    failures: Mutex<HashMap<(Op, Table), VecDeque<GatewayError>>>,
    calls: Mutex<Vec<(Op, Table)>>,
    reauth_calls: AtomicUsize,
    reauth_failures: Mutex<VecDeque<GatewayError>>,
}

impl ScriptedStore {
    #[must_use]
    pub fn new(backend: Arc<dyn MirrorBackend>) -> Self {
        Self {
            tables: LocalTables::new(backend),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            reauth_calls: AtomicUsize::new(0),
            reauth_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// The next `op` on `table` fails with `error`.
    pub fn fail_next(&self, op: Op, table: Table, error: GatewayError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((op, table))
            .or_default()
            .push_back(error);
    }

    /// The next session recovery fails with `error`.
    pub fn fail_next_reauth(&self, error: GatewayError) {
        self.reauth_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Number of `op` calls made on `table`, failed ones included.
    #[must_use]
    pub fn calls(&self, op: Op, table: Table) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| **call == (op, table))
            .count()
    }

    #[must_use]
    pub fn reauth_calls(&self) -> usize {
        self.reauth_calls.load(Ordering::SeqCst)
    }

    /// Direct access to the tables, bypassing scripted failures.
    #[must_use]
    pub const fn tables(&self) -> &LocalTables {
        &self.tables
    }

    fn record(&self, op: Op, table: Table) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((op, table));
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&(op, table))
            .and_then(VecDeque::pop_front);
        scripted.map_or(Ok(()), Err)
    }
}

impl TableStore for ScriptedStore {
    async fn select<T>(&self, table: Table, query: &Query) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
    {
        self.record(Op::Select, table)?;
        self.tables.select(table, query).await
    }

    async fn insert<B, T>(&self, table: Table, rows: &[B]) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        self.record(Op::Insert, table)?;
        self.tables.insert(table, rows).await
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
        self.record(Op::Update, table)?;
        self.tables.update(table, filter, patch).await
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError> {
        self.record(Op::Delete, table)?;
        self.tables.delete(table, filter).await
    }

    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        self.reauth_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .reauth_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.map_or(Ok(()), Err)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Admin credentials configured for [`Harness`].
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret-pass";
pub const ADMIN_SECRET: &str = "VIX-7781";

/// Application state over a [`ScriptedStore`] and an in-memory mirror.
pub struct Harness {
    pub state: AppState<ScriptedStore>,
}

impl Harness {
    /// Empty store and empty mirror.
    #[must_use]
    pub fn new() -> Self {
        let backend: Arc<MemoryMirror> = Arc::new(MemoryMirror::new());
        let mirror = Mirror::new(backend.clone());
        Self::with_parts(ScriptedStore::new(backend), mirror)
    }

    /// Build over an existing store and mirror (for state that must
    /// survive a "restart").
    #[must_use]
    pub fn with_parts(store: ScriptedStore, mirror: Mirror) -> Self {
        let mut config = StoreConfig::local("unused");
        config.admin = Some(AdminCredentials::new(
            ADMIN_USERNAME.to_string(),
            SecretString::from(ADMIN_PASSWORD),
            SecretString::from(ADMIN_SECRET),
        ));
        Self {
            state: AppState::new(config, store, mirror),
        }
    }

    /// Store seeded with the default catalog.
    ///
    /// # Panics
    ///
    /// Panics if the local tables reject the seed rows.
    pub async fn seeded() -> Self {
        let harness = Self::new();
        let seeded: Vec<Product> = harness
            .store()
            .tables()
            .insert(Table::Products, &default_catalog())
            .await
            .unwrap_or_else(|e| panic!("seeding products failed: {e}"));
        assert_eq!(seeded.len(), 2);
        harness
    }

    #[must_use]
    pub const fn store(&self) -> &ScriptedStore {
        self.state.store()
    }

    #[must_use]
    pub const fn mirror(&self) -> &Mirror {
        self.state.mirror()
    }

    /// Log in with the configured credentials.
    ///
    /// # Panics
    ///
    /// Panics if the login is refused.
    pub fn login(&mut self) {
        self.state
            .admin_login(&LoginAttempt {
                username: ADMIN_USERNAME,
                password: ADMIN_PASSWORD,
                secret_code: ADMIN_SECRET,
            })
            .unwrap_or_else(|e| panic!("admin login failed: {e}"));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// A customer that passes validation.
#[must_use]
pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Mona Adel".to_string(),
        phone: "01012345678".to_string(),
        address: "12 Tahrir St, Cairo".to_string(),
        notes: "Ring twice".to_string(),
    }
}

/// A 401 with an expired-token code.
#[must_use]
pub fn jwt_expired() -> GatewayError {
    GatewayError::api(401, "PGRST301", "JWT expired")
}

/// A row-level-security refusal.
#[must_use]
pub fn rls_denied() -> GatewayError {
    GatewayError::api(
        403,
        "42501",
        "new row violates row-level security policy for table \"products\"",
    )
}

/// A generic server failure.
#[must_use]
pub fn server_error() -> GatewayError {
    GatewayError::api(500, "", "upstream unavailable")
}
