//! Local mirror store.
//!
//! A small key-value persistence layer that plays the role browser local
//! storage plays for a web client: it caches the product list, the admin
//! session flag and a backup of the order list so the store keeps working
//! when the remote table store is unreachable.
//!
//! # Contract
//!
//! [`Mirror::save`] and [`Mirror::load`] never fail from the caller's point
//! of view. Storage and decoding errors are logged and swallowed; `load`
//! returns `T::default()` for missing or malformed entries. There is no TTL
//! and no size limit.
//!
//! # Keys
//!
//! | Key                  | Contents                              |
//! |----------------------|---------------------------------------|
//! | `vix_products`       | JSON array of products                |
//! | `vix_admin`          | literal `true` / `false`              |
//! | `vix_orders_backup`  | JSON array of orders with their items |
//! | `vix_<name>`         | ad hoc per-feature caches             |

mod file;
mod memory;

pub use file::FileMirror;
pub use memory::MemoryMirror;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use vix_core::{OrderWithItems, Product};

/// Prefix shared by every key the store writes.
pub const KEY_PREFIX: &str = "vix_";

/// Key holding the cached product list.
pub const PRODUCTS_KEY: &str = "vix_products";

/// Key holding the admin-logged-in flag.
pub const ADMIN_KEY: &str = "vix_admin";

/// Key holding the orders backup.
pub const ORDERS_BACKUP_KEY: &str = "vix_orders_backup";

/// Errors raised by a [`MirrorBackend`].
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Reading or writing the underlying storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The key contains characters the backend cannot store.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The backend's lock was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Raw string storage behind a [`Mirror`].
pub trait MirrorBackend: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError` if the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, MirrorError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError` if the storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), MirrorError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `MirrorError` if the storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), MirrorError>;
}

/// Never-failing JSON cache over a [`MirrorBackend`].
#[derive(Clone)]
pub struct Mirror {
    backend: Arc<dyn MirrorBackend>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror").finish_non_exhaustive()
    }
}

impl Mirror {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn MirrorBackend>) -> Self {
        Self { backend }
    }

    /// An ephemeral in-memory mirror.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMirror::new()))
    }

    /// The backend, for components that need fallible raw access.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn MirrorBackend> {
        Arc::clone(&self.backend)
    }

    /// Serialize `value` as JSON and store it under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(MirrorError::from)
            .and_then(|json| self.backend.set(key, &json));

        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to save to local mirror");
        }
    }

    /// Load and deserialize the value under `key`.
    ///
    /// Returns `T::default()` if the key is missing or its value is malformed.
    #[must_use]
    pub fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.backend.get(key) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Discarding malformed local mirror entry");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read local mirror");
                T::default()
            }
        }
    }

    /// Remove the value under `key`.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!(key, error = %e, "Failed to remove local mirror entry");
        }
    }

    // =========================================================================
    // Product cache
    // =========================================================================

    /// Replace the cached product list.
    pub fn save_products(&self, products: &[Product]) {
        self.save(PRODUCTS_KEY, products);
    }

    /// Cached product list, empty if none.
    #[must_use]
    pub fn load_products(&self) -> Vec<Product> {
        self.load(PRODUCTS_KEY)
    }

    // =========================================================================
    // Admin flag
    // =========================================================================

    /// Persist the admin-logged-in flag as a literal `true`/`false`.
    pub fn save_admin_flag(&self, logged_in: bool) {
        let value = if logged_in { "true" } else { "false" };
        if let Err(e) = self.backend.set(ADMIN_KEY, value) {
            tracing::warn!(key = ADMIN_KEY, error = %e, "Failed to save admin flag");
        }
    }

    /// Whether an admin session was persisted. Anything but `true` is false.
    #[must_use]
    pub fn load_admin_flag(&self) -> bool {
        match self.backend.get(ADMIN_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!(key = ADMIN_KEY, error = %e, "Failed to read admin flag");
                false
            }
        }
    }

    // =========================================================================
    // Orders backup
    // =========================================================================

    /// Replace the orders backup.
    pub fn save_orders_backup(&self, orders: &[OrderWithItems]) {
        self.save(ORDERS_BACKUP_KEY, orders);
    }

    /// Backed-up orders, empty if none.
    #[must_use]
    pub fn load_orders_backup(&self) -> Vec<OrderWithItems> {
        self.load(ORDERS_BACKUP_KEY)
    }

    /// Add one order at the front of the backup (newest first).
    pub fn push_order_backup(&self, order: OrderWithItems) {
        let mut orders = self.load_orders_backup();
        orders.retain(|existing| existing.order.id != order.order.id);
        orders.insert(0, order);
        self.save_orders_backup(&orders);
    }

    // =========================================================================
    // Ad hoc caches
    // =========================================================================

    /// Store an ad hoc cache entry under `vix_<name>`.
    pub fn save_entry<T: Serialize + ?Sized>(&self, name: &str, value: &T) {
        self.save(&entry_key(name), value);
    }

    /// Load an ad hoc cache entry stored under `vix_<name>`.
    #[must_use]
    pub fn load_entry<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        self.load(&entry_key(name))
    }

    /// Remove an ad hoc cache entry.
    pub fn remove_entry(&self, name: &str) {
        self.remove(&entry_key(name));
    }
}

/// Full key for an ad hoc entry.
#[must_use]
pub fn entry_key(name: &str) -> String {
    format!("{KEY_PREFIX}{name}")
}
