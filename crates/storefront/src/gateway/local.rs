//! Table store persisted through a mirror backend (local-only mode).
//!
//! Each table is one JSON array stored under `vix_table_<name>`. Inserts
//! assign increasing integer ids and a `created_at` timestamp, the way the
//! hosted store's column defaults would.

use std::cmp::Ordering as CmpOrdering;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{Filter, GatewayError, Query, Table, TableStore};
use crate::mirror::{MirrorBackend, MirrorError, entry_key};

/// Table store kept in a [`MirrorBackend`].
#[derive(Clone)]
pub struct LocalTables {
    backend: Arc<dyn MirrorBackend>,
    /// Serializes read-modify-write cycles on the stored arrays.
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for LocalTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTables").finish_non_exhaustive()
    }
}

impl LocalTables {
    /// Create a table store over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn MirrorBackend>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Mirror key holding `table`.
    #[must_use]
    pub fn key(table: Table) -> String {
        entry_key(&format!("table_{}", table.as_str()))
    }

    fn read_rows(&self, table: Table) -> Result<Vec<Value>, GatewayError> {
        match self.backend.get(&Self::key(table))? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    fn write_rows(&self, table: Table, rows: &[Value]) -> Result<(), GatewayError> {
        let raw = serde_json::to_string(rows)?;
        self.backend.set(&Self::key(table), &raw)?;
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, GatewayError> {
        self.lock
            .lock()
            .map_err(|_| GatewayError::Local(MirrorError::Poisoned))
    }

    fn select_rows(&self, table: Table, query: &Query) -> Result<Vec<Value>, GatewayError> {
        let _guard = self.guard()?;
        let mut rows: Vec<Value> = self
            .read_rows(table)?
            .into_iter()
            .filter(|row| query.matches(row))
            .collect();

        if let Some(order) = query.ordering() {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    fn insert_rows(&self, table: Table, new_rows: Vec<Value>) -> Result<Vec<Value>, GatewayError> {
        let _guard = self.guard()?;
        let mut rows = self.read_rows(table)?;
        let mut next_id = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut inserted = Vec::with_capacity(new_rows.len());
        for row in new_rows {
            let mut object = into_object(row)?;
            if object.get("id").is_none_or(Value::is_null) {
                object.insert("id".to_string(), Value::from(next_id));
                next_id += 1;
            }
            if object.get("created_at").is_none_or(Value::is_null) {
                object.insert("created_at".to_string(), Value::from(now.clone()));
            }
            inserted.push(Value::Object(object));
        }

        rows.extend(inserted.iter().cloned());
        self.write_rows(table, &rows)?;
        Ok(inserted)
    }

    fn update_rows(
        &self,
        table: Table,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, GatewayError> {
        let patch = into_object(patch)?;
        let _guard = self.guard()?;
        let mut rows = self.read_rows(table)?;

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| filter.matches(row)) {
            if let Value::Object(object) = row {
                for (column, value) in &patch {
                    object.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }

        if !updated.is_empty() {
            self.write_rows(table, &rows)?;
        }
        Ok(updated)
    }

    fn delete_rows(&self, table: Table, filter: &Filter) -> Result<usize, GatewayError> {
        let _guard = self.guard()?;
        let mut rows = self.read_rows(table)?;
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));

        let removed = before - rows.len();
        if removed > 0 {
            self.write_rows(table, &rows)?;
        }
        Ok(removed)
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, GatewayError> {
    match value {
        Value::Object(object) => Ok(object),
        other => Err(GatewayError::api(
            400,
            "PGRST102",
            format!("expected a JSON object row, got {other}"),
        )),
    }
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    Ok(serde_json::from_value(Value::Array(rows))?)
}

/// Order column values: numbers numerically, timestamps chronologically,
/// other strings lexically; missing and null values sort first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

impl TableStore for LocalTables {
    async fn select<T>(&self, table: Table, query: &Query) -> Result<Vec<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
    {
        decode_rows(self.select_rows(table, query)?)
    }

    async fn insert<B, T>(&self, table: Table, rows: &[B]) -> Result<Vec<T>, GatewayError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let inserted = self.insert_rows(table, values)?;
        tracing::debug!(table = %table, count = inserted.len(), "Inserted local rows");
        decode_rows(inserted)
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
        let patch = serde_json::to_value(patch)?;
        decode_rows(self.update_rows(table, filter, patch)?)
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<(), GatewayError> {
        let removed = self.delete_rows(table, filter)?;
        tracing::debug!(table = %table, count = removed, "Deleted local rows");
        Ok(())
    }

    async fn reauthenticate(&self) -> Result<(), GatewayError> {
        // No session in local mode.
        Ok(())
    }
}
