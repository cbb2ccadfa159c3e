//! # Row Storage
//!
//! Row-oriented persistence seam. Documents and workflows are stored as JSON
//! objects keyed by table name and `id`; the backend behind it (hosted
//! database, flat files, memory) is an external collaborator.

use crate::{next_id, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One stored row (a JSON object)
pub type Row = Map<String, Value>;

/// Create/read/update/delete by table and id
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Read one row; `NotFound` if absent
    async fn read(&self, table: &str, id: &str) -> StorageResult<Row>;

    /// All rows whose `column` equals `value`, in insertion order
    async fn list(&self, table: &str, column: &str, value: &Value) -> StorageResult<Vec<Row>>;

    /// Insert a row, returning it with `id` and timestamps filled in
    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row>;

    /// Overwrite the given top-level fields of an existing row
    async fn update(&self, table: &str, id: &str, fields: Row) -> StorageResult<Row>;

    async fn delete(&self, table: &str, id: &str) -> StorageResult<()>;
}

/// Fill in `id`, `created_at` and `updated_at` when the caller left them out
pub(crate) fn stamp_new_row(mut row: Row) -> Row {
    if !matches!(row.get("id"), Some(Value::String(_))) {
        row.insert("id".to_string(), Value::String(next_id()));
    }
    let now = Value::String(chrono::Utc::now().to_rfc3339());
    row.entry("created_at").or_insert_with(|| now.clone());
    row.entry("updated_at").or_insert(now);
    row
}

pub(crate) fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

pub(crate) fn merge_fields(target: &mut Row, fields: Row) {
    for (key, value) in fields {
        // The id is the row's identity and never rewritten by an update
        if key != "id" {
            target.insert(key, value);
        }
    }
}

/// In-memory backend, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table directly, bypassing id/timestamp stamping
    pub async fn seed(&self, table: &str, row: Row) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row);
    }

    pub async fn row_count(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(Vec::len).unwrap_or(0)
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn read(&self, table: &str, id: &str) -> StorageResult<Row> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .and_then(|rows| rows.iter().find(|r| row_id(r) == Some(id)))
            .cloned()
            .ok_or_else(|| StorageError::not_found(table, id))
    }

    async fn list(&self, table: &str, column: &str, value: &Value) -> StorageResult<Vec<Row>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.get(column) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row> {
        let row = stamp_new_row(row);
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, fields: Row) -> StorageResult<Row> {
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| StorageError::not_found(table, id))?;
        merge_fields(row, fields);
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::not_found(table, id))?;
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(StorageError::not_found(table, id));
        }
        Ok(())
    }
}
