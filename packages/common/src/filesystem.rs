use crate::storage::{merge_fields, row_id, stamp_new_row};
use crate::{Row, RowStore, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Directory-backed store: one `<table>.json` file holding an array of rows.
///
/// Writes go through a single lock so concurrent callers in one process never
/// interleave a read-modify-write of the same file.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{}.json", table))
    }

    async fn load_table(&self, table: &str) -> StorageResult<Vec<Row>> {
        let path = self.table_path(table);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let rows: Vec<Value> = serde_json::from_str(&content)?;
        rows.into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(StorageError::InvalidRow(format!(
                    "{} contains a non-object row: {}",
                    path.display(),
                    other
                ))),
            })
            .collect()
    }

    async fn save_table(&self, table: &str, rows: &[Row]) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let content = serde_json::to_string_pretty(rows)?;
        tokio::fs::write(self.table_path(table), content).await?;
        tracing::debug!(table, rows = rows.len(), "Saved table");
        Ok(())
    }
}

#[async_trait]
impl RowStore for FileStore {
    async fn read(&self, table: &str, id: &str) -> StorageResult<Row> {
        let _guard = self.lock.lock().await;
        self.load_table(table)
            .await?
            .into_iter()
            .find(|r| row_id(r) == Some(id))
            .ok_or_else(|| StorageError::not_found(table, id))
    }

    async fn list(&self, table: &str, column: &str, value: &Value) -> StorageResult<Vec<Row>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load_table(table)
            .await?
            .into_iter()
            .filter(|r| r.get(column) == Some(value))
            .collect())
    }

    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load_table(table).await?;
        let row = stamp_new_row(row);
        rows.push(row.clone());
        self.save_table(table, &rows).await?;
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, fields: Row) -> StorageResult<Row> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load_table(table).await?;
        let row = rows
            .iter_mut()
            .find(|r| row_id(r) == Some(id))
            .ok_or_else(|| StorageError::not_found(table, id))?;
        merge_fields(row, fields);
        let updated = row.clone();
        self.save_table(table, &rows).await?;
        Ok(updated)
    }

    async fn delete(&self, table: &str, id: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut rows = self.load_table(table).await?;
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id));
        if rows.len() == before {
            return Err(StorageError::not_found(table, id));
        }
        self.save_table(table, &rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_rows_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let row = json!({ "id": "w1", "name": "Card" }).as_object().cloned().unwrap();
        store.insert("widgets", row).await.unwrap();

        let reopened = FileStore::new(dir.path());
        let loaded = reopened.read("widgets", "w1").await.unwrap();
        assert_eq!(loaded["name"], "Card");
    }

    #[tokio::test]
    async fn test_missing_table_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        let rows = store.list("workflows", "project_id", &json!("p1")).await.unwrap();
        assert!(rows.is_empty());
        assert!(store.read("workflows", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("widgets.json"), "[1, 2]").unwrap();

        let store = FileStore::new(dir.path());
        assert!(matches!(
            store.read("widgets", "w1").await,
            Err(StorageError::InvalidRow(_))
        ));
    }
}
