//! # Workflows
//!
//! A workflow binds a trigger to an ordered list of steps. Records live in
//! the `workflows` table with snake_case columns; the domain type is
//! camelCase on the wire like everything else editors see.

use crate::step::{ActionStep, TriggerType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;
use widgetforge_common::{Row, RowStore, StorageError};

pub const WORKFLOWS_TABLE: &str = "workflows";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub trigger: TriggerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub steps: Vec<ActionStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a workflow about to be created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDraft {
    pub project_id: String,
    pub name: String,
    pub trigger: TriggerType,
    #[serde(default)]
    pub steps: Vec<ActionStep>,
    #[serde(default)]
    pub widget_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
}

/// Partial update; `None` leaves the stored value alone.
///
/// `widget_id` and `page_id` take `Some(None)` (a JSON `null`) to detach the
/// workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trigger: Option<TriggerType>,
    #[serde(default)]
    pub steps: Option<Vec<ActionStep>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub widget_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub page_id: Option<Option<String>>,
}

/// A key that is present, even as `null`, decodes to `Some`
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<String>>, D::Error> {
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid workflow row {id}: {message}")]
    InvalidRow { id: String, message: String },
}

/// Stored column layout
#[derive(Debug, Serialize, Deserialize)]
struct WorkflowRow {
    id: String,
    project_id: String,
    name: String,
    trigger: TriggerType,
    #[serde(default)]
    steps: Option<Vec<ActionStep>>,
    #[serde(default)]
    widget_id: Option<String>,
    #[serde(default)]
    page_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkflowRow> for Workflow {
    fn from(row: WorkflowRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            trigger: row.trigger,
            widget_id: row.widget_id,
            page_id: row.page_id,
            project_id: row.project_id,
            steps: row.steps.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_row(row: Row) -> Result<Workflow, WorkflowError> {
    let id = row
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    serde_json::from_value::<WorkflowRow>(Value::Object(row))
        .map(Workflow::from)
        .map_err(|e| WorkflowError::InvalidRow {
            id,
            message: e.to_string(),
        })
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, WorkflowError> {
    serde_json::to_value(value).map_err(|e| WorkflowError::Storage(StorageError::Json(e)))
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

/// Workflow records on top of any [`RowStore`]
pub struct WorkflowRepository<S> {
    store: S,
}

impl<S: RowStore> WorkflowRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Workflows of a project, newest first
    #[instrument(skip(self))]
    pub async fn list(&self, project_id: &str) -> Result<Vec<Workflow>, WorkflowError> {
        let rows = self
            .store
            .list(WORKFLOWS_TABLE, "project_id", &Value::String(project_id.to_string()))
            .await?;

        let mut workflows: Vec<_> = rows
            .into_iter()
            .filter_map(|row| match map_row(row) {
                Ok(workflow) => Some(workflow),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable workflow row");
                    None
                }
            })
            .collect();
        // Later inserts win ties
        workflows.reverse();
        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!(count = workflows.len(), "Loaded workflows");
        Ok(workflows)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Workflow, WorkflowError> {
        map_row(self.store.read(WORKFLOWS_TABLE, id).await?)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: WorkflowDraft) -> Result<Workflow, WorkflowError> {
        let mut row = Map::new();
        row.insert("project_id".to_string(), Value::String(draft.project_id));
        row.insert("name".to_string(), Value::String(draft.name));
        row.insert("trigger".to_string(), to_json(&draft.trigger)?);
        row.insert("steps".to_string(), to_json(&draft.steps)?);
        row.insert("widget_id".to_string(), optional_string(&draft.widget_id));
        row.insert("page_id".to_string(), optional_string(&draft.page_id));

        let stored = self.store.insert(WORKFLOWS_TABLE, row).await?;
        let workflow = map_row(stored)?;
        tracing::info!(id = %workflow.id, "Created workflow");
        Ok(workflow)
    }

    #[instrument(skip(self, changes))]
    pub async fn update(&self, id: &str, changes: WorkflowChanges) -> Result<Workflow, WorkflowError> {
        let mut fields = Map::new();
        if let Some(name) = changes.name {
            fields.insert("name".to_string(), Value::String(name));
        }
        if let Some(trigger) = changes.trigger {
            fields.insert("trigger".to_string(), to_json(&trigger)?);
        }
        if let Some(steps) = changes.steps {
            fields.insert("steps".to_string(), to_json(&steps)?);
        }
        if let Some(widget_id) = changes.widget_id {
            fields.insert("widget_id".to_string(), optional_string(&widget_id));
        }
        if let Some(page_id) = changes.page_id {
            fields.insert("page_id".to_string(), optional_string(&page_id));
        }
        fields.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

        map_row(self.store.update(WORKFLOWS_TABLE, id, fields).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), WorkflowError> {
        self.store.delete(WORKFLOWS_TABLE, id).await?;
        Ok(())
    }
}

/// Workflows attached to a widget
pub fn for_widget<'a>(workflows: &'a [Workflow], widget_id: &str) -> Vec<&'a Workflow> {
    workflows
        .iter()
        .filter(|w| w.widget_id.as_deref() == Some(widget_id))
        .collect()
}

/// Workflows attached to a page
pub fn for_page<'a>(workflows: &'a [Workflow], page_id: &str) -> Vec<&'a Workflow> {
    workflows
        .iter()
        .filter(|w| w.page_id.as_deref() == Some(page_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{Action, ElementTarget};
    use serde_json::json;
    use widgetforge_common::MemoryStore;

    fn draft(name: &str, widget: Option<&str>) -> WorkflowDraft {
        WorkflowDraft {
            project_id: "p1".to_string(),
            name: name.to_string(),
            trigger: TriggerType::OnClick,
            steps: vec![ActionStep::new(Action::VisibilityHide(ElementTarget {
                element_id: "banner".to_string(),
            }))],
            widget_id: widget.map(str::to_string),
            page_id: Some("home".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = WorkflowRepository::new(MemoryStore::new());
        let created = repo.create(draft("Hide banner", Some("w1"))).await.unwrap();

        let loaded = repo.get(&created.id).await.unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.steps.len(), 1);

        let row = repo.store().read(WORKFLOWS_TABLE, &created.id).await.unwrap();
        assert_eq!(row["widget_id"], json!("w1"));
        assert_eq!(row["steps"][0]["type"], json!("visibility.hide"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        for (id, created) in [("old", "2024-01-01T00:00:00Z"), ("new", "2024-06-01T00:00:00Z")] {
            store
                .seed(
                    WORKFLOWS_TABLE,
                    json!({
                        "id": id,
                        "project_id": "p1",
                        "name": id,
                        "trigger": "onPageLoad",
                        "steps": null,
                        "created_at": created,
                        "updated_at": created,
                    })
                    .as_object()
                    .cloned()
                    .unwrap(),
                )
                .await;
        }

        let repo = WorkflowRepository::new(store);
        let ids: Vec<_> = repo.list("p1").await.unwrap().into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(repo.list("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_touches_only_given_fields() {
        let repo = WorkflowRepository::new(MemoryStore::new());
        let created = repo.create(draft("Original", None)).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                WorkflowChanges {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.trigger, created.trigger);
        assert_eq!(updated.steps, created.steps);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let repo = WorkflowRepository::new(MemoryStore::new());
        let created = repo.create(draft("Temp", None)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(matches!(
            repo.get(&created.id).await,
            Err(WorkflowError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_widget_and_page_filters() {
        let repo = WorkflowRepository::new(MemoryStore::new());
        repo.create(draft("A", Some("w1"))).await.unwrap();
        repo.create(draft("B", Some("w2"))).await.unwrap();

        let all = repo.list("p1").await.unwrap();
        assert_eq!(for_widget(&all, "w1").len(), 1);
        assert_eq!(for_widget(&all, "w1")[0].name, "A");
        assert_eq!(for_page(&all, "home").len(), 2);
        assert!(for_page(&all, "about").is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_rows() {
        let store = MemoryStore::new();
        store
            .seed(
                WORKFLOWS_TABLE,
                json!({
                    "id": "broken",
                    "project_id": "p1",
                    "name": "Broken",
                    "trigger": "onClick",
                    "steps": [{ "config": {} }],
                    "created_at": "2024-06-01T00:00:00Z",
                    "updated_at": "2024-06-01T00:00:00Z",
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await;
        let repo = WorkflowRepository::new(store);
        let good = repo.create(draft("Good", Some("w1"))).await.unwrap();

        let listed = repo.list("p1").await.unwrap();
        assert_eq!(listed, vec![good]);
        assert!(matches!(repo.get("broken").await, Err(WorkflowError::InvalidRow { .. })));
    }

    #[tokio::test]
    async fn test_update_can_detach_widget_and_page() {
        let repo = WorkflowRepository::new(MemoryStore::new());
        let created = repo.create(draft("Attached", Some("w1"))).await.unwrap();

        let changes: WorkflowChanges = serde_json::from_value(json!({ "widgetId": null })).unwrap();
        assert_eq!(changes.widget_id, Some(None));
        assert_eq!(changes.page_id, None);

        let updated = repo.update(&created.id, changes).await.unwrap();
        assert_eq!(updated.widget_id, None);
        assert_eq!(updated.page_id.as_deref(), Some("home"));

        let updated = repo
            .update(
                &created.id,
                WorkflowChanges {
                    widget_id: Some(Some("w2".to_string())),
                    page_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.widget_id.as_deref(), Some("w2"));
        assert_eq!(updated.page_id, None);

        let row = repo.store().read(WORKFLOWS_TABLE, &created.id).await.unwrap();
        assert_eq!(row["page_id"], Value::Null);
    }
}
