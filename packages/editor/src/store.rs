//! # Document Store
//!
//! The editing session behind a builder canvas: at most one open document,
//! its selection, and load/save against the `widgets` table.
//!
//! Tree operations never fail loudly. A rejected mutation (unknown id,
//! root edit, cycle, ...) is logged at debug level and reported as `None`
//! or `false`; the document is left untouched. Storage errors on load and
//! save do propagate.

use crate::document::{BindingProperty, Document, ListItemMetaPatch, WidgetKind};
use crate::errors::EditorError;
use crate::selection::Selection;
use serde_json::{Map, Value};
use tracing::instrument;
use widgetforge_actions::{ActionStep, TriggerType};
use widgetforge_common::RowStore;
use widgetforge_tree::{
    project_style, DropPosition, Mutation, MutationOutcome, PropsPatch, StyleMap, WidgetNode,
    WidgetType,
};

pub const WIDGETS_TABLE: &str = "widgets";

pub struct DocumentStore<S> {
    store: S,
    document: Option<Document>,
    selection: Selection,
}

impl<S: RowStore> DocumentStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            document: None,
            selection: Selection::new(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_dirty(&self) -> bool {
        self.document.as_ref().is_some_and(Document::is_dirty)
    }

    /// The active selected node
    pub fn selected_node(&self) -> Option<&WidgetNode> {
        let id = self.selection.active()?;
        self.document.as_ref()?.tree().get(id)
    }

    // -- persistence -----------------------------------------------------------

    /// Load `widgets/{widget_id}` and select its root
    ///
    /// Missing rows and backend failures propagate; an unreadable `elements`
    /// payload does not, it just yields a default document.
    #[instrument(skip(self))]
    pub async fn load(&mut self, widget_id: &str) -> Result<(), EditorError> {
        let row = self.store.read(WIDGETS_TABLE, widget_id).await?;
        let text = |key: &str| row.get(key).and_then(Value::as_str).map(str::to_string);

        let document = Document::from_payload(
            text("id").unwrap_or_else(|| widget_id.to_string()),
            text("project_id").unwrap_or_default(),
            text("name").unwrap_or_default(),
            row.get("elements"),
        );
        tracing::info!(nodes = document.tree().len(), kind = ?document.kind(), "Loaded widget");
        self.open(document);
        Ok(())
    }

    /// Open an in-memory document, selecting its root
    pub fn open(&mut self, document: Document) {
        self.selection.select(Some(document.root_id()));
        self.document = Some(document);
    }

    /// Write the document back as a v2 payload
    ///
    /// On failure the document stays dirty and unchanged.
    #[instrument(skip(self))]
    pub async fn save(&mut self) -> Result<(), EditorError> {
        let document = self.document.as_ref().ok_or(EditorError::NoDocument)?;

        let mut fields = Map::new();
        fields.insert("elements".to_string(), document.to_payload());
        self.store.update(WIDGETS_TABLE, &document.id, fields).await?;

        if let Some(document) = self.document.as_mut() {
            tracing::info!(id = %document.id, version = document.version(), "Saved widget");
            document.mark_saved();
        }
        Ok(())
    }

    /// Close the document and clear the selection
    pub fn reset(&mut self) {
        self.document = None;
        self.selection.clear();
    }

    // -- selection -------------------------------------------------------------

    /// Select a single node (`None` clears); unknown ids are ignored
    pub fn select(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if !self.has_node(id) => false,
            _ => {
                self.selection.select(id);
                true
            }
        }
    }

    /// Add or remove a node from the multi-selection
    pub fn toggle_selection(&mut self, id: &str) -> bool {
        self.has_node(id) && self.selection.toggle(id)
    }

    fn has_node(&self, id: &str) -> bool {
        self.document.as_ref().is_some_and(|d| d.tree().contains(id))
    }

    // -- tree operations -------------------------------------------------------

    fn mutate(&mut self, mutation: Mutation) -> Option<MutationOutcome> {
        let document = self.document.as_mut()?;
        match document.apply(&mutation) {
            Ok(outcome) => {
                self.selection
                    .deselect(outcome.removed_ids().iter().map(String::as_str));
                Some(outcome)
            }
            Err(e) => {
                tracing::debug!(error = %e, ?mutation, "Rejected mutation");
                None
            }
        }
    }

    fn mutate_created(&mut self, mutation: Mutation) -> Option<String> {
        self.mutate(mutation)
            .and_then(|outcome| outcome.created_id().map(str::to_string))
    }

    pub fn add_child(&mut self, parent_id: &str, widget_type: WidgetType) -> Option<String> {
        self.mutate_created(Mutation::InsertChild {
            parent_id: parent_id.to_string(),
            widget_type,
        })
    }

    pub fn add_sibling(&mut self, anchor_id: &str, widget_type: WidgetType) -> Option<String> {
        self.mutate_created(Mutation::InsertSibling {
            anchor_id: anchor_id.to_string(),
            widget_type,
        })
    }

    /// Remove a node; anything selected inside it is deselected
    pub fn delete_node(&mut self, id: &str) -> bool {
        self.mutate(Mutation::Remove { node_id: id.to_string() }).is_some()
    }

    pub fn move_up(&mut self, id: &str) -> bool {
        self.mutate(Mutation::MoveUp { node_id: id.to_string() }).is_some()
    }

    pub fn move_down(&mut self, id: &str) -> bool {
        self.mutate(Mutation::MoveDown { node_id: id.to_string() }).is_some()
    }

    pub fn move_node(&mut self, drag_id: &str, target_id: &str, position: DropPosition) -> bool {
        self.mutate(Mutation::Move {
            drag_id: drag_id.to_string(),
            target_id: target_id.to_string(),
            position,
        })
        .is_some()
    }

    /// Returns the wrapper's id
    pub fn wrap(&mut self, id: &str, wrapper_type: WidgetType) -> Option<String> {
        self.mutate_created(Mutation::Wrap {
            node_id: id.to_string(),
            wrapper_type,
        })
    }

    pub fn wrap_in_column(&mut self, id: &str) -> Option<String> {
        self.wrap(id, WidgetType::Column)
    }

    /// Returns the copy's id
    pub fn duplicate(&mut self, id: &str) -> Option<String> {
        self.mutate_created(Mutation::Duplicate { node_id: id.to_string() })
    }

    pub fn patch_props(&mut self, id: &str, patch: PropsPatch) -> bool {
        self.mutate(Mutation::PatchProps {
            node_id: id.to_string(),
            patch,
        })
        .is_some()
    }

    /// Apply one patch to every selected node; returns how many changed
    pub fn patch_selected(&mut self, patch: &PropsPatch) -> usize {
        let ids = self.selection.ids().to_vec();
        ids.iter()
            .filter(|id| self.patch_props(id, patch.clone()))
            .count()
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        self.mutate(Mutation::Rename {
            node_id: id.to_string(),
            name: name.to_string(),
        })
        .is_some()
    }

    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> bool {
        self.mutate(Mutation::SetHidden {
            node_id: id.to_string(),
            hidden,
        })
        .is_some()
    }

    pub fn set_locked(&mut self, id: &str, locked: bool) -> bool {
        self.mutate(Mutation::SetLocked {
            node_id: id.to_string(),
            locked,
        })
        .is_some()
    }

    pub fn set_actions(&mut self, id: &str, trigger: TriggerType, steps: Vec<ActionStep>) -> bool {
        self.mutate(Mutation::SetActions {
            node_id: id.to_string(),
            trigger,
            steps,
        })
        .is_some()
    }

    // -- document metadata -----------------------------------------------------

    pub fn set_widget_kind(&mut self, kind: WidgetKind) {
        if let Some(document) = self.document.as_mut() {
            document.set_kind(kind);
        }
    }

    pub fn update_list_item_meta(&mut self, patch: ListItemMetaPatch) {
        if let Some(document) = self.document.as_mut() {
            document.update_list_item_meta(patch);
        }
    }

    /// An empty `field` removes the binding
    pub fn set_data_binding(&mut self, node_id: &str, property: BindingProperty, field: &str) {
        if let Some(document) = self.document.as_mut() {
            document.set_data_binding(node_id, property, field);
        }
    }

    pub fn remove_data_binding(&mut self, node_id: &str, property: BindingProperty) {
        if let Some(document) = self.document.as_mut() {
            document.remove_data_binding(node_id, property);
        }
    }

    // -- rendering -------------------------------------------------------------

    pub fn style_of(&self, id: &str) -> Option<StyleMap> {
        self.document.as_ref()?.tree().get(id).map(project_style)
    }
}
