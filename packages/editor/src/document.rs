//! # Document Handle
//!
//! One editable widget document: its tree plus document-level metadata.
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Decode → Edit (mutations, metadata) → Encode → Save
//!   ↓       ↓              ↓                       ↓       ↓
//!  Row   payload    version += 1, dirty          v2    dirty = false
//! ```

use crate::payload::{self, DecodedPayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use widgetforge_tree::{
    create_node, DataSource, Mutation, MutationError, MutationOutcome, WidgetNode, WidgetTree,
    WidgetType,
};

/// How a document is used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WidgetKind {
    #[default]
    #[serde(rename = "standard")]
    Standard,
    /// Template rendered once per row of a list view
    #[serde(rename = "list-item")]
    ListItem,
}

/// Node property a data binding writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingProperty {
    Text,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBinding {
    pub node_id: String,
    pub property: BindingProperty,
    pub field: String,
}

/// Row source and field bindings of a list-item document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItemMeta {
    pub data_source: DataSource,
    pub data_bindings: Vec<DataBinding>,
}

/// Shallow update of [`ListItemMeta`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItemMetaPatch {
    pub data_source: Option<DataSource>,
    pub data_bindings: Option<Vec<DataBinding>>,
}

/// Editable widget document
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub name: String,

    /// Current version number (increments on each change)
    version: u64,
    dirty: bool,

    tree: WidgetTree,
    kind: WidgetKind,
    meta: ListItemMeta,
}

impl Document {
    /// Empty document holding a single `Column`
    pub fn new(id: impl Into<String>, project_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_parts(
            id.into(),
            project_id.into(),
            name.into(),
            DecodedPayload {
                root: create_node(WidgetType::Column),
                kind: WidgetKind::Standard,
                meta: ListItemMeta::default(),
            },
        )
    }

    /// Document from a stored `elements` payload (any shape)
    pub fn from_payload(
        id: impl Into<String>,
        project_id: impl Into<String>,
        name: impl Into<String>,
        elements: Option<&Value>,
    ) -> Self {
        Self::from_parts(id.into(), project_id.into(), name.into(), payload::decode_payload(elements))
    }

    fn from_parts(id: String, project_id: String, name: String, decoded: DecodedPayload) -> Self {
        Self {
            id,
            project_id,
            name,
            version: 0,
            dirty: false,
            tree: WidgetTree::from_root(decoded.root),
            kind: decoded.kind,
            meta: decoded.meta,
        }
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn root_id(&self) -> &str {
        self.tree.root_id()
    }

    /// Nested copy of the whole tree
    pub fn root(&self) -> WidgetNode {
        self.tree.to_root()
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn list_item_meta(&self) -> &ListItemMeta {
        &self.meta
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply a mutation; the document only changes when it succeeds
    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
        let outcome = mutation.apply(&mut self.tree)?;
        self.touch();
        Ok(outcome)
    }

    pub fn set_kind(&mut self, kind: WidgetKind) {
        self.kind = kind;
        self.touch();
    }

    pub fn update_list_item_meta(&mut self, patch: ListItemMetaPatch) {
        if let Some(source) = patch.data_source {
            self.meta.data_source = source;
        }
        if let Some(bindings) = patch.data_bindings {
            self.meta.data_bindings = bindings;
        }
        self.touch();
    }

    /// Bind `property` of a node to a row field; an empty field unbinds it
    pub fn set_data_binding(&mut self, node_id: &str, property: BindingProperty, field: &str) {
        let existing = self.binding_index(node_id, property);
        match (existing, field.is_empty()) {
            (Some(index), true) => {
                self.meta.data_bindings.remove(index);
            }
            (Some(index), false) => self.meta.data_bindings[index].field = field.to_string(),
            (None, false) => self.meta.data_bindings.push(DataBinding {
                node_id: node_id.to_string(),
                property,
                field: field.to_string(),
            }),
            (None, true) => {}
        }
        self.touch();
    }

    pub fn remove_data_binding(&mut self, node_id: &str, property: BindingProperty) {
        if let Some(index) = self.binding_index(node_id, property) {
            self.meta.data_bindings.remove(index);
        }
        self.touch();
    }

    pub fn binding(&self, node_id: &str, property: BindingProperty) -> Option<&DataBinding> {
        self.binding_index(node_id, property)
            .map(|index| &self.meta.data_bindings[index])
    }

    /// Persisted form (always v2)
    pub fn to_payload(&self) -> Value {
        payload::encode_payload(self)
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn binding_index(&self, node_id: &str, property: BindingProperty) -> Option<usize> {
        self.meta
            .data_bindings
            .iter()
            .position(|b| b.node_id == node_id && b.property == property)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.dirty = true;
    }
}
