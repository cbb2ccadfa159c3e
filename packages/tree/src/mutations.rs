//! # Tree Mutations
//!
//! Structural and property edits on a [`WidgetTree`].
//!
//! Every mutation is validated against the current tree before anything is
//! touched, so a rejected mutation leaves the tree exactly as it was.
//!
//! ## Structural rules
//!
//! - The root is never removed, wrapped, moved, duplicated or given siblings
//! - Only container types (`Column`, `Row`, `Container`) hold children
//! - A node can never end up inside its own subtree
//!
//! ## Move
//! - The dragged node is detached first and the target index is resolved
//!   afterwards, so moving within one parent lands where the user dropped it
//! - If placement fails after the detach, the node goes back to its original
//!   position and the move reports an error

use crate::arena::WidgetTree;
use crate::factory::create_node;
use crate::node::{WidgetNode, WidgetType};
use crate::patch::PropsPatch;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use widgetforge_actions::{ActionStep, TriggerType};
use widgetforge_common::next_id;

/// Where a dragged node lands relative to the drop target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

/// Edits an editor can make to a widget tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Append a new node of `widget_type` as the last child of a container
    InsertChild {
        parent_id: String,
        widget_type: WidgetType,
    },

    /// Insert a new node right after `anchor_id`
    InsertSibling {
        anchor_id: String,
        widget_type: WidgetType,
    },

    /// Remove a node and its subtree
    Remove { node_id: String },

    /// Swap with the previous sibling
    MoveUp { node_id: String },

    /// Swap with the next sibling
    MoveDown { node_id: String },

    /// Drag-and-drop reparenting
    Move {
        drag_id: String,
        target_id: String,
        position: DropPosition,
    },

    /// Replace a node with a new container holding it
    Wrap {
        node_id: String,
        wrapper_type: WidgetType,
    },

    /// Deep copy with fresh ids, placed right after the original
    Duplicate { node_id: String },

    PatchProps { node_id: String, patch: PropsPatch },

    Rename { node_id: String, name: String },

    SetHidden { node_id: String, hidden: bool },

    SetLocked { node_id: String, locked: bool },

    /// Replace the steps bound to `trigger`; empty `steps` unbinds it
    SetActions {
        node_id: String,
        trigger: TriggerType,
        steps: Vec<ActionStep>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Cannot {0} the root node")]
    RootNode(&'static str),

    #[error("{0} cannot have children")]
    NotAContainer(WidgetType),

    #[error("Node is already at the edge of its parent")]
    AtBoundary,

    #[error("Cannot drop a node onto itself")]
    SelfTarget,

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

/// What a successful mutation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Updated,
    /// Id of the inserted node (the wrapper, for `Wrap`)
    Created(String),
    /// Ids of every node that left the tree
    Removed(Vec<String>),
}

impl MutationOutcome {
    pub fn created_id(&self) -> Option<&str> {
        match self {
            MutationOutcome::Created(id) => Some(id),
            _ => None,
        }
    }

    pub fn removed_ids(&self) -> &[String] {
        match self {
            MutationOutcome::Removed(ids) => ids,
            _ => &[],
        }
    }
}

impl Mutation {
    /// Apply mutation to the tree with validation
    pub fn apply(&self, tree: &mut WidgetTree) -> Result<MutationOutcome, MutationError> {
        self.validate(tree)?;

        match self {
            Mutation::InsertChild { parent_id, widget_type } => {
                Self::apply_insert_child(tree, parent_id, *widget_type)
            }

            Mutation::InsertSibling { anchor_id, widget_type } => {
                Self::apply_insert_sibling(tree, anchor_id, *widget_type)
            }

            Mutation::Remove { node_id } => Ok(MutationOutcome::Removed(tree.remove(node_id))),

            Mutation::MoveUp { node_id } => Self::apply_shift(tree, node_id, -1),

            Mutation::MoveDown { node_id } => Self::apply_shift(tree, node_id, 1),

            Mutation::Move { drag_id, target_id, position } => {
                Self::apply_move(tree, drag_id, target_id, *position)
            }

            Mutation::Wrap { node_id, wrapper_type } => Self::apply_wrap(tree, node_id, *wrapper_type),

            Mutation::Duplicate { node_id } => Self::apply_duplicate(tree, node_id),

            Mutation::PatchProps { node_id, patch } => Self::with_node(tree, node_id, |node| {
                patch.apply(&mut node.props);
            }),

            Mutation::Rename { node_id, name } => Self::with_node(tree, node_id, |node| {
                node.name = name.clone();
            }),

            Mutation::SetHidden { node_id, hidden } => Self::with_node(tree, node_id, |node| {
                node.hidden = Some(*hidden);
            }),

            Mutation::SetLocked { node_id, locked } => Self::with_node(tree, node_id, |node| {
                node.locked = Some(*locked);
            }),

            Mutation::SetActions { node_id, trigger, steps } => Self::with_node(tree, node_id, |node| {
                if steps.is_empty() {
                    node.actions.remove(trigger);
                } else {
                    node.actions.insert(*trigger, steps.clone());
                }
            }),
        }
    }

    /// Validate without applying
    pub fn validate(&self, tree: &WidgetTree) -> Result<(), MutationError> {
        match self {
            Mutation::InsertChild { parent_id, .. } => {
                let parent = tree
                    .get(parent_id)
                    .ok_or_else(|| MutationError::ParentNotFound(parent_id.clone()))?;
                if !parent.widget_type.is_container() {
                    return Err(MutationError::NotAContainer(parent.widget_type));
                }
                Ok(())
            }

            Mutation::InsertSibling { anchor_id, .. } => {
                Self::require_non_root(tree, anchor_id, "add a sibling to")
            }

            Mutation::Remove { node_id } => Self::require_non_root(tree, node_id, "remove"),

            Mutation::MoveUp { node_id } => {
                Self::require_non_root(tree, node_id, "reorder")?;
                match tree.index_of(node_id) {
                    Some(index) if index > 0 => Ok(()),
                    _ => Err(MutationError::AtBoundary),
                }
            }

            Mutation::MoveDown { node_id } => {
                Self::require_non_root(tree, node_id, "reorder")?;
                let siblings = tree.find_parent(node_id).map(|p| tree.children(p).len()).unwrap_or(0);
                match tree.index_of(node_id) {
                    Some(index) if index + 1 < siblings => Ok(()),
                    _ => Err(MutationError::AtBoundary),
                }
            }

            Mutation::Move { drag_id, target_id, position } => {
                if drag_id == target_id {
                    return Err(MutationError::SelfTarget);
                }
                Self::require_non_root(tree, drag_id, "move")?;
                let target = tree
                    .get(target_id)
                    .ok_or_else(|| MutationError::NodeNotFound(target_id.clone()))?;

                if tree.is_descendant(drag_id, target_id) {
                    return Err(MutationError::CycleDetected);
                }

                match position {
                    DropPosition::Inside if !target.widget_type.is_container() => {
                        Err(MutationError::NotAContainer(target.widget_type))
                    }
                    DropPosition::Before | DropPosition::After if target_id == tree.root_id() => {
                        Err(MutationError::RootNode("place a node beside"))
                    }
                    _ => Ok(()),
                }
            }

            Mutation::Wrap { node_id, wrapper_type } => {
                Self::require_non_root(tree, node_id, "wrap")?;
                if !wrapper_type.is_container() {
                    return Err(MutationError::NotAContainer(*wrapper_type));
                }
                Ok(())
            }

            Mutation::Duplicate { node_id } => Self::require_non_root(tree, node_id, "duplicate"),

            Mutation::PatchProps { node_id, .. }
            | Mutation::Rename { node_id, .. }
            | Mutation::SetHidden { node_id, .. }
            | Mutation::SetLocked { node_id, .. }
            | Mutation::SetActions { node_id, .. } => {
                if tree.contains(node_id) {
                    Ok(())
                } else {
                    Err(MutationError::NodeNotFound(node_id.clone()))
                }
            }
        }
    }

    fn require_non_root(tree: &WidgetTree, node_id: &str, action: &'static str) -> Result<(), MutationError> {
        if !tree.contains(node_id) {
            return Err(MutationError::NodeNotFound(node_id.to_string()));
        }
        if node_id == tree.root_id() {
            return Err(MutationError::RootNode(action));
        }
        Ok(())
    }

    fn with_node(
        tree: &mut WidgetTree,
        node_id: &str,
        edit: impl FnOnce(&mut WidgetNode),
    ) -> Result<MutationOutcome, MutationError> {
        let node = tree
            .get_mut(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;
        edit(node);
        Ok(MutationOutcome::Updated)
    }

    fn apply_insert_child(
        tree: &mut WidgetTree,
        parent_id: &str,
        widget_type: WidgetType,
    ) -> Result<MutationOutcome, MutationError> {
        let end = tree.children(parent_id).len();
        tree.insert(parent_id, end, create_node(widget_type))
            .map(MutationOutcome::Created)
            .ok_or_else(|| MutationError::ParentNotFound(parent_id.to_string()))
    }

    fn apply_insert_sibling(
        tree: &mut WidgetTree,
        anchor_id: &str,
        widget_type: WidgetType,
    ) -> Result<MutationOutcome, MutationError> {
        let (parent, index) = Self::locate(tree, anchor_id)?;
        tree.insert(&parent, index + 1, create_node(widget_type))
            .map(MutationOutcome::Created)
            .ok_or(MutationError::ParentNotFound(parent))
    }

    fn apply_shift(tree: &mut WidgetTree, node_id: &str, offset: isize) -> Result<MutationOutcome, MutationError> {
        let (parent, index) = Self::locate(tree, node_id)?;
        let other = index
            .checked_add_signed(offset)
            .ok_or(MutationError::AtBoundary)?;
        if tree.swap_children(&parent, index, other) {
            Ok(MutationOutcome::Updated)
        } else {
            Err(MutationError::AtBoundary)
        }
    }

    fn apply_move(
        tree: &mut WidgetTree,
        drag_id: &str,
        target_id: &str,
        position: DropPosition,
    ) -> Result<MutationOutcome, MutationError> {
        let (old_parent, old_index) = tree
            .detach(drag_id)
            .ok_or_else(|| MutationError::NodeNotFound(drag_id.to_string()))?;

        // Target index is resolved after the detach
        let placed = match position {
            DropPosition::Inside => {
                let end = tree.children(target_id).len();
                tree.attach(drag_id, target_id, end)
            }
            DropPosition::Before | DropPosition::After => {
                match Self::locate(tree, target_id) {
                    Ok((parent, index)) => {
                        let index = if position == DropPosition::After { index + 1 } else { index };
                        tree.attach(drag_id, &parent, index)
                    }
                    Err(_) => false,
                }
            }
        };

        if placed {
            Ok(MutationOutcome::Updated)
        } else {
            tree.attach(drag_id, &old_parent, old_index);
            Err(MutationError::InvalidStructure(format!(
                "could not place {drag_id} relative to {target_id}"
            )))
        }
    }

    fn apply_wrap(
        tree: &mut WidgetTree,
        node_id: &str,
        wrapper_type: WidgetType,
    ) -> Result<MutationOutcome, MutationError> {
        let (parent, index) = tree
            .detach(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;

        let Some(wrapper_id) = tree.insert(&parent, index, create_node(wrapper_type)) else {
            tree.attach(node_id, &parent, index);
            return Err(MutationError::ParentNotFound(parent));
        };
        tree.attach(node_id, &wrapper_id, 0);
        Ok(MutationOutcome::Created(wrapper_id))
    }

    fn apply_duplicate(tree: &mut WidgetTree, node_id: &str) -> Result<MutationOutcome, MutationError> {
        let mut copy = tree
            .subtree(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;
        reissue_ids(&mut copy);

        let (parent, index) = Self::locate(tree, node_id)?;
        tree.insert(&parent, index + 1, copy)
            .map(MutationOutcome::Created)
            .ok_or(MutationError::ParentNotFound(parent))
    }

    /// Parent id and sibling index of a non-root node
    fn locate(tree: &WidgetTree, node_id: &str) -> Result<(String, usize), MutationError> {
        let parent = tree
            .find_parent(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;
        let index = tree
            .index_of(node_id)
            .ok_or_else(|| MutationError::NodeNotFound(node_id.to_string()))?;
        Ok((parent.to_string(), index))
    }
}

/// Fresh ids for a node, its rich spans and its whole subtree
pub fn reissue_ids(node: &mut WidgetNode) {
    node.id = next_id();
    if let Some(spans) = &mut node.props.rich_spans {
        for span in spans {
            span.id = next_id();
        }
    }
    for child in &mut node.children {
        reissue_ids(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Spacing;
    use crate::patch::SpacingPatch;

    fn tree() -> WidgetTree {
        let mut root = create_node(WidgetType::Column);
        root.id = "root".to_string();
        let mut text = create_node(WidgetType::Text);
        text.id = "text".to_string();
        let mut button = create_node(WidgetType::Button);
        button.id = "button".to_string();
        root.children = vec![text, button];
        WidgetTree::from_root(root)
    }

    #[test]
    fn test_mutation_serialization() {
        let mutation = Mutation::Move {
            drag_id: "a".to_string(),
            target_id: "b".to_string(),
            position: DropPosition::Inside,
        };

        let json = serde_json::to_string(&mutation).unwrap();
        assert!(json.contains("\"inside\""));
        let deserialized: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(mutation, deserialized);
    }

    #[test]
    fn test_insert_child_requires_container() {
        let mut tree = tree();
        let outcome = Mutation::InsertChild {
            parent_id: "root".to_string(),
            widget_type: WidgetType::Icon,
        }
        .apply(&mut tree)
        .unwrap();

        let id = outcome.created_id().unwrap().to_string();
        assert_eq!(tree.children("root").last(), Some(&id));

        let err = Mutation::InsertChild {
            parent_id: "text".to_string(),
            widget_type: WidgetType::Icon,
        }
        .apply(&mut tree)
        .unwrap_err();
        assert_eq!(err, MutationError::NotAContainer(WidgetType::Text));
    }

    #[test]
    fn test_insert_sibling_lands_after_anchor() {
        let mut tree = tree();
        let outcome = Mutation::InsertSibling {
            anchor_id: "text".to_string(),
            widget_type: WidgetType::Row,
        }
        .apply(&mut tree)
        .unwrap();

        assert_eq!(tree.index_of(outcome.created_id().unwrap()), Some(1));
        assert_eq!(tree.index_of("button"), Some(2));
    }

    #[test]
    fn test_move_up_and_down_stop_at_edges() {
        let mut tree = tree();
        let up = Mutation::MoveUp { node_id: "text".to_string() };
        assert_eq!(up.apply(&mut tree), Err(MutationError::AtBoundary));

        Mutation::MoveDown { node_id: "text".to_string() }.apply(&mut tree).unwrap();
        assert_eq!(tree.children("root"), ["button".to_string(), "text".to_string()]);

        let down = Mutation::MoveDown { node_id: "text".to_string() };
        assert_eq!(down.apply(&mut tree), Err(MutationError::AtBoundary));
    }

    #[test]
    fn test_wrap_replaces_node_in_place() {
        let mut tree = tree();
        let outcome = Mutation::Wrap {
            node_id: "button".to_string(),
            wrapper_type: WidgetType::Row,
        }
        .apply(&mut tree)
        .unwrap();

        let wrapper = outcome.created_id().unwrap();
        assert_eq!(tree.index_of(wrapper), Some(1));
        assert_eq!(tree.children(wrapper), ["button".to_string()]);
        assert_eq!(tree.get(wrapper).unwrap().widget_type, WidgetType::Row);
    }

    #[test]
    fn test_wrap_rejects_leaf_wrapper_and_root() {
        let mut tree = tree();
        let before = tree.clone();
        let leaf = Mutation::Wrap {
            node_id: "text".to_string(),
            wrapper_type: WidgetType::Button,
        };
        assert_eq!(leaf.apply(&mut tree), Err(MutationError::NotAContainer(WidgetType::Button)));

        let root = Mutation::Wrap {
            node_id: "root".to_string(),
            wrapper_type: WidgetType::Column,
        };
        assert_eq!(root.apply(&mut tree), Err(MutationError::RootNode("wrap")));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_move_before_within_same_parent() {
        let mut tree = tree();
        Mutation::Move {
            drag_id: "button".to_string(),
            target_id: "text".to_string(),
            position: DropPosition::Before,
        }
        .apply(&mut tree)
        .unwrap();
        assert_eq!(tree.children("root"), ["button".to_string(), "text".to_string()]);
    }

    #[test]
    fn test_move_beside_root_rejected() {
        let mut tree = tree();
        let err = Mutation::Move {
            drag_id: "text".to_string(),
            target_id: "root".to_string(),
            position: DropPosition::After,
        }
        .apply(&mut tree)
        .unwrap_err();
        assert_eq!(err, MutationError::RootNode("place a node beside"));
    }

    #[test]
    fn test_patch_rename_flags_and_actions() {
        let mut tree = tree();
        Mutation::PatchProps {
            node_id: "text".to_string(),
            patch: PropsPatch {
                padding: Some(SpacingPatch {
                    left: Some(12.0),
                    ..SpacingPatch::default()
                }),
                ..PropsPatch::default()
            },
        }
        .apply(&mut tree)
        .unwrap();
        Mutation::Rename { node_id: "text".to_string(), name: "Title".to_string() }
            .apply(&mut tree)
            .unwrap();
        Mutation::SetHidden { node_id: "text".to_string(), hidden: true }
            .apply(&mut tree)
            .unwrap();

        let text = tree.get("text").unwrap();
        assert_eq!(text.props.padding, Spacing::new(0.0, 0.0, 0.0, 12.0));
        assert_eq!(text.name, "Title");
        assert!(text.is_hidden());
        assert!(!text.is_locked());

        let step: ActionStep = serde_json::from_value(serde_json::json!({
            "id": "s1", "type": "navigation.back", "config": {}
        }))
        .unwrap();
        let bind = Mutation::SetActions {
            node_id: "button".to_string(),
            trigger: TriggerType::OnClick,
            steps: vec![step],
        };
        bind.apply(&mut tree).unwrap();
        assert_eq!(tree.get("button").unwrap().actions.len(), 1);

        let unbind = Mutation::SetActions {
            node_id: "button".to_string(),
            trigger: TriggerType::OnClick,
            steps: vec![],
        };
        unbind.apply(&mut tree).unwrap();
        assert!(tree.get("button").unwrap().actions.is_empty());
    }

    #[test]
    fn test_unknown_node() {
        let mut tree = tree();
        let err = Mutation::Rename { node_id: "ghost".to_string(), name: "x".to_string() }
            .apply(&mut tree)
            .unwrap_err();
        assert_eq!(err, MutationError::NodeNotFound("ghost".to_string()));
    }
}
