//! # Widget Tree Arena
//!
//! Editing form of a document. Nodes live in one id-keyed table; each slot
//! records its parent and ordered child ids, so lookups never walk the tree
//! and there is no separate index to keep in sync.
//!
//! Nodes stored in the arena always have an empty `children` vec. Child
//! order is owned by the slot and restored by [`WidgetTree::to_root`].

use crate::node::{WidgetNode, WidgetType};
use std::collections::HashMap;
use widgetforge_common::next_id;

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    node: WidgetNode,
    parent: Option<String>,
    children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetTree {
    root: String,
    slots: HashMap<String, Slot>,
}

impl WidgetTree {
    /// Build the arena from a nested root in one traversal
    ///
    /// Ids that are empty or already taken are re-issued and logged.
    pub fn from_root(root: WidgetNode) -> Self {
        let mut tree = Self {
            root: String::new(),
            slots: HashMap::new(),
        };
        tree.root = tree.adopt(root, None);
        tree
    }

    /// Rebuild the nested form
    pub fn to_root(&self) -> WidgetNode {
        match self.slots.get(&self.root) {
            Some(slot) => self.build(slot),
            None => unreachable!("root slot is never removed"),
        }
    }

    /// Nested copy of the subtree under `id`
    pub fn subtree(&self, id: &str) -> Option<WidgetNode> {
        self.slots.get(id).map(|slot| self.build(slot))
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    pub fn get(&self, id: &str) -> Option<&WidgetNode> {
        self.slots.get(id).map(|slot| &slot.node)
    }

    /// Mutable access to a node's own fields
    ///
    /// `id` and `children` belong to the tree; restructure through
    /// [`crate::Mutation`] instead.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut WidgetNode> {
        self.slots.get_mut(id).map(|slot| &mut slot.node)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Parent id; `None` for the root and for unknown ids
    pub fn find_parent(&self, id: &str) -> Option<&str> {
        self.slots.get(id)?.parent.as_deref()
    }

    /// Ordered child ids; empty for leaves and unknown ids
    pub fn children(&self, id: &str) -> &[String] {
        self.slots.get(id).map(|slot| slot.children.as_slice()).unwrap_or(&[])
    }

    /// Position among siblings
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let parent = self.find_parent(id)?;
        self.children(parent).iter().position(|c| c == id)
    }

    /// True if `id` sits strictly below `ancestor`
    pub fn is_descendant(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.find_parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.find_parent(parent);
        }
        false
    }

    /// Ids strictly below `id`, pre-order
    pub fn descendants(&self, id: &str) -> Vec<&str> {
        let mut out = Vec::new();
        for child in self.children(id) {
            self.collect(child, &mut out);
        }
        out
    }

    /// `id` followed by its descendants
    pub fn subtree_ids(&self, id: &str) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some((key, _)) = self.slots.get_key_value(id) {
            self.collect(key, &mut out);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; a tree has at least its root
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every id in document order
    pub fn ids(&self) -> Vec<&str> {
        self.subtree_ids(&self.root)
    }

    // -- structural edits, used by mutations ---------------------------------

    /// Insert a nested subtree under `parent_id` at `index` (clamped)
    pub(crate) fn insert(&mut self, parent_id: &str, index: usize, node: WidgetNode) -> Option<String> {
        if !self.contains(parent_id) {
            return None;
        }
        let id = self.adopt(node, Some(parent_id));
        let slot = self.slots.get_mut(parent_id)?;
        let index = index.min(slot.children.len());
        slot.children.insert(index, id.clone());
        Some(id)
    }

    /// Unlink `id` from its parent, keeping its subtree in the table
    ///
    /// Returns the old parent and position.
    pub(crate) fn detach(&mut self, id: &str) -> Option<(String, usize)> {
        let parent = self.find_parent(id)?.to_string();
        let siblings = &mut self.slots.get_mut(&parent)?.children;
        let index = siblings.iter().position(|c| c == id)?;
        siblings.remove(index);
        if let Some(slot) = self.slots.get_mut(id) {
            slot.parent = None;
        }
        Some((parent, index))
    }

    /// Link a detached `id` under `parent_id` at `index` (clamped)
    pub(crate) fn attach(&mut self, id: &str, parent_id: &str, index: usize) -> bool {
        if !self.contains(id) {
            return false;
        }
        let Some(parent) = self.slots.get_mut(parent_id) else {
            return false;
        };
        let index = index.min(parent.children.len());
        parent.children.insert(index, id.to_string());
        if let Some(slot) = self.slots.get_mut(id) {
            slot.parent = Some(parent_id.to_string());
        }
        true
    }

    /// Detach `id` and drop its whole subtree; returns the removed ids
    pub(crate) fn remove(&mut self, id: &str) -> Vec<String> {
        if self.detach(id).is_none() {
            return Vec::new();
        }
        let removed: Vec<String> = self.subtree_ids(id).into_iter().map(str::to_string).collect();
        for removed_id in &removed {
            self.slots.remove(removed_id);
        }
        removed
    }

    /// Swap two positions in a parent's child list
    pub(crate) fn swap_children(&mut self, parent_id: &str, a: usize, b: usize) -> bool {
        match self.slots.get_mut(parent_id) {
            Some(slot) if a < slot.children.len() && b < slot.children.len() => {
                slot.children.swap(a, b);
                true
            }
            _ => false,
        }
    }

    fn adopt(&mut self, mut node: WidgetNode, parent: Option<&str>) -> String {
        if node.id.is_empty() || self.slots.contains_key(&node.id) {
            let fresh = next_id();
            tracing::warn!(duplicate = %node.id, reissued = %fresh, "Re-issued duplicate widget id");
            node.id = fresh;
        }

        let id = node.id.clone();
        let children = std::mem::take(&mut node.children);
        self.slots.insert(
            id.clone(),
            Slot {
                node,
                parent: parent.map(str::to_string),
                children: Vec::new(),
            },
        );

        let child_ids: Vec<String> = children
            .into_iter()
            .map(|child| self.adopt(child, Some(&id)))
            .collect();
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.children = child_ids;
        }
        id
    }

    fn build(&self, slot: &Slot) -> WidgetNode {
        let mut node = slot.node.clone();
        node.children = slot
            .children
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|child| self.build(child))
            .collect();
        node
    }

    fn collect<'a>(&'a self, id: &'a str, out: &mut Vec<&'a str>) {
        out.push(id);
        for child in self.children(id) {
            self.collect(child, out);
        }
    }
}

// -- helpers over the nested form ---------------------------------------------

/// Map every id in a nested tree to its node
pub fn build_index(root: &WidgetNode) -> HashMap<&str, &WidgetNode> {
    let mut index = HashMap::with_capacity(root.subtree_len());
    root.walk(&mut |node| {
        index.insert(node.id.as_str(), node);
    });
    index
}

pub fn find_node<'a>(root: &'a WidgetNode, id: &str) -> Option<&'a WidgetNode> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_node(child, id))
}

/// Parent of `id` in a nested tree; `None` for the root and unknown ids
pub fn find_parent<'a>(root: &'a WidgetNode, id: &str) -> Option<&'a WidgetNode> {
    if root.children.iter().any(|child| child.id == id) {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_parent(child, id))
}

/// Cut `id` out of a nested tree; the root itself cannot be removed
pub fn remove_node(root: &mut WidgetNode, id: &str) -> Option<WidgetNode> {
    if let Some(pos) = root.children.iter().position(|child| child.id == id) {
        return Some(root.children.remove(pos));
    }
    root.children.iter_mut().find_map(|child| remove_node(child, id))
}

pub fn can_have_children(widget_type: WidgetType) -> bool {
    widget_type.is_container()
}
