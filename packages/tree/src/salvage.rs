//! Best-effort decoding of stored widget trees.
//!
//! A stored tree outlives the code that wrote it, so one unreadable prop must
//! not cost the whole document. [`salvage_node`] keeps every part of a node
//! that still decodes. Props that fail are dropped key by key (descending into
//! nested objects and arrays), and a child is skipped only when its `type`
//! itself is unreadable. Everything dropped is logged at `warn`.

use crate::node::{NodeActions, WidgetNode, WidgetNodeProps, WidgetType};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Decode a stored node, keeping whatever is readable.
///
/// `None` only when `value` is not an object or has no known `type`. A
/// missing id comes back empty; [`crate::WidgetTree::from_root`] issues a
/// fresh one.
pub fn salvage_node(value: &Value) -> Option<WidgetNode> {
    if let Ok(node) = serde_json::from_value::<WidgetNode>(value.clone()) {
        return Some(node);
    }

    let Some(object) = value.as_object() else {
        tracing::warn!("Skipping stored node that is not an object");
        return None;
    };
    let Some(widget_type) = object.get("type").and_then(Value::as_str).and_then(WidgetType::parse) else {
        tracing::warn!(node_type = ?object.get("type"), "Skipping stored node of unknown type");
        return None;
    };

    let id = object.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let mut dropped = Vec::new();

    let props = match object.get("props") {
        Some(props) => salvage::<WidgetNodeProps>(props, "props", &mut dropped),
        None => None,
    };
    let actions = match object.get("actions") {
        Some(actions) => salvage::<NodeActions>(actions, "actions", &mut dropped),
        None => None,
    };
    let children = match object.get("children") {
        Some(Value::Array(children)) => children.iter().filter_map(salvage_node).collect(),
        Some(_) => {
            dropped.push("children".to_string());
            Vec::new()
        }
        None => Vec::new(),
    };

    if !dropped.is_empty() {
        tracing::warn!(node = %id, ?dropped, "Dropped unreadable fields from stored node");
    }

    Some(WidgetNode {
        name: object
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(widget_type.as_str())
            .to_string(),
        id,
        widget_type,
        props: props.unwrap_or_default(),
        children,
        hidden: object.get("hidden").and_then(Value::as_bool),
        locked: object.get("locked").and_then(Value::as_bool),
        actions: actions.unwrap_or_default(),
    })
}

/// Decode `value` as `T`, dropping the object keys and array items that stop
/// it from decoding. Dropped paths are appended to `dropped`.
pub fn salvage<T: DeserializeOwned>(value: &Value, label: &str, dropped: &mut Vec<String>) -> Option<T> {
    if let Ok(decoded) = serde_json::from_value(value.clone()) {
        return Some(decoded);
    }

    let Value::Object(fields) = value else {
        dropped.push(label.to_string());
        return None;
    };
    let mut kept = Value::Object(Map::new());
    if !decodes::<T>(&kept) {
        dropped.push(label.to_string());
        return None;
    }

    let mut path = Vec::new();
    for (key, field) in fields {
        admit::<T>(&mut kept, &mut path, key, field, label, dropped);
    }
    serde_json::from_value(kept).ok()
}

fn decodes<T: DeserializeOwned>(candidate: &Value) -> bool {
    serde_json::from_value::<T>(candidate.clone()).is_ok()
}

/// Object at `path` inside `root`, which `admit` only ever builds from objects
fn object_at<'v>(root: &'v mut Value, path: &[String]) -> Option<&'v mut Map<String, Value>> {
    path.iter()
        .try_fold(root, |cursor, key| cursor.as_object_mut()?.get_mut(key))?
        .as_object_mut()
}

/// Try `key: value` under `path`; on failure retry its parts, or drop it
fn admit<T: DeserializeOwned>(
    root: &mut Value,
    path: &mut Vec<String>,
    key: &str,
    value: &Value,
    label: &str,
    dropped: &mut Vec<String>,
) {
    if place::<T>(root, path, key, value.clone()) {
        return;
    }

    match value {
        Value::Object(fields) if place::<T>(root, path, key, Value::Object(Map::new())) => {
            path.push(key.to_string());
            for (inner_key, inner) in fields {
                admit::<T>(root, path, inner_key, inner, label, dropped);
            }
            path.pop();
        }
        Value::Array(items) if place::<T>(root, path, key, Value::Array(Vec::new())) => {
            for (i, item) in items.iter().enumerate() {
                if !push_item::<T>(root, path, key, item.clone()) {
                    dropped.push(format!("{}[{}]", join(label, path, key), i));
                }
            }
        }
        _ => dropped.push(join(label, path, key)),
    }
}

/// Insert `key: value` under `path`, keeping it only if `root` still decodes
fn place<T: DeserializeOwned>(root: &mut Value, path: &[String], key: &str, value: Value) -> bool {
    let Some(parent) = object_at(root, path) else {
        return false;
    };
    let previous = parent.insert(key.to_string(), value);
    if decodes::<T>(root) {
        return true;
    }
    if let Some(parent) = object_at(root, path) {
        match previous {
            Some(previous) => parent.insert(key.to_string(), previous),
            None => parent.remove(key),
        };
    }
    false
}

/// Append `item` to the array at `path.key`, keeping it only if `root` still decodes
fn push_item<T: DeserializeOwned>(root: &mut Value, path: &[String], key: &str, item: Value) -> bool {
    let Some(Value::Array(items)) = object_at(root, path).and_then(|parent| parent.get_mut(key)) else {
        return false;
    };
    items.push(item);
    if decodes::<T>(root) {
        return true;
    }
    if let Some(Value::Array(items)) = object_at(root, path).and_then(|parent| parent.get_mut(key)) {
        items.pop();
    }
    false
}

fn join(label: &str, path: &[String], key: &str) -> String {
    let mut joined = label.to_string();
    for segment in path.iter().map(String::as_str).chain([key]) {
        joined.push('.');
        joined.push_str(segment);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FontWeight;
    use serde_json::json;

    #[test]
    fn test_readable_node_decodes_as_is() {
        let value = json!({ "id": "t1", "type": "Text", "name": "Title", "props": { "text": "Hi" } });
        let node = salvage_node(&value).unwrap();
        assert_eq!(node, serde_json::from_value::<WidgetNode>(value).unwrap());
    }

    #[test]
    fn test_bad_nested_prop_keeps_its_siblings() {
        let node = salvage_node(&json!({
            "id": "t1",
            "type": "Text",
            "props": {
                "text": "keep me",
                "opacity": 40,
                "typography": { "fontSize": 20, "fontWeight": "450" },
                "padding": "wide"
            }
        }))
        .unwrap();

        assert_eq!(node.id, "t1");
        assert_eq!(node.name, "Text");
        assert_eq!(node.props.text.as_deref(), Some("keep me"));
        assert_eq!(node.props.opacity, 40.0);
        let typography = node.props.typography.unwrap();
        assert_eq!(typography.font_size, 20.0);
        assert_eq!(typography.font_weight, FontWeight::default());
        assert!(node.props.padding.is_zero());
    }

    #[test]
    fn test_null_string_inside_list_config() {
        let node = salvage_node(&json!({
            "id": "l1",
            "type": "ListView",
            "props": {
                "listViewConfig": {
                    "dataSource": { "type": "view", "source": "orders" },
                    "listItemWidgetId": null
                }
            }
        }))
        .unwrap();

        let config = node.props.list_view_config.unwrap();
        assert_eq!(config.data_source.source, "orders");
        assert_eq!(config.list_item_widget_id, "");
    }

    #[test]
    fn test_only_unreadable_children_are_skipped() {
        let node = salvage_node(&json!({
            "id": "root",
            "type": "Column",
            "children": [
                { "id": "a", "type": "Text", "props": { "text": "A" } },
                { "id": "b", "type": "Hologram" },
                { "id": "c", "type": "Text", "props": { "typography": { "fontWeight": "450" } } },
                42
            ]
        }))
        .unwrap();

        let ids: Vec<_> = node.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_bad_array_items_are_dropped_one_by_one() {
        let mut dropped = Vec::new();
        let props: WidgetNodeProps = salvage(
            &json!({
                "richSpans": [
                    { "id": "s1", "text": "ok" },
                    { "text": "no id" },
                    { "id": "s3", "text": "ok too" }
                ]
            }),
            "props",
            &mut dropped,
        )
        .unwrap();

        let spans = props.rich_spans.unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].id, "s3");
        assert_eq!(dropped, vec!["props.richSpans[1]".to_string()]);
    }

    #[test]
    fn test_unknown_type_or_shape_is_none() {
        assert!(salvage_node(&json!({ "id": "x", "type": "Hologram" })).is_none());
        assert!(salvage_node(&json!("Text")).is_none());
        assert!(salvage_node(&json!({ "id": "x" })).is_none());
    }
}
