//! Stored `elements` payload.
//!
//! Two shapes exist in the wild:
//!
//! - legacy: `[root, ...]`, only the first element is used
//! - v2: `{ "v": 2, "root": ..., "widgetKind": ..., "listItemMeta": ... }`
//!
//! Anything else (missing, `null`, `{}`, garbage, or a root whose `type` is
//! unreadable) yields a fresh `Column`. Inside a readable root, unreadable
//! props and children are dropped one by one so the rest of the tree
//! survives the next save. Decoding never fails; saving always writes v2.

use crate::document::{Document, ListItemMeta, WidgetKind};
use serde_json::{json, Value};
use widgetforge_tree::{create_node, salvage, salvage_node, WidgetNode, WidgetType};

pub const PAYLOAD_VERSION: u64 = 2;

/// Result of reading a stored payload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub root: WidgetNode,
    pub kind: WidgetKind,
    pub meta: ListItemMeta,
}

impl Default for DecodedPayload {
    fn default() -> Self {
        Self {
            root: create_node(WidgetType::Column),
            kind: WidgetKind::Standard,
            meta: ListItemMeta::default(),
        }
    }
}

fn root(value: Option<&Value>) -> Option<WidgetNode> {
    let root = salvage_node(value.filter(|v| !v.is_null())?);
    if root.is_none() {
        tracing::warn!("Ignoring unreadable root in payload");
    }
    root
}

fn field<T: serde::de::DeserializeOwned>(value: Option<&Value>, what: &str) -> Option<T> {
    let value = value.filter(|v| !v.is_null())?;
    let mut dropped = Vec::new();
    let decoded = salvage(value, what, &mut dropped);
    if !dropped.is_empty() {
        tracing::warn!(?dropped, "Ignoring unreadable parts of {what} in payload");
    }
    decoded
}

pub fn decode_payload(elements: Option<&Value>) -> DecodedPayload {
    let fallback = DecodedPayload::default();

    match elements {
        Some(Value::Array(items)) => DecodedPayload {
            root: root(items.first()).unwrap_or(fallback.root),
            ..fallback
        },
        Some(Value::Object(map)) if map.get("v").and_then(Value::as_u64) == Some(PAYLOAD_VERSION) => {
            DecodedPayload {
                root: root(map.get("root")).unwrap_or(fallback.root),
                kind: field(map.get("widgetKind"), "widgetKind").unwrap_or(fallback.kind),
                meta: field(map.get("listItemMeta"), "listItemMeta").unwrap_or(fallback.meta),
            }
        }
        _ => fallback,
    }
}

pub fn encode_payload(document: &Document) -> Value {
    json!({
        "v": PAYLOAD_VERSION,
        "root": document.root(),
        "widgetKind": document.kind(),
        "listItemMeta": document.list_item_meta(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BindingProperty;

    fn text_root() -> Value {
        json!({ "id": "t1", "type": "Text", "name": "Title", "props": { "text": "Hi" } })
    }

    #[test]
    fn test_legacy_array() {
        let decoded = decode_payload(Some(&json!([text_root(), { "id": "ignored", "type": "Row" }])));
        assert_eq!(decoded.root.id, "t1");
        assert_eq!(decoded.root.props.text.as_deref(), Some("Hi"));
        assert_eq!(decoded.kind, WidgetKind::Standard);
        assert!(decoded.meta.data_bindings.is_empty());
    }

    #[test]
    fn test_v2_object() {
        let decoded = decode_payload(Some(&json!({
            "v": 2,
            "root": text_root(),
            "widgetKind": "list-item",
            "listItemMeta": {
                "dataSource": { "type": "view", "source": "active_orders" },
                "dataBindings": [{ "nodeId": "t1", "property": "text", "field": "title" }]
            }
        })));

        assert_eq!(decoded.root.id, "t1");
        assert_eq!(decoded.kind, WidgetKind::ListItem);
        assert_eq!(decoded.meta.data_source.source, "active_orders");
        assert_eq!(decoded.meta.data_bindings[0].property, BindingProperty::Text);
    }

    #[test]
    fn test_v2_missing_fields_fall_back() {
        let decoded = decode_payload(Some(&json!({ "v": 2, "widgetKind": "sideways" })));
        assert_eq!(decoded.root.widget_type, WidgetType::Column);
        assert_eq!(decoded.kind, WidgetKind::Standard);
    }

    #[test]
    fn test_garbage_yields_default_column() {
        for garbage in [json!(null), json!({}), json!("elements"), json!(42), json!({ "v": 3 }), json!([])] {
            let decoded = decode_payload(Some(&garbage));
            assert_eq!(decoded.root.widget_type, WidgetType::Column, "{garbage}");
            assert!(decoded.root.children.is_empty());
            assert_eq!(decoded.kind, WidgetKind::Standard);
        }
        assert_eq!(decode_payload(None).root.widget_type, WidgetType::Column);
    }

    #[test]
    fn test_undecodable_root_falls_back() {
        let decoded = decode_payload(Some(&json!([{ "type": "Hologram" }])));
        assert_eq!(decoded.root.widget_type, WidgetType::Column);
    }

    #[test]
    fn test_one_bad_prop_keeps_the_rest_of_the_tree() {
        let decoded = decode_payload(Some(&json!({
            "v": 2,
            "root": {
                "id": "root-1",
                "type": "Column",
                "children": [
                    { "id": "t1", "type": "Text", "props": { "text": "keep me" } },
                    { "id": "t2", "type": "Text", "props": { "text": "me too", "typography": { "fontWeight": "450" } } }
                ]
            },
            "listItemMeta": {
                "dataBindings": [
                    { "nodeId": "t1", "property": "text", "field": "title" },
                    { "nodeId": "t2", "property": "colour", "field": "hue" }
                ]
            }
        })));

        assert_eq!(decoded.root.id, "root-1");
        assert_eq!(decoded.root.children.len(), 2);
        assert_eq!(decoded.root.children[0].props.text.as_deref(), Some("keep me"));
        assert_eq!(decoded.root.children[1].props.text.as_deref(), Some("me too"));
        assert_eq!(decoded.meta.data_bindings.len(), 1);
    }

    #[test]
    fn test_encode_is_v2() {
        let mut doc = Document::from_payload("w1", "p1", "Card", Some(&json!([text_root()])));
        doc.set_kind(WidgetKind::ListItem);

        let encoded = encode_payload(&doc);
        assert_eq!(encoded["v"], json!(2));
        assert_eq!(encoded["root"]["id"], json!("t1"));
        assert_eq!(encoded["widgetKind"], json!("list-item"));
        assert_eq!(encoded["listItemMeta"]["dataSource"]["type"], json!("table"));

        let reloaded = decode_payload(Some(&encoded));
        assert_eq!(reloaded.root, doc.root());
        assert_eq!(reloaded.kind, WidgetKind::ListItem);
    }
}
