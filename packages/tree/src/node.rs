//! # Widget Nodes
//!
//! The nested form of a widget document. This is what gets persisted and
//! what editors exchange; the [`crate::WidgetTree`] arena is built from it
//! for editing.
//!
//! Every prop struct is camelCase on the wire and tolerates missing fields,
//! so older payloads keep loading as the model grows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use widgetforge_actions::{ActionStep, TriggerType};

/// Kind of widget a node renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetType {
    Column,
    Row,
    Container,
    Text,
    Button,
    TextField,
    RichText,
    ListView,
    Icon,
    WidgetRef,
}

impl WidgetType {
    pub const ALL: [WidgetType; 10] = [
        WidgetType::Column,
        WidgetType::Row,
        WidgetType::Container,
        WidgetType::Text,
        WidgetType::Button,
        WidgetType::TextField,
        WidgetType::RichText,
        WidgetType::ListView,
        WidgetType::Icon,
        WidgetType::WidgetRef,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::Column => "Column",
            WidgetType::Row => "Row",
            WidgetType::Container => "Container",
            WidgetType::Text => "Text",
            WidgetType::Button => "Button",
            WidgetType::TextField => "TextField",
            WidgetType::RichText => "RichText",
            WidgetType::ListView => "ListView",
            WidgetType::Icon => "Icon",
            WidgetType::WidgetRef => "WidgetRef",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Only containers may hold children
    pub fn is_container(&self) -> bool {
        matches!(self, WidgetType::Column | WidgetType::Row | WidgetType::Container)
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    #[serde(rename = "px")]
    Px,
    #[serde(rename = "%")]
    Percent,
    #[default]
    #[serde(rename = "auto")]
    Auto,
}

impl SizeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeUnit::Px => "px",
            SizeUnit::Percent => "%",
            SizeUnit::Auto => "auto",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeValue {
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub unit: SizeUnit,
}

impl SizeValue {
    pub const fn auto() -> Self {
        Self { value: 0.0, unit: SizeUnit::Auto }
    }

    pub const fn px(value: f64) -> Self {
        Self { value, unit: SizeUnit::Px }
    }

    pub const fn percent(value: f64) -> Self {
        Self { value, unit: SizeUnit::Percent }
    }
}

/// Four-sided spacing in px
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Spacing {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self { top, right, bottom, left }
    }

    pub const fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    None,
}

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderStyle::Solid => "solid",
            BorderStyle::Dashed => "dashed",
            BorderStyle::Dotted => "dotted",
            BorderStyle::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Border {
    pub width: f64,
    pub style: BorderStyle,
    pub color: String,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            width: 0.0,
            style: BorderStyle::Solid,
            color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BorderRadius {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
    pub linked: bool,
}

impl BorderRadius {
    pub const fn linked(value: f64) -> Self {
        Self {
            top_left: value,
            top_right: value,
            bottom_right: value,
            bottom_left: value,
            linked: true,
        }
    }
}

impl Default for BorderRadius {
    fn default() -> Self {
        Self::linked(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlexDirection {
    Row,
    #[default]
    Column,
}

impl FlexDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlexDirection::Row => "row",
            FlexDirection::Column => "column",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlexProps {
    pub direction: FlexDirection,
    pub align_items: String,
    pub justify_content: String,
    pub gap: f64,
    pub wrap: bool,
}

impl FlexProps {
    pub fn new(direction: FlexDirection) -> Self {
        Self {
            direction,
            align_items: "flex-start".to_string(),
            justify_content: "flex-start".to_string(),
            gap: 0.0,
            wrap: false,
        }
    }
}

impl Default for FlexProps {
    fn default() -> Self {
        Self::new(FlexDirection::Column)
    }
}

/// CSS font weight, persisted as its numeric string ("300" .. "800")
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FontWeight {
    #[serde(rename = "300")]
    Light,
    #[default]
    #[serde(rename = "400")]
    Regular,
    #[serde(rename = "500")]
    Medium,
    #[serde(rename = "600")]
    SemiBold,
    #[serde(rename = "700")]
    Bold,
    #[serde(rename = "800")]
    ExtraBold,
}

impl FontWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontWeight::Light => "300",
            FontWeight::Regular => "400",
            FontWeight::Medium => "500",
            FontWeight::SemiBold => "600",
            FontWeight::Bold => "700",
            FontWeight::ExtraBold => "800",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Typography {
    pub font_size: f64,
    pub font_weight: FontWeight,
    pub line_height: f64,
    pub letter_spacing: f64,
    pub text_align: TextAlign,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            font_weight: FontWeight::Regular,
            line_height: 1.5,
            letter_spacing: 0.0,
            text_align: TextAlign::Left,
            font_family: None,
        }
    }
}

/// A styled run of text inside a `RichText` widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RichTextSpan {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Table,
    View,
}

/// Table or view a list reads its rows from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type", default)]
    pub kind: DataSourceKind,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListFilter {
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSort {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    pub enabled: bool,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            enabled: false,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListViewConfig {
    pub data_source: DataSource,
    pub filters: Vec<ListFilter>,
    pub sorting: Vec<ListSort>,
    pub pagination: Pagination,
    pub list_item_widget_id: String,
}

/// Another saved widget embedded by reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRefSlot {
    pub widget_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotOrientation {
    Horizontal,
    #[default]
    Vertical,
}

/// Visual properties of a node
///
/// `Default` gives the base defaults every widget type starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetNodeProps {
    pub width: SizeValue,
    pub height: SizeValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_width: Option<SizeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<SizeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<SizeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<SizeValue>,

    pub padding: Spacing,
    pub margin: Spacing,

    pub background_color: String,
    pub color: String,
    /// 0..=100
    pub opacity: f64,

    pub border: Border,
    pub border_radius: BorderRadius,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex: Option<FlexProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typography: Option<Typography>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_spans: Option<Vec<RichTextSpan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_view_config: Option<ListViewConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_stroke_width: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub widget_refs: Option<Vec<WidgetRefSlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_orientation: Option<SlotOrientation>,
}

impl Default for WidgetNodeProps {
    fn default() -> Self {
        Self {
            width: SizeValue::auto(),
            height: SizeValue::auto(),
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
            padding: Spacing::default(),
            margin: Spacing::default(),
            background_color: "transparent".to_string(),
            color: "#111827".to_string(),
            opacity: 100.0,
            border: Border::default(),
            border_radius: BorderRadius::default(),
            flex: None,
            typography: None,
            text: None,
            placeholder: None,
            rich_spans: None,
            list_view_config: None,
            icon_package: None,
            icon_name: None,
            icon_size: None,
            icon_color: None,
            icon_stroke_width: None,
            widget_refs: None,
            slot_orientation: None,
        }
    }
}

/// Workflow steps attached to a node, keyed by the event that starts them
pub type NodeActions = BTreeMap<TriggerType, Vec<ActionStep>>;

/// One widget and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetNode {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub props: WidgetNodeProps,
    #[serde(default)]
    pub children: Vec<WidgetNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actions: NodeActions,
}

impl WidgetNode {
    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or(false)
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    /// Number of nodes in this subtree, self included
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(WidgetNode::subtree_len).sum::<usize>()
    }

    /// Visit this node and its descendants in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a WidgetNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_container_types() {
        let containers: Vec<_> = WidgetType::ALL.into_iter().filter(WidgetType::is_container).collect();
        assert_eq!(
            containers,
            vec![WidgetType::Column, WidgetType::Row, WidgetType::Container]
        );
        assert_eq!(WidgetType::parse("TextField"), Some(WidgetType::TextField));
        assert_eq!(WidgetType::parse("Canvas"), None);
    }

    #[test]
    fn test_wire_names() {
        let mut props = WidgetNodeProps::default();
        props.width = SizeValue::percent(100.0);
        props.typography = Some(Typography {
            font_weight: FontWeight::Bold,
            ..Typography::default()
        });
        let node = WidgetNode {
            id: "n1".to_string(),
            widget_type: WidgetType::Text,
            name: "Text".to_string(),
            props,
            children: vec![],
            hidden: None,
            locked: None,
            actions: NodeActions::new(),
        };

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], json!("Text"));
        assert_eq!(value["props"]["width"], json!({ "value": 100.0, "unit": "%" }));
        assert_eq!(value["props"]["backgroundColor"], json!("transparent"));
        assert_eq!(value["props"]["borderRadius"]["topLeft"], json!(0.0));
        assert_eq!(value["props"]["typography"]["fontWeight"], json!("700"));
        assert!(value.get("hidden").is_none());
        assert!(value.get("actions").is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let node: WidgetNode = serde_json::from_value(json!({
            "id": "a",
            "type": "Row",
            "props": { "padding": { "top": 4 } }
        }))
        .unwrap();

        assert_eq!(node.name, "");
        assert_eq!(node.props.padding, Spacing::new(4.0, 0.0, 0.0, 0.0));
        assert_eq!(node.props.opacity, 100.0);
        assert_eq!(node.props.width, SizeValue::auto());
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_actions_keyed_by_trigger() {
        let node: WidgetNode = serde_json::from_value(json!({
            "id": "btn",
            "type": "Button",
            "actions": {
                "onClick": [{ "id": "s1", "type": "navigation.back", "config": {} }]
            }
        }))
        .unwrap();

        assert_eq!(node.actions[&TriggerType::OnClick].len(), 1);
        assert_eq!(node.actions[&TriggerType::OnClick][0].id, "s1");
    }
}
