//! # Style Projection
//!
//! Derives the CSS declarations a renderer applies to a node. Pure: the same
//! node always yields the same ordered map.

use crate::node::{BorderStyle, RichTextSpan, SizeUnit, SizeValue, Spacing, WidgetNode};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Ordered CSS property → value map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: Vec<(String, String)>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing an earlier value in place
    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        let property = property.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == property) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((property, value)),
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One `property: value;` declaration per line
    pub fn to_css(&self) -> String {
        self.iter()
            .map(|(p, v)| format!("{p}: {v};\n"))
            .collect()
    }

    /// Declarations for a `style` attribute
    pub fn to_inline(&self) -> String {
        self.iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_inline())
    }
}

impl Serialize for StyleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (property, value) in &self.entries {
            map.serialize_entry(property, value)?;
        }
        map.end()
    }
}

/// Render a number the way a stylesheet expects (`16`, not `16.0`)
fn num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn px(value: f64) -> String {
    format!("{}px", num(value))
}

fn size(value: &SizeValue) -> String {
    match value.unit {
        SizeUnit::Auto => "auto".to_string(),
        unit => format!("{}{}", num(value.value), unit.as_str()),
    }
}

fn sides(spacing: &Spacing) -> String {
    format!(
        "{} {} {} {}",
        px(spacing.top),
        px(spacing.right),
        px(spacing.bottom),
        px(spacing.left)
    )
}

fn font_family(family: &str) -> String {
    format!("\"{family}\", sans-serif")
}

/// CSS for a node's own box
pub fn project_style(node: &WidgetNode) -> StyleMap {
    let p = &node.props;
    let mut s = StyleMap::new();

    s.insert("box-sizing", "border-box");

    s.insert("width", size(&p.width));
    s.insert("height", size(&p.height));
    let bounds = [
        ("min-width", &p.min_width),
        ("min-height", &p.min_height),
        ("max-width", &p.max_width),
        ("max-height", &p.max_height),
    ];
    for (property, value) in bounds {
        if let Some(value) = value {
            s.insert(property, size(value));
        }
    }

    s.insert("padding", sides(&p.padding));
    if !p.margin.is_zero() {
        s.insert("margin", sides(&p.margin));
    }

    if !p.background_color.is_empty() {
        s.insert("background-color", p.background_color.as_str());
    }
    if !p.color.is_empty() {
        s.insert("color", p.color.as_str());
    }
    if p.opacity < 100.0 {
        s.insert("opacity", num(p.opacity / 100.0));
    }

    if p.border.style != BorderStyle::None && p.border.width > 0.0 {
        s.insert("border-width", px(p.border.width));
        s.insert("border-style", p.border.style.as_str());
        s.insert("border-color", p.border.color.as_str());
    }

    let r = &p.border_radius;
    if r.linked {
        s.insert("border-radius", px(r.top_left));
    } else {
        s.insert(
            "border-radius",
            format!(
                "{} {} {} {}",
                px(r.top_left),
                px(r.top_right),
                px(r.bottom_right),
                px(r.bottom_left)
            ),
        );
    }

    if let Some(flex) = p.flex.as_ref().filter(|_| node.widget_type.is_container()) {
        s.insert("display", "flex");
        s.insert("flex-direction", flex.direction.as_str());
        s.insert("align-items", flex.align_items.as_str());
        s.insert("justify-content", flex.justify_content.as_str());
        s.insert("gap", px(flex.gap));
        s.insert("flex-wrap", if flex.wrap { "wrap" } else { "nowrap" });
    }

    if let Some(t) = &p.typography {
        s.insert("font-size", px(t.font_size));
        s.insert("font-weight", t.font_weight.as_str());
        s.insert("line-height", num(t.line_height));
        s.insert("letter-spacing", px(t.letter_spacing));
        s.insert("text-align", t.text_align.as_str());
        if let Some(family) = t.font_family.as_deref().filter(|f| !f.is_empty()) {
            s.insert("font-family", font_family(family));
        }
    }

    s
}

/// CSS for one rich text span; unset fields inherit from the widget
pub fn project_span_style(span: &RichTextSpan) -> StyleMap {
    let mut s = StyleMap::new();
    if let Some(color) = span.color.as_deref().filter(|c| !c.is_empty()) {
        s.insert("color", color);
    }
    if let Some(size) = span.font_size {
        s.insert("font-size", px(size));
    }
    if let Some(weight) = span.font_weight {
        s.insert("font-weight", weight.as_str());
    }
    if let Some(family) = span.font_family.as_deref().filter(|f| !f.is_empty()) {
        s.insert("font-family", font_family(family));
    }
    if span.italic == Some(true) {
        s.insert("font-style", "italic");
    }
    if span.underline == Some(true) {
        s.insert("text-decoration", "underline");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::create_node;
    use crate::node::{BorderRadius, FlexDirection, FlexProps, FontWeight, WidgetType};

    #[test]
    fn test_column_defaults() {
        let style = project_style(&create_node(WidgetType::Column));
        assert_eq!(
            style.iter().collect::<Vec<_>>(),
            vec![
                ("box-sizing", "border-box"),
                ("width", "100%"),
                ("height", "auto"),
                ("padding", "0px 0px 0px 0px"),
                ("background-color", "transparent"),
                ("color", "#111827"),
                ("border-radius", "0px"),
                ("display", "flex"),
                ("flex-direction", "column"),
                ("align-items", "flex-start"),
                ("justify-content", "flex-start"),
                ("gap", "0px"),
                ("flex-wrap", "nowrap"),
            ]
        );
    }

    #[test]
    fn test_text_field_border_and_typography() {
        let style = project_style(&create_node(WidgetType::TextField));
        assert_eq!(style.get("border-width"), Some("1px"));
        assert_eq!(style.get("border-style"), Some("solid"));
        assert_eq!(style.get("border-color"), Some("#d1d5db"));
        assert_eq!(style.get("border-radius"), Some("6px"));
        assert_eq!(style.get("font-size"), Some("14px"));
        assert_eq!(style.get("line-height"), Some("1.5"));
        assert!(!style.contains("display"));
        assert!(!style.contains("font-family"));
    }

    #[test]
    fn test_conditional_properties() {
        let mut node = create_node(WidgetType::Text);
        node.props.opacity = 50.0;
        node.props.margin.bottom = 4.0;
        node.props.border.style = BorderStyle::None;
        node.props.border.width = 2.0;
        node.props.border_radius = BorderRadius {
            top_left: 1.0,
            top_right: 2.0,
            bottom_right: 3.0,
            bottom_left: 4.0,
            linked: false,
        };
        node.props.background_color.clear();
        if let Some(t) = node.props.typography.as_mut() {
            t.font_family = Some("Inter".to_string());
        }

        let style = project_style(&node);
        assert_eq!(style.get("opacity"), Some("0.5"));
        assert_eq!(style.get("margin"), Some("0px 0px 4px 0px"));
        assert!(!style.contains("border-width"));
        assert!(!style.contains("background-color"));
        assert_eq!(style.get("border-radius"), Some("1px 2px 3px 4px"));
        assert_eq!(style.get("font-family"), Some("\"Inter\", sans-serif"));
    }

    #[test]
    fn test_flex_only_on_containers() {
        let mut node = create_node(WidgetType::Button);
        node.props.flex = Some(FlexProps::new(FlexDirection::Row));
        assert!(!project_style(&node).contains("display"));
    }

    #[test]
    fn test_span_style() {
        let span = RichTextSpan {
            id: "s".to_string(),
            text: "bold".to_string(),
            color: Some("#3b82f6".to_string()),
            font_weight: Some(FontWeight::Bold),
            italic: Some(true),
            underline: Some(false),
            ..RichTextSpan::default()
        };
        let style = project_span_style(&span);
        assert_eq!(
            style.to_inline(),
            "color: #3b82f6; font-weight: 700; font-style: italic"
        );
    }

    #[test]
    fn test_rendering() {
        let mut style = StyleMap::new();
        style.insert("width", "auto");
        style.insert("gap", "4px");
        style.insert("width", "10px");
        assert_eq!(style.to_css(), "width: 10px;\ngap: 4px;\n");
        assert_eq!(serde_json::to_string(&style).unwrap(), r#"{"width":"10px","gap":"4px"}"#);
    }
}
