//! # Node Factory
//!
//! Builds new nodes with the defaults the builder palette shows for each
//! widget type. Every call constructs fresh values, so two nodes never share
//! nested props.

use crate::node::{
    Border, BorderRadius, BorderStyle, FlexDirection, FlexProps, FontWeight, ListViewConfig,
    NodeActions, RichTextSpan, SizeValue, SlotOrientation, Spacing, Typography, WidgetNode,
    WidgetNodeProps, WidgetType,
};
use widgetforge_common::next_id;

/// Create a node of `widget_type` with a fresh id and type defaults
pub fn create_node(widget_type: WidgetType) -> WidgetNode {
    WidgetNode {
        id: next_id(),
        widget_type,
        name: widget_type.as_str().to_string(),
        props: default_props(widget_type),
        children: Vec::new(),
        hidden: None,
        locked: None,
        actions: NodeActions::new(),
    }
}

/// A plain rich text span with a fresh id
pub fn new_rich_span() -> RichTextSpan {
    RichTextSpan {
        id: next_id(),
        text: "Span".to_string(),
        ..RichTextSpan::default()
    }
}

/// Default props for a widget type
pub fn default_props(widget_type: WidgetType) -> WidgetNodeProps {
    let base = WidgetNodeProps::default();

    match widget_type {
        WidgetType::Column => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            flex: Some(FlexProps::new(FlexDirection::Column)),
            ..base
        },
        WidgetType::Row => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            flex: Some(FlexProps::new(FlexDirection::Row)),
            ..base
        },
        WidgetType::Container => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            height: SizeValue::px(100.0),
            flex: Some(FlexProps::new(FlexDirection::Column)),
            ..base
        },
        WidgetType::Text => WidgetNodeProps {
            text: Some("Text".to_string()),
            typography: Some(Typography::default()),
            ..base
        },
        WidgetType::Button => WidgetNodeProps {
            background_color: "#3b82f6".to_string(),
            color: "#ffffff".to_string(),
            text: Some("Button".to_string()),
            padding: Spacing::new(8.0, 16.0, 8.0, 16.0),
            border_radius: BorderRadius::linked(6.0),
            typography: Some(Typography::default()),
            ..base
        },
        WidgetType::TextField => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            background_color: "#ffffff".to_string(),
            placeholder: Some("Enter text...".to_string()),
            padding: Spacing::new(8.0, 12.0, 8.0, 12.0),
            border: Border {
                width: 1.0,
                style: BorderStyle::Solid,
                color: "#d1d5db".to_string(),
            },
            border_radius: BorderRadius::linked(6.0),
            typography: Some(Typography::default()),
            ..base
        },
        WidgetType::RichText => WidgetNodeProps {
            typography: Some(Typography::default()),
            rich_spans: Some(vec![
                RichTextSpan {
                    id: next_id(),
                    text: "Rich ".to_string(),
                    color: Some("#111827".to_string()),
                    ..RichTextSpan::default()
                },
                RichTextSpan {
                    id: next_id(),
                    text: "Text".to_string(),
                    color: Some("#3b82f6".to_string()),
                    font_weight: Some(FontWeight::Bold),
                    ..RichTextSpan::default()
                },
            ]),
            ..base
        },
        WidgetType::ListView => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            list_view_config: Some(ListViewConfig::default()),
            ..base
        },
        WidgetType::Icon => WidgetNodeProps {
            icon_package: Some("lucide".to_string()),
            icon_name: Some("Star".to_string()),
            icon_size: Some(24.0),
            icon_stroke_width: Some(2.0),
            ..base
        },
        WidgetType::WidgetRef => WidgetNodeProps {
            width: SizeValue::percent(100.0),
            widget_refs: Some(Vec::new()),
            slot_orientation: Some(SlotOrientation::Vertical),
            ..base
        },
    }
}
