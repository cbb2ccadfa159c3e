//! Partial prop updates.
//!
//! Scalars and lists in a [`PropsPatch`] replace the current value.
//! Nested groups (padding, border, flex, ...) merge key by key, and are
//! created from their defaults when the node doesn't have them yet.

use crate::node::{
    BorderRadius, BorderStyle, DataSource, DataSourceKind, FlexDirection, FlexProps, FontWeight,
    ListFilter, ListSort, ListViewConfig, RichTextSpan, SizeValue, SlotOrientation, Spacing,
    TextAlign, Typography, WidgetNodeProps, WidgetRefSlot,
};
use serde::{Deserialize, Serialize};

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn set_some<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingPatch {
    pub top: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
}

impl SpacingPatch {
    /// Negative sides clamp to zero
    pub fn merge_into(&self, spacing: &mut Spacing) {
        let sides = [
            (&mut spacing.top, self.top),
            (&mut spacing.right, self.right),
            (&mut spacing.bottom, self.bottom),
            (&mut spacing.left, self.left),
        ];
        for (side, value) in sides {
            if let Some(value) = value {
                *side = value.max(0.0);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderPatch {
    pub width: Option<f64>,
    pub style: Option<BorderStyle>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BorderRadiusPatch {
    pub top_left: Option<f64>,
    pub top_right: Option<f64>,
    pub bottom_right: Option<f64>,
    pub bottom_left: Option<f64>,
    pub linked: Option<bool>,
}

impl BorderRadiusPatch {
    pub fn merge_into(&self, radius: &mut BorderRadius) {
        set(&mut radius.top_left, &self.top_left);
        set(&mut radius.top_right, &self.top_right);
        set(&mut radius.bottom_right, &self.bottom_right);
        set(&mut radius.bottom_left, &self.bottom_left);
        set(&mut radius.linked, &self.linked);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlexPatch {
    pub direction: Option<FlexDirection>,
    pub align_items: Option<String>,
    pub justify_content: Option<String>,
    pub gap: Option<f64>,
    pub wrap: Option<bool>,
}

impl FlexPatch {
    pub fn merge_into(&self, flex: &mut FlexProps) {
        set(&mut flex.direction, &self.direction);
        set(&mut flex.align_items, &self.align_items);
        set(&mut flex.justify_content, &self.justify_content);
        set(&mut flex.gap, &self.gap);
        set(&mut flex.wrap, &self.wrap);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypographyPatch {
    pub font_size: Option<f64>,
    pub font_weight: Option<FontWeight>,
    pub line_height: Option<f64>,
    pub letter_spacing: Option<f64>,
    pub text_align: Option<TextAlign>,
    /// An empty string clears the family
    pub font_family: Option<String>,
}

impl TypographyPatch {
    pub fn merge_into(&self, typography: &mut Typography) {
        set(&mut typography.font_size, &self.font_size);
        set(&mut typography.font_weight, &self.font_weight);
        set(&mut typography.line_height, &self.line_height);
        set(&mut typography.letter_spacing, &self.letter_spacing);
        set(&mut typography.text_align, &self.text_align);
        if let Some(family) = &self.font_family {
            typography.font_family = (!family.is_empty()).then(|| family.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSourcePatch {
    #[serde(rename = "type")]
    pub kind: Option<DataSourceKind>,
    pub source: Option<String>,
}

impl DataSourcePatch {
    pub fn merge_into(&self, source: &mut DataSource) {
        set(&mut source.kind, &self.kind);
        set(&mut source.source, &self.source);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaginationPatch {
    pub enabled: Option<bool>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListViewConfigPatch {
    pub data_source: Option<DataSourcePatch>,
    pub filters: Option<Vec<ListFilter>>,
    pub sorting: Option<Vec<ListSort>>,
    pub pagination: Option<PaginationPatch>,
    pub list_item_widget_id: Option<String>,
}

impl ListViewConfigPatch {
    pub fn merge_into(&self, config: &mut ListViewConfig) {
        if let Some(source) = &self.data_source {
            source.merge_into(&mut config.data_source);
        }
        set(&mut config.filters, &self.filters);
        set(&mut config.sorting, &self.sorting);
        if let Some(pagination) = &self.pagination {
            set(&mut config.pagination.enabled, &pagination.enabled);
            set(&mut config.pagination.page_size, &pagination.page_size);
        }
        set(&mut config.list_item_widget_id, &self.list_item_widget_id);
    }
}

/// Partial update of [`WidgetNodeProps`]; every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropsPatch {
    pub width: Option<SizeValue>,
    pub height: Option<SizeValue>,
    pub min_width: Option<SizeValue>,
    pub min_height: Option<SizeValue>,
    pub max_width: Option<SizeValue>,
    pub max_height: Option<SizeValue>,

    pub padding: Option<SpacingPatch>,
    pub margin: Option<SpacingPatch>,

    pub background_color: Option<String>,
    pub color: Option<String>,
    pub opacity: Option<f64>,

    pub border: Option<BorderPatch>,
    pub border_radius: Option<BorderRadiusPatch>,
    pub flex: Option<FlexPatch>,
    pub typography: Option<TypographyPatch>,

    pub text: Option<String>,
    pub placeholder: Option<String>,
    pub rich_spans: Option<Vec<RichTextSpan>>,
    pub list_view_config: Option<ListViewConfigPatch>,

    pub icon_package: Option<String>,
    pub icon_name: Option<String>,
    pub icon_size: Option<f64>,
    pub icon_color: Option<String>,
    pub icon_stroke_width: Option<f64>,

    pub widget_refs: Option<Vec<WidgetRefSlot>>,
    pub slot_orientation: Option<SlotOrientation>,
}

impl PropsPatch {
    pub fn is_empty(&self) -> bool {
        *self == PropsPatch::default()
    }

    /// Merge into `props`
    pub fn apply(&self, props: &mut WidgetNodeProps) {
        set(&mut props.width, &self.width);
        set(&mut props.height, &self.height);
        set_some(&mut props.min_width, &self.min_width);
        set_some(&mut props.min_height, &self.min_height);
        set_some(&mut props.max_width, &self.max_width);
        set_some(&mut props.max_height, &self.max_height);

        if let Some(padding) = &self.padding {
            padding.merge_into(&mut props.padding);
        }
        if let Some(margin) = &self.margin {
            margin.merge_into(&mut props.margin);
        }

        set(&mut props.background_color, &self.background_color);
        set(&mut props.color, &self.color);
        if let Some(opacity) = self.opacity.filter(|o| o.is_finite()) {
            props.opacity = opacity.clamp(0.0, 100.0);
        }

        if let Some(border) = &self.border {
            set(&mut props.border.width, &border.width.map(|w| w.max(0.0)));
            set(&mut props.border.style, &border.style);
            set(&mut props.border.color, &border.color);
        }
        if let Some(radius) = &self.border_radius {
            radius.merge_into(&mut props.border_radius);
        }
        if let Some(flex) = &self.flex {
            flex.merge_into(props.flex.get_or_insert_with(FlexProps::default));
        }
        if let Some(typography) = &self.typography {
            typography.merge_into(props.typography.get_or_insert_with(Typography::default));
        }

        set_some(&mut props.text, &self.text);
        set_some(&mut props.placeholder, &self.placeholder);
        set_some(&mut props.rich_spans, &self.rich_spans);
        if let Some(config) = &self.list_view_config {
            config.merge_into(props.list_view_config.get_or_insert_with(ListViewConfig::default));
        }

        set_some(&mut props.icon_package, &self.icon_package);
        set_some(&mut props.icon_name, &self.icon_name);
        set_some(&mut props.icon_size, &self.icon_size);
        set_some(&mut props.icon_color, &self.icon_color);
        set_some(&mut props.icon_stroke_width, &self.icon_stroke_width);

        set_some(&mut props.widget_refs, &self.widget_refs);
        set_some(&mut props.slot_orientation, &self.slot_orientation);
    }
}
