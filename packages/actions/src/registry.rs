//! Catalog of built-in actions, as presented to workflow editors.
//!
//! The catalog is descriptive only. Dispatch never consults it; it drives
//! configuration forms and authoring-time validation.

use crate::step::{Action, ActionCategory, ActionStep, ActionType};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Select,
    Boolean,
    Code,
    ElementId,
    PageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub label: &'static str,
    pub value: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "<[SelectOption]>::is_empty")]
    pub options: &'static [SelectOption],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl ConfigField {
    const fn new(key: &'static str, label: &'static str, field_type: FieldType) -> Self {
        Self {
            key,
            label,
            field_type,
            options: &[],
            required: false,
            placeholder: None,
            description: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn placeholder(mut self, placeholder: &'static str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    const fn options(mut self, options: &'static [SelectOption]) -> Self {
        self.options = options;
        self
    }

    const fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub category: ActionCategory,
    pub label: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub config_fields: &'static [ConfigField],
}

const ELEMENT_ID: ConfigField = ConfigField::new("elementId", "Element ID", FieldType::ElementId)
    .required()
    .placeholder("my-element");

const UPDATE_METHODS: &[SelectOption] = &[
    SelectOption { label: "PATCH", value: "PATCH" },
    SelectOption { label: "PUT", value: "PUT" },
];

const TOAST_TYPES: &[SelectOption] = &[
    SelectOption { label: "Default", value: "default" },
    SelectOption { label: "Success", value: "success" },
    SelectOption { label: "Error", value: "error" },
    SelectOption { label: "Warning", value: "warning" },
];

pub static BUILT_IN_ACTIONS: &[ActionDefinition] = &[
    // Visibility
    ActionDefinition {
        action_type: ActionType::VisibilityShow,
        category: ActionCategory::Visibility,
        label: "Show element",
        description: "Makes an element visible on the page",
        icon: "Eye",
        config_fields: &[ELEMENT_ID],
    },
    ActionDefinition {
        action_type: ActionType::VisibilityHide,
        category: ActionCategory::Visibility,
        label: "Hide element",
        description: "Hides an element from the page",
        icon: "EyeOff",
        config_fields: &[ELEMENT_ID],
    },
    ActionDefinition {
        action_type: ActionType::VisibilityToggle,
        category: ActionCategory::Visibility,
        label: "Toggle visibility",
        description: "Toggles whether an element is visible",
        icon: "ToggleLeft",
        config_fields: &[ELEMENT_ID],
    },
    // Navigation
    ActionDefinition {
        action_type: ActionType::Navigate,
        category: ActionCategory::Navigation,
        label: "Go to page",
        description: "Navigates to another page or URL",
        icon: "Navigation",
        config_fields: &[
            ConfigField::new("url", "URL", FieldType::Text).placeholder("/about or https://example.com"),
            ConfigField::new("pageId", "Project page", FieldType::PageId),
        ],
    },
    ActionDefinition {
        action_type: ActionType::NavigateBack,
        category: ActionCategory::Navigation,
        label: "Back",
        description: "Returns to the previous page",
        icon: "ArrowLeft",
        config_fields: &[],
    },
    // Data
    ActionDefinition {
        action_type: ActionType::DataFetch,
        category: ActionCategory::Data,
        label: "Fetch data",
        description: "Sends a GET request and stores the result",
        icon: "Download",
        config_fields: &[
            ConfigField::new("endpoint", "Endpoint URL", FieldType::Text)
                .required()
                .placeholder("https://api.example.com/items"),
            ConfigField::new("storeKey", "Store under key", FieldType::Text).placeholder("myData"),
        ],
    },
    ActionDefinition {
        action_type: ActionType::DataCreate,
        category: ActionCategory::Data,
        label: "Create record",
        description: "Sends a POST request to create a record",
        icon: "Plus",
        config_fields: &[
            ConfigField::new("endpoint", "Endpoint URL", FieldType::Text).required(),
            ConfigField::new("body", "Request body (JSON)", FieldType::Code).placeholder(r#"{"name": "..."}"#),
        ],
    },
    ActionDefinition {
        action_type: ActionType::DataUpdate,
        category: ActionCategory::Data,
        label: "Update record",
        description: "Sends a PATCH or PUT request to update a record",
        icon: "Pencil",
        config_fields: &[
            ConfigField::new("endpoint", "Endpoint URL", FieldType::Text).required(),
            ConfigField::new("method", "Method", FieldType::Select).options(UPDATE_METHODS),
            ConfigField::new("body", "Request body (JSON)", FieldType::Code).placeholder(r#"{"name": "..."}"#),
        ],
    },
    ActionDefinition {
        action_type: ActionType::DataDelete,
        category: ActionCategory::Data,
        label: "Delete record",
        description: "Sends a DELETE request",
        icon: "Trash2",
        config_fields: &[ConfigField::new("endpoint", "Endpoint URL", FieldType::Text).required()],
    },
    // State
    ActionDefinition {
        action_type: ActionType::StateSet,
        category: ActionCategory::State,
        label: "Set variable",
        description: "Stores a value in the state store",
        icon: "Variable",
        config_fields: &[
            ConfigField::new("key", "Key", FieldType::Text).required().placeholder("myVar"),
            ConfigField::new("value", "Value", FieldType::Text)
                .required()
                .placeholder(r#""hello" or 42"#),
        ],
    },
    ActionDefinition {
        action_type: ActionType::StateClear,
        category: ActionCategory::State,
        label: "Clear variable",
        description: "Removes a value from the state store",
        icon: "Eraser",
        config_fields: &[ConfigField::new("key", "Key (empty = everything)", FieldType::Text).placeholder("myVar")],
    },
    // UI
    ActionDefinition {
        action_type: ActionType::ShowToast,
        category: ActionCategory::Ui,
        label: "Show notification",
        description: "Displays a toast notification",
        icon: "Bell",
        config_fields: &[
            ConfigField::new("message", "Message", FieldType::Text).required().placeholder("Done!"),
            ConfigField::new("toastType", "Type", FieldType::Select).options(TOAST_TYPES),
        ],
    },
    ActionDefinition {
        action_type: ActionType::ShowModal,
        category: ActionCategory::Ui,
        label: "Show modal",
        description: "Opens a modal dialog",
        icon: "Square",
        config_fields: &[
            ConfigField::new("modalId", "Modal ID", FieldType::ElementId).required(),
            ConfigField::new("title", "Title", FieldType::Text),
        ],
    },
    ActionDefinition {
        action_type: ActionType::ScrollTo,
        category: ActionCategory::Ui,
        label: "Scroll to element",
        description: "Scrolls the page to the given element",
        icon: "ChevronsDown",
        config_fields: &[ConfigField::new("elementId", "Element ID", FieldType::ElementId).required()],
    },
    // Custom
    ActionDefinition {
        action_type: ActionType::CustomCode,
        category: ActionCategory::Custom,
        label: "Custom code",
        description: "Runs a user-provided script",
        icon: "Code2",
        config_fields: &[ConfigField::new("code", "Code", FieldType::Code)
            .required()
            .placeholder("// context, state, visibility, events are available\nconsole.log(\"hello\")")
            .description("Available: context, state, visibility, events, console")],
    },
];

pub fn catalog() -> &'static [ActionDefinition] {
    BUILT_IN_ACTIONS
}

pub fn definition(action_type: ActionType) -> Option<&'static ActionDefinition> {
    BUILT_IN_ACTIONS.iter().find(|d| d.action_type == action_type)
}

/// Look up a definition by its wire type name
pub fn definition_by_name(type_name: &str) -> Option<&'static ActionDefinition> {
    ActionType::parse(type_name).and_then(definition)
}

/// Catalog grouped by category, each group in catalog order
pub fn by_category() -> BTreeMap<ActionCategory, Vec<&'static ActionDefinition>> {
    let mut groups: BTreeMap<ActionCategory, Vec<&'static ActionDefinition>> = BTreeMap::new();
    for def in BUILT_IN_ACTIONS {
        groups.entry(def.category).or_default().push(def);
    }
    groups
}

/// Authoring problem found in a step's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigIssue {
    pub step_id: String,
    pub key: String,
    pub message: String,
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Report missing required fields across a step and its branches.
///
/// Only used while authoring; the interpreter runs whatever it is given.
pub fn validate_step(step: &ActionStep) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    collect_issues(step, &mut issues);
    issues
}

fn collect_issues(step: &ActionStep, issues: &mut Vec<ConfigIssue>) {
    let config = step.action.config();
    let issue = |key: &str, message: String| ConfigIssue {
        step_id: step.id.clone(),
        key: key.to_string(),
        message,
    };

    match &step.action {
        Action::Unknown { action_type, .. } => {
            issues.push(issue("type", format!("Unknown action type '{}'", action_type)));
        }
        _ => {
            if let Some(def) = step.action.action_type().and_then(definition) {
                for field in def.config_fields.iter().filter(|f| f.required) {
                    if is_blank(config.get(field.key)) {
                        issues.push(issue(field.key, format!("'{}' is required", field.label)));
                    }
                }
            }
        }
    }

    if step.action.action_type() == Some(ActionType::Navigate)
        && is_blank(config.get("url"))
        && is_blank(config.get("pageId"))
    {
        issues.push(issue("url", "Either a URL or a page is required".to_string()));
    }

    for child in step.on_success.iter().chain(step.on_error.iter()) {
        collect_issues(child, issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{ElementTarget, NavigateConfig};
    use serde_json::json;

    #[test]
    fn test_catalog_covers_every_type() {
        assert_eq!(catalog().len(), ActionType::ALL.len());
        for action_type in ActionType::ALL {
            let def = definition(action_type).unwrap();
            assert_eq!(def.category, action_type.category());
        }
    }

    #[test]
    fn test_by_category_groups() {
        let groups = by_category();
        assert_eq!(groups[&ActionCategory::Visibility].len(), 3);
        assert_eq!(groups[&ActionCategory::Data].len(), 4);
        assert_eq!(groups[&ActionCategory::Custom][0].icon, "Code2");
    }

    #[test]
    fn test_entry_wire_shape() {
        let value = serde_json::to_value(definition(ActionType::DataUpdate).unwrap()).unwrap();
        assert_eq!(value["type"], "data.update");
        assert_eq!(value["category"], "data");
        assert_eq!(value["configFields"][0]["required"], true);
        assert_eq!(value["configFields"][1]["options"][1]["value"], "PUT");
        assert!(value["configFields"][1].get("required").is_none());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let step: ActionStep = serde_json::from_value(json!({
            "id": "s1",
            "type": "ui.showToast",
            "config": {},
            "onError": [{ "id": "s2", "type": "mystery.action" }]
        }))
        .unwrap();

        let issues = validate_step(&step);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].key, "message");
        assert_eq!(issues[1].step_id, "s2");
    }

    #[test]
    fn test_navigate_needs_url_or_page() {
        let step = ActionStep::new(Action::Navigate(NavigateConfig::default())).with_id("nav");
        assert_eq!(validate_step(&step)[0].key, "url");

        let step = ActionStep::new(Action::Navigate(NavigateConfig {
            url: None,
            page_id: Some("about".to_string()),
        }));
        assert!(validate_step(&step).is_empty());

        let step = ActionStep::new(Action::VisibilityShow(ElementTarget {
            element_id: "hero".to_string(),
        }));
        assert!(validate_step(&step).is_empty());
    }
}
