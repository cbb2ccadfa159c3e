//! # Action Steps
//!
//! One step is one action invocation with optional conditions and
//! success/error branches. Each built-in action type carries its own typed
//! configuration; the wire form stays the flat `{type, config}` record that
//! editors author and storage persists.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// UI event that starts a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerType {
    OnClick,
    OnSubmit,
    OnInit,
    OnChange,
    OnHover,
    OnPageLoad,
    OnWidgetMount,
}

/// Catalog grouping used by editors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Visibility,
    Navigation,
    Data,
    State,
    Ui,
    Custom,
}

/// Closed set of built-in action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "visibility.show")]
    VisibilityShow,
    #[serde(rename = "visibility.hide")]
    VisibilityHide,
    #[serde(rename = "visibility.toggle")]
    VisibilityToggle,
    #[serde(rename = "navigation.navigate")]
    Navigate,
    #[serde(rename = "navigation.back")]
    NavigateBack,
    #[serde(rename = "data.fetch")]
    DataFetch,
    #[serde(rename = "data.create")]
    DataCreate,
    #[serde(rename = "data.update")]
    DataUpdate,
    #[serde(rename = "data.delete")]
    DataDelete,
    #[serde(rename = "state.set")]
    StateSet,
    #[serde(rename = "state.clear")]
    StateClear,
    #[serde(rename = "ui.showToast")]
    ShowToast,
    #[serde(rename = "ui.showModal")]
    ShowModal,
    #[serde(rename = "ui.scrollTo")]
    ScrollTo,
    #[serde(rename = "custom.code")]
    CustomCode,
}

impl ActionType {
    pub const ALL: [ActionType; 15] = [
        ActionType::VisibilityShow,
        ActionType::VisibilityHide,
        ActionType::VisibilityToggle,
        ActionType::Navigate,
        ActionType::NavigateBack,
        ActionType::DataFetch,
        ActionType::DataCreate,
        ActionType::DataUpdate,
        ActionType::DataDelete,
        ActionType::StateSet,
        ActionType::StateClear,
        ActionType::ShowToast,
        ActionType::ShowModal,
        ActionType::ScrollTo,
        ActionType::CustomCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::VisibilityShow => "visibility.show",
            ActionType::VisibilityHide => "visibility.hide",
            ActionType::VisibilityToggle => "visibility.toggle",
            ActionType::Navigate => "navigation.navigate",
            ActionType::NavigateBack => "navigation.back",
            ActionType::DataFetch => "data.fetch",
            ActionType::DataCreate => "data.create",
            ActionType::DataUpdate => "data.update",
            ActionType::DataDelete => "data.delete",
            ActionType::StateSet => "state.set",
            ActionType::StateClear => "state.clear",
            ActionType::ShowToast => "ui.showToast",
            ActionType::ShowModal => "ui.showModal",
            ActionType::ScrollTo => "ui.scrollTo",
            ActionType::CustomCode => "custom.code",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            ActionType::VisibilityShow | ActionType::VisibilityHide | ActionType::VisibilityToggle => {
                ActionCategory::Visibility
            }
            ActionType::Navigate | ActionType::NavigateBack => ActionCategory::Navigation,
            ActionType::DataFetch
            | ActionType::DataCreate
            | ActionType::DataUpdate
            | ActionType::DataDelete => ActionCategory::Data,
            ActionType::StateSet | ActionType::StateClear => ActionCategory::State,
            ActionType::ShowToast | ActionType::ShowModal | ActionType::ScrollTo => ActionCategory::Ui,
            ActionType::CustomCode => ActionCategory::Custom,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Per-action configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementTarget {
    pub element_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpdateMethod {
    #[default]
    Patch,
    Put,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub method: UpdateMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStateConfig {
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearStateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ClearStateConfig {
    /// The key to clear, `None` meaning "everything". An empty key counts as
    /// no key.
    pub fn target(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Default,
    Success,
    Error,
    Warning,
}

fn default_toast_duration() -> u64 {
    3000
}

fn toast_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let millis = match &value {
        Value::Null => return Ok(default_toast_duration()),
        Value::String(s) if s.trim().is_empty() => return Ok(default_toast_duration()),
        Value::Number(_) | Value::String(_) => crate::compare::to_number(&value),
        _ => None,
    };
    match millis {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms.round() as u64),
        _ => Err(D::Error::custom(format!("invalid toast duration {value}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastConfig {
    pub message: String,
    #[serde(default, alias = "type")]
    pub toast_type: ToastKind,
    /// Milliseconds; editors may store it as a numeric string
    #[serde(default = "default_toast_duration", deserialize_with = "toast_duration")]
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalConfig {
    pub modal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCodeConfig {
    pub code: String,
}

/// A typed action: one variant per built-in type.
///
/// `Unknown` keeps steps whose type is not in the catalog (reported and
/// skipped at dispatch); `Malformed` keeps known steps whose configuration
/// does not fit the type (a dispatch error).
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    VisibilityShow(ElementTarget),
    VisibilityHide(ElementTarget),
    VisibilityToggle(ElementTarget),
    Navigate(NavigateConfig),
    NavigateBack,
    DataFetch(FetchConfig),
    DataCreate(CreateConfig),
    DataUpdate(UpdateConfig),
    DataDelete(DeleteConfig),
    StateSet(SetStateConfig),
    StateClear(ClearStateConfig),
    ShowToast(ToastConfig),
    ShowModal(ModalConfig),
    ScrollTo(ElementTarget),
    CustomCode(CustomCodeConfig),
    Unknown {
        action_type: String,
        config: Value,
    },
    Malformed {
        action_type: ActionType,
        config: Value,
        reason: String,
    },
}

impl Action {
    /// Build a typed action from its wire parts
    pub fn from_parts(type_name: &str, config: Value) -> Self {
        let config = match config {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        let Some(action_type) = ActionType::parse(type_name) else {
            return Action::Unknown {
                action_type: type_name.to_string(),
                config,
            };
        };

        match Self::typed(action_type, config.clone()) {
            Ok(action) => action,
            Err(e) => Action::Malformed {
                action_type,
                config,
                reason: e.to_string(),
            },
        }
    }

    fn typed(action_type: ActionType, config: Value) -> Result<Self, serde_json::Error> {
        use serde_json::from_value;

        Ok(match action_type {
            ActionType::VisibilityShow => Action::VisibilityShow(from_value(config)?),
            ActionType::VisibilityHide => Action::VisibilityHide(from_value(config)?),
            ActionType::VisibilityToggle => Action::VisibilityToggle(from_value(config)?),
            ActionType::Navigate => Action::Navigate(from_value(config)?),
            ActionType::NavigateBack => Action::NavigateBack,
            ActionType::DataFetch => Action::DataFetch(from_value(config)?),
            ActionType::DataCreate => Action::DataCreate(from_value(config)?),
            ActionType::DataUpdate => Action::DataUpdate(from_value(config)?),
            ActionType::DataDelete => Action::DataDelete(from_value(config)?),
            ActionType::StateSet => Action::StateSet(from_value(config)?),
            ActionType::StateClear => Action::StateClear(from_value(config)?),
            ActionType::ShowToast => Action::ShowToast(from_value(config)?),
            ActionType::ShowModal => Action::ShowModal(from_value(config)?),
            ActionType::ScrollTo => Action::ScrollTo(from_value(config)?),
            ActionType::CustomCode => Action::CustomCode(from_value(config)?),
        })
    }

    /// Wire type name
    pub fn type_name(&self) -> &str {
        match self {
            Action::Unknown { action_type, .. } => action_type,
            Action::Malformed { action_type, .. } => action_type.as_str(),
            other => other.action_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// Catalog type, `None` for unknown types
    pub fn action_type(&self) -> Option<ActionType> {
        Some(match self {
            Action::VisibilityShow(_) => ActionType::VisibilityShow,
            Action::VisibilityHide(_) => ActionType::VisibilityHide,
            Action::VisibilityToggle(_) => ActionType::VisibilityToggle,
            Action::Navigate(_) => ActionType::Navigate,
            Action::NavigateBack => ActionType::NavigateBack,
            Action::DataFetch(_) => ActionType::DataFetch,
            Action::DataCreate(_) => ActionType::DataCreate,
            Action::DataUpdate(_) => ActionType::DataUpdate,
            Action::DataDelete(_) => ActionType::DataDelete,
            Action::StateSet(_) => ActionType::StateSet,
            Action::StateClear(_) => ActionType::StateClear,
            Action::ShowToast(_) => ActionType::ShowToast,
            Action::ShowModal(_) => ActionType::ShowModal,
            Action::ScrollTo(_) => ActionType::ScrollTo,
            Action::CustomCode(_) => ActionType::CustomCode,
            Action::Malformed { action_type, .. } => *action_type,
            Action::Unknown { .. } => return None,
        })
    }

    /// Configuration as a flat field map
    pub fn config(&self) -> Value {
        fn to_value<T: Serialize>(config: &T) -> Value {
            serde_json::to_value(config).unwrap_or_else(|_| Value::Object(Map::new()))
        }

        match self {
            Action::VisibilityShow(c) | Action::VisibilityHide(c) | Action::VisibilityToggle(c) => {
                to_value(c)
            }
            Action::ScrollTo(c) => to_value(c),
            Action::Navigate(c) => to_value(c),
            Action::NavigateBack => Value::Object(Map::new()),
            Action::DataFetch(c) => to_value(c),
            Action::DataCreate(c) => to_value(c),
            Action::DataUpdate(c) => to_value(c),
            Action::DataDelete(c) => to_value(c),
            Action::StateSet(c) => to_value(c),
            Action::StateClear(c) => to_value(c),
            Action::ShowToast(c) => to_value(c),
            Action::ShowModal(c) => to_value(c),
            Action::CustomCode(c) => to_value(c),
            Action::Unknown { config, .. } | Action::Malformed { config, .. } => config.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Comparison operator of a step condition.
///
/// Operators outside the six known ones are kept verbatim and always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    Other(String),
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "==" => Operator::Eq,
            "!=" => Operator::NotEq,
            ">" => Operator::Gt,
            "<" => Operator::Lt,
            ">=" => Operator::Gte,
            "<=" => Operator::Lte,
            _ => Operator::Other(s),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Eq => "==".to_string(),
            Operator::NotEq => "!=".to_string(),
            Operator::Gt => ">".to_string(),
            Operator::Lt => "<".to_string(),
            Operator::Gte => ">=".to_string(),
            Operator::Lte => "<=".to_string(),
            Operator::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One step of a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawStep", into = "RawStep")]
pub struct ActionStep {
    pub id: String,
    pub label: Option<String>,
    pub action: Action,
    pub conditions: Vec<Condition>,
    pub on_success: Vec<ActionStep>,
    pub on_error: Vec<ActionStep>,
}

impl ActionStep {
    pub fn new(action: Action) -> Self {
        Self {
            id: widgetforge_common::next_id(),
            label: None,
            action,
            conditions: Vec::new(),
            on_success: Vec::new(),
            on_error: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn on_success(mut self, step: ActionStep) -> Self {
        self.on_success.push(step);
        self
    }

    pub fn on_error(mut self, step: ActionStep) -> Self {
        self.on_error.push(step);
        self
    }

    /// Number of steps in this subtree, including this one
    pub fn step_count(&self) -> usize {
        1 + self
            .on_success
            .iter()
            .chain(self.on_error.iter())
            .map(ActionStep::step_count)
            .sum::<usize>()
    }
}

/// Wire form of a step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    id: String,
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    config: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    on_success: Vec<ActionStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    on_error: Vec<ActionStep>,
}

impl From<RawStep> for ActionStep {
    fn from(raw: RawStep) -> Self {
        Self {
            id: raw.id,
            label: raw.label,
            action: Action::from_parts(&raw.action_type, raw.config),
            conditions: raw.conditions,
            on_success: raw.on_success,
            on_error: raw.on_error,
        }
    }
}

impl From<ActionStep> for RawStep {
    fn from(step: ActionStep) -> Self {
        Self {
            id: step.id,
            action_type: step.action.type_name().to_string(),
            label: step.label,
            config: step.action.config(),
            conditions: step.conditions,
            on_success: step.on_success,
            on_error: step.on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_step_parses_into_typed_action() {
        let step: ActionStep = serde_json::from_value(json!({
            "id": "s1",
            "type": "data.fetch",
            "config": { "endpoint": "https://api.example.com/items", "storeKey": "items" }
        }))
        .unwrap();

        assert_eq!(
            step.action,
            Action::DataFetch(FetchConfig {
                endpoint: "https://api.example.com/items".to_string(),
                store_key: Some("items".to_string()),
            })
        );
    }

    #[test]
    fn test_toast_duration_accepts_numeric_strings() {
        let toast = |config: Value| serde_json::from_value::<ToastConfig>(config).map(|t| t.duration);

        assert_eq!(toast(json!({ "message": "Hi", "duration": 5000 })).unwrap(), 5000);
        assert_eq!(toast(json!({ "message": "Hi", "duration": "1500" })).unwrap(), 1500);
        assert_eq!(toast(json!({ "message": "Hi", "duration": " 250.4 " })).unwrap(), 250);
        assert_eq!(toast(json!({ "message": "Hi", "duration": "" })).unwrap(), 3000);
        assert_eq!(toast(json!({ "message": "Hi", "duration": null })).unwrap(), 3000);
        assert_eq!(toast(json!({ "message": "Hi" })).unwrap(), 3000);
        assert!(toast(json!({ "message": "Hi", "duration": "soon" })).is_err());
        assert!(toast(json!({ "message": "Hi", "duration": -1 })).is_err());
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let raw = json!({ "id": "s1", "type": "payments.charge", "config": { "amount": 5 } });
        let step: ActionStep = serde_json::from_value(raw.clone()).unwrap();

        assert!(matches!(step.action, Action::Unknown { .. }));
        assert_eq!(step.action.type_name(), "payments.charge");
        assert_eq!(serde_json::to_value(&step).unwrap(), raw);
    }

    #[test]
    fn test_missing_required_config_is_malformed() {
        let step: ActionStep = serde_json::from_value(json!({
            "id": "s1",
            "type": "visibility.show",
            "config": {}
        }))
        .unwrap();

        match step.action {
            Action::Malformed { action_type, reason, .. } => {
                assert_eq!(action_type, ActionType::VisibilityShow);
                assert!(reason.contains("elementId"));
            }
            other => panic!("expected malformed action, got {:?}", other),
        }
    }

    #[test]
    fn test_config_defaults_apply() {
        let step: ActionStep = serde_json::from_value(json!({
            "id": "s1",
            "type": "ui.showToast",
            "config": { "message": "Saved" }
        }))
        .unwrap();

        let Action::ShowToast(toast) = step.action else {
            panic!("expected toast");
        };
        assert_eq!(toast.toast_type, ToastKind::Default);
        assert_eq!(toast.duration, 3000);

        let step: ActionStep = serde_json::from_value(json!({
            "id": "s2",
            "type": "data.update",
            "config": { "endpoint": "/items/1" }
        }))
        .unwrap();
        let Action::DataUpdate(update) = step.action else {
            panic!("expected update");
        };
        assert_eq!(update.method, UpdateMethod::Patch);
    }

    #[test]
    fn test_nested_branches_and_conditions() {
        let step: ActionStep = serde_json::from_value(json!({
            "id": "root",
            "type": "data.delete",
            "config": { "endpoint": "/items/1" },
            "conditions": [{ "field": "age", "operator": ">=", "value": 18 }],
            "onSuccess": [{ "id": "ok", "type": "navigation.back" }],
            "onError": [{
                "id": "err",
                "type": "ui.showToast",
                "config": { "message": "Failed" },
                "onSuccess": [{ "id": "deep", "type": "state.clear" }]
            }]
        }))
        .unwrap();

        assert_eq!(step.conditions[0].operator, Operator::Gte);
        assert_eq!(step.step_count(), 4);
        assert_eq!(step.on_error[0].on_success[0].action, Action::StateClear(ClearStateConfig::default()));
    }

    #[test]
    fn test_unrecognised_operator_round_trips() {
        let condition: Condition =
            serde_json::from_value(json!({ "field": "a", "operator": "~=", "value": 1 })).unwrap();
        assert_eq!(condition.operator, Operator::Other("~=".to_string()));
        assert_eq!(serde_json::to_value(&condition).unwrap()["operator"], "~=");
    }

    #[test]
    fn test_trigger_wire_names() {
        assert_eq!(serde_json::to_value(TriggerType::OnWidgetMount).unwrap(), "onWidgetMount");
        let trigger: TriggerType = serde_json::from_value(json!("onPageLoad")).unwrap();
        assert_eq!(trigger, TriggerType::OnPageLoad);
    }
}
