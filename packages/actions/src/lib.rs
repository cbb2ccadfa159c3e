//! Workflow steps, the built-in action catalog and the interpreter that runs
//! them against explicit state, visibility, event and HTTP handles.

pub mod compare;
pub mod errors;
pub mod events;
pub mod http;
pub mod interpreter;
pub mod registry;
pub mod sandbox;
pub mod state;
pub mod step;
pub mod visibility;
pub mod workflow;

pub use errors::ActionError;
pub use events::{EmittedEvent, EventBus, SubscriptionId};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient};
pub use interpreter::{ActionInterpreter, Host, StepOutcome};
pub use registry::{by_category, catalog, definition, validate_step, ActionDefinition, ConfigField, ConfigIssue};
pub use sandbox::{Console, ConsoleLevel, RecordingConsole, Sandbox, ScriptError, TracingConsole};
pub use state::{ExecutionContext, SharedState, StateScope};
pub use step::{
    Action, ActionCategory, ActionStep, ActionType, Condition, Operator, TriggerType,
};
pub use visibility::VisibilityControl;
pub use workflow::{for_page, for_widget, Workflow, WorkflowChanges, WorkflowDraft, WorkflowError, WorkflowRepository};
