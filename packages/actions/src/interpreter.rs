//! # Action Interpreter
//!
//! Executes workflow steps against a [`Host`]: the shared state bag, the
//! visibility flags, the event bus, the HTTP client and the console scripts
//! write to.
//!
//! A step runs in three phases:
//!
//! 1. **Conditions**: every condition must hold (context state first, then
//!    shared state); otherwise the step and its branches are skipped
//! 2. **Dispatch**: the action's effect
//! 3. **Branch**: `onSuccess` steps after a clean dispatch, `onError` steps
//!    after a failed one
//!
//! Failures never escape a run. They are logged, drive the error branch, and
//! show up in the returned [`StepOutcome`].

use crate::compare::{loose_cmp, loose_eq};
use crate::events::EventBus;
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::sandbox::{Capabilities, Console, Sandbox, TracingConsole};
use crate::state::{ExecutionContext, SharedState, StateScope};
use crate::step::{Action, ActionStep, Condition, Operator, TriggerType, UpdateMethod};
use crate::visibility::VisibilityControl;
use crate::workflow::Workflow;
use crate::ActionError;
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Capabilities the interpreter acts on
#[derive(Clone)]
pub struct Host {
    pub state: SharedState,
    pub visibility: VisibilityControl,
    pub events: EventBus,
    pub http: Arc<dyn HttpClient>,
    pub console: Arc<dyn Console>,
}

impl Host {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            state: SharedState::new(),
            visibility: VisibilityControl::new(),
            events: EventBus::new(),
            http,
            console: Arc::new(TracingConsole),
        }
    }

    pub fn with_state(mut self, state: SharedState) -> Self {
        self.state = state;
        self
    }

    pub fn with_visibility(mut self, visibility: VisibilityControl) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state)
            .field("visibility", &self.visibility)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// What happened to one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A condition did not hold
    Skipped,
    Succeeded,
    /// Dispatch failed; the error branch ran
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ActionInterpreter {
    host: Host,
    sandbox: Sandbox,
}

impl ActionInterpreter {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            sandbox: Sandbox::new(),
        }
    }

    pub fn with_sandbox(mut self, sandbox: Sandbox) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// All conditions hold; an empty list always passes
    pub fn check_conditions(&self, conditions: &[Condition], ctx: &ExecutionContext) -> bool {
        let scope = StateScope::new(ctx, &self.host.state);
        conditions.iter().all(|condition| {
            let actual = scope.lookup(&condition.field);
            evaluate_condition(condition, actual.as_ref())
        })
    }

    /// Run one step and, depending on how its dispatch went, one of its
    /// branches.
    pub fn execute_step<'a>(
        &'a self,
        step: &'a ActionStep,
        ctx: &'a mut ExecutionContext,
    ) -> BoxFuture<'a, StepOutcome> {
        async move {
            if !self.check_conditions(&step.conditions, ctx) {
                debug!(step_id = %step.id, "Conditions not met, skipping step");
                return StepOutcome::Skipped;
            }

            debug!(step_id = %step.id, action = step.action.type_name(), "Executing step");
            match self.dispatch(&step.action, ctx).await {
                Ok(()) => {
                    self.run_steps(&step.on_success, ctx).await;
                    StepOutcome::Succeeded
                }
                Err(e) => {
                    error!(
                        step_id = %step.id,
                        action = step.action.type_name(),
                        error = %e,
                        "Step failed"
                    );
                    self.run_steps(&step.on_error, ctx).await;
                    StepOutcome::Failed(e.to_string())
                }
            }
        }
        .boxed()
    }

    /// Run steps strictly in order, each seeing the previous one's effects
    pub async fn run_steps(&self, steps: &[ActionStep], ctx: &mut ExecutionContext) -> Vec<StepOutcome> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for step in steps {
            outcomes.push(self.execute_step(step, ctx).await);
        }
        outcomes
    }

    #[instrument(skip(self, workflow, ctx), fields(workflow_id = %workflow.id, trigger = ?workflow.trigger))]
    pub async fn run_workflow(&self, workflow: &Workflow, ctx: &mut ExecutionContext) -> Vec<StepOutcome> {
        self.run_steps(&workflow.steps, ctx).await
    }

    /// Run every workflow bound to `trigger` concurrently, each with its own
    /// copy of `ctx`. Returns the ids of the workflows that ran.
    pub async fn fire(&self, trigger: TriggerType, workflows: &[Workflow], ctx: &ExecutionContext) -> Vec<String> {
        let matching: Vec<&Workflow> = workflows.iter().filter(|w| w.trigger == trigger).collect();
        debug!(?trigger, count = matching.len(), "Firing trigger");

        join_all(matching.iter().map(|workflow| {
            let mut ctx = ctx.clone();
            async move {
                self.run_workflow(workflow, &mut ctx).await;
                workflow.id.clone()
            }
        }))
        .await
    }

    async fn dispatch(&self, action: &Action, ctx: &mut ExecutionContext) -> Result<(), ActionError> {
        let host = &self.host;

        match action {
            Action::VisibilityShow(target) => host.visibility.show(&target.element_id),
            Action::VisibilityHide(target) => host.visibility.hide(&target.element_id),
            Action::VisibilityToggle(target) => host.visibility.toggle(&target.element_id),

            Action::Navigate(config) => {
                host.events
                    .emit("navigate", json!({ "url": config.url, "pageId": config.page_id }));
            }
            Action::NavigateBack => host.events.emit("navigate:back", Value::Null),

            Action::DataFetch(config) => {
                let response = self
                    .send("Fetch", HttpRequest::new(HttpMethod::Get, &config.endpoint))
                    .await?;
                let key = config.store_key.as_deref().filter(|k| !k.is_empty());
                if let Some(key) = key {
                    host.state.set(key, response.body.clone());
                }
                host.events
                    .emit("data:fetched", json!({ "key": key, "data": response.body }));
            }
            Action::DataCreate(config) => {
                let request = HttpRequest::new(HttpMethod::Post, &config.endpoint)
                    .with_body(request_body(config.body.as_ref()));
                let response = self.send("Create", request).await?;
                host.events.emit("data:created", response.body);
            }
            Action::DataUpdate(config) => {
                let method = match config.method {
                    UpdateMethod::Patch => HttpMethod::Patch,
                    UpdateMethod::Put => HttpMethod::Put,
                };
                let request =
                    HttpRequest::new(method, &config.endpoint).with_body(request_body(config.body.as_ref()));
                let response = self.send("Update", request).await?;
                host.events.emit("data:updated", response.body);
            }
            Action::DataDelete(config) => {
                self.send("Delete", HttpRequest::new(HttpMethod::Delete, &config.endpoint))
                    .await?;
                host.events
                    .emit("data:deleted", json!({ "endpoint": config.endpoint }));
            }

            Action::StateSet(config) => {
                host.state.set(config.key.clone(), config.value.clone());
                ctx.state.insert(config.key.clone(), config.value.clone());
                host.events
                    .emit("state:set", json!({ "key": config.key, "value": config.value }));
            }
            Action::StateClear(config) => {
                let key = config.target();
                if let Some(key) = key {
                    host.state.remove(key);
                    ctx.state.remove(key);
                }
                host.events.emit("state:cleared", json!({ "key": key }));
            }

            Action::ShowToast(config) => {
                host.events.emit(
                    "ui:toast",
                    json!({
                        "message": config.message,
                        "type": config.toast_type,
                        "duration": config.duration,
                    }),
                );
            }
            Action::ShowModal(config) => {
                host.events.emit(
                    "ui:modal",
                    json!({
                        "title": config.title,
                        "content": config.content,
                        "modalId": config.modal_id,
                    }),
                );
            }
            Action::ScrollTo(target) => {
                host.events
                    .emit("ui:scrollTo", json!({ "elementId": target.element_id }));
            }

            Action::CustomCode(config) => self.run_script(&config.code, ctx),

            Action::Unknown { action_type, .. } => {
                warn!(action_type = %action_type, "Unknown action type");
            }
            Action::Malformed {
                action_type, reason, ..
            } => {
                return Err(ActionError::InvalidConfig {
                    action_type: action_type.to_string(),
                    reason: reason.clone(),
                });
            }
        }

        Ok(())
    }

    async fn send(&self, operation: &'static str, request: HttpRequest) -> Result<HttpResponse, ActionError> {
        let response = self.host.http.send(request).await?;
        if !response.is_success() {
            return Err(ActionError::HttpStatus {
                operation,
                status: response.status,
            });
        }
        Ok(response)
    }

    /// Script errors stay inside the step: they are logged and the step
    /// still succeeds.
    fn run_script(&self, code: &str, ctx: &mut ExecutionContext) {
        let capabilities = Capabilities {
            state: &self.host.state,
            visibility: &self.host.visibility,
            events: &self.host.events,
            console: self.host.console.as_ref(),
            context: ctx,
        };

        if let Err(e) = self.sandbox.run(code, capabilities) {
            error!(error = %e, "Custom code failed");
        }
    }
}

/// Body sent by create/update. A string holding JSON is sent parsed.
fn request_body(body: Option<&Value>) -> Value {
    match body {
        None | Some(Value::Null) => json!({}),
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        Some(other) => other.clone(),
    }
}

fn evaluate_condition(condition: &Condition, actual: Option<&Value>) -> bool {
    let expected = Some(&condition.value);
    match &condition.operator {
        Operator::Eq => loose_eq(actual, expected),
        Operator::NotEq => !loose_eq(actual, expected),
        Operator::Gt => loose_cmp(actual, expected) == Some(Ordering::Greater),
        Operator::Lt => loose_cmp(actual, expected) == Some(Ordering::Less),
        Operator::Gte => matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lte => matches!(
            loose_cmp(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Other(op) => {
            debug!(operator = %op, "Unrecognised operator treated as satisfied");
            true
        }
    }
}
