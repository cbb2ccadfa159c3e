use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use widgetforge_actions::{
    ActionError, ActionInterpreter, ActionStep, EventBus, ExecutionContext, Host, HttpClient, HttpMethod,
    HttpRequest, HttpResponse, RecordingConsole, StepOutcome, TriggerType, Workflow,
};

/// Canned responses keyed by URL; unknown URLs fail at the transport level
#[derive(Default)]
struct MockHttp {
    responses: Mutex<HashMap<String, (u16, Value)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttp {
    fn respond(self, url: &str, status: u16, body: Value) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ActionError> {
        self.requests.lock().unwrap().push(request.clone());
        let canned = self.responses.lock().unwrap().get(&request.url).cloned();
        match canned {
            Some((status, body)) => Ok(HttpResponse::new(status, body)),
            None => Err(ActionError::request(&request.url, "connection refused")),
        }
    }
}

fn step(value: Value) -> ActionStep {
    serde_json::from_value(value).unwrap()
}

fn setup(http: MockHttp) -> (ActionInterpreter, Arc<MockHttp>) {
    let http = Arc::new(http);
    let host = Host::new(http.clone()).with_events(EventBus::recording());
    (ActionInterpreter::new(host), http)
}

#[tokio::test]
async fn condition_gates_step_on_age() {
    let (interpreter, _) = setup(MockHttp::default());
    let gated = step(json!({
        "id": "adult-only",
        "type": "state.set",
        "config": { "key": "welcome", "value": "adult" },
        "conditions": [{ "field": "age", "operator": ">", "value": 18 }]
    }));

    let mut minor = ExecutionContext::new("home").with_state("age", json!(17));
    assert_eq!(interpreter.execute_step(&gated, &mut minor).await, StepOutcome::Skipped);
    assert!(interpreter.host().state.get("welcome").is_none());

    let mut adult = ExecutionContext::new("home").with_state("age", json!("19"));
    assert_eq!(interpreter.execute_step(&gated, &mut adult).await, StepOutcome::Succeeded);
    assert_eq!(interpreter.host().state.get("welcome"), Some(json!("adult")));
    assert_eq!(adult.state.get("welcome"), Some(&json!("adult")));
}

#[tokio::test]
async fn condition_falls_back_to_shared_state() {
    let (interpreter, _) = setup(MockHttp::default());
    interpreter.host().state.set("role", json!("admin"));

    let admin_only = step(json!({
        "id": "s1",
        "type": "visibility.show",
        "config": { "elementId": "admin-panel" },
        "conditions": [
            { "field": "role", "operator": "==", "value": "admin" },
            { "field": "banned", "operator": "!=", "value": true }
        ]
    }));

    let mut ctx = ExecutionContext::new("home");
    assert_eq!(interpreter.execute_step(&admin_only, &mut ctx).await, StepOutcome::Succeeded);
    assert!(interpreter.host().visibility.is_visible("admin-panel", false));
}

#[tokio::test]
async fn error_branch_runs_after_http_failure() {
    let (interpreter, _) = setup(MockHttp::default().respond("https://api.test/items", 500, json!({})));
    let fetch = step(json!({
        "id": "load",
        "type": "data.fetch",
        "config": { "endpoint": "https://api.test/items", "storeKey": "items" },
        "onSuccess": [{ "id": "ok", "type": "state.set", "config": { "key": "loaded", "value": true } }],
        "onError": [{ "id": "err", "type": "state.set", "config": { "key": "loadFailed", "value": true } }]
    }));

    let mut ctx = ExecutionContext::new("home");
    let outcome = interpreter.execute_step(&fetch, &mut ctx).await;

    assert_eq!(outcome, StepOutcome::Failed("Fetch failed: 500".to_string()));
    assert_eq!(interpreter.host().state.get("loadFailed"), Some(json!(true)));
    assert!(interpreter.host().state.get("loaded").is_none());
    assert!(interpreter.host().state.get("items").is_none());
}

#[tokio::test]
async fn transport_error_also_takes_error_branch() {
    let (interpreter, _) = setup(MockHttp::default());
    let delete = step(json!({
        "id": "rm",
        "type": "data.delete",
        "config": { "endpoint": "https://unreachable.test/items/1" },
        "onError": [{ "id": "toast", "type": "ui.showToast", "config": { "message": "Could not delete", "toastType": "error" } }]
    }));

    let mut ctx = ExecutionContext::new("home");
    let outcome = interpreter.execute_step(&delete, &mut ctx).await;

    assert!(matches!(outcome, StepOutcome::Failed(_)));
    let toasts = interpreter.host().events.emitted("ui:toast");
    assert_eq!(
        toasts,
        vec![json!({ "message": "Could not delete", "type": "error", "duration": 3000 })]
    );
}

#[tokio::test]
async fn fetch_stores_result_and_emits_event() {
    let (interpreter, http) =
        setup(MockHttp::default().respond("https://api.test/items", 200, json!([{ "id": 1 }])));
    let fetch = step(json!({
        "id": "load",
        "type": "data.fetch",
        "config": { "endpoint": "https://api.test/items", "storeKey": "items" }
    }));

    let mut ctx = ExecutionContext::new("home");
    assert_eq!(interpreter.execute_step(&fetch, &mut ctx).await, StepOutcome::Succeeded);

    assert_eq!(interpreter.host().state.get("items"), Some(json!([{ "id": 1 }])));
    assert_eq!(
        interpreter.host().events.emitted("data:fetched"),
        vec![json!({ "key": "items", "data": [{ "id": 1 }] })]
    );
    assert_eq!(http.requests()[0].method, HttpMethod::Get);
}

#[tokio::test]
async fn create_and_update_send_json_bodies() {
    let http = MockHttp::default()
        .respond("https://api.test/items", 201, json!({ "id": 7 }))
        .respond("https://api.test/items/7", 200, json!({ "id": 7, "name": "b" }));
    let (interpreter, http) = setup(http);

    let steps = vec![
        step(json!({
            "id": "create",
            "type": "data.create",
            "config": { "endpoint": "https://api.test/items", "body": "{\"name\":\"a\"}" }
        })),
        step(json!({
            "id": "update",
            "type": "data.update",
            "config": { "endpoint": "https://api.test/items/7", "body": { "name": "b" }, "method": "PUT" }
        })),
    ];

    let mut ctx = ExecutionContext::new("home");
    let outcomes = interpreter.run_steps(&steps, &mut ctx).await;
    assert_eq!(outcomes, vec![StepOutcome::Succeeded, StepOutcome::Succeeded]);

    let requests = http.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].body, Some(json!({ "name": "a" })));
    assert_eq!(requests[1].method, HttpMethod::Put);

    let events = &interpreter.host().events;
    assert_eq!(events.emitted("data:created"), vec![json!({ "id": 7 })]);
    assert_eq!(events.emitted("data:updated"), vec![json!({ "id": 7, "name": "b" })]);
}

#[tokio::test]
async fn navigation_and_ui_events() {
    let (interpreter, _) = setup(MockHttp::default());
    let steps = vec![
        step(json!({ "id": "1", "type": "navigation.navigate", "config": { "pageId": "about" } })),
        step(json!({ "id": "2", "type": "navigation.back" })),
        step(json!({ "id": "3", "type": "ui.showModal", "config": { "modalId": "confirm", "title": "Sure?" } })),
        step(json!({ "id": "4", "type": "ui.scrollTo", "config": { "elementId": "footer" } })),
    ];

    let mut ctx = ExecutionContext::new("home");
    interpreter.run_steps(&steps, &mut ctx).await;

    let events = &interpreter.host().events;
    assert_eq!(events.emitted("navigate"), vec![json!({ "url": null, "pageId": "about" })]);
    assert_eq!(events.emitted("navigate:back"), vec![Value::Null]);
    assert_eq!(
        events.emitted("ui:modal"),
        vec![json!({ "title": "Sure?", "content": null, "modalId": "confirm" })]
    );
    assert_eq!(events.emitted("ui:scrollTo"), vec![json!({ "elementId": "footer" })]);
}

#[tokio::test]
async fn state_clear_removes_one_key_or_signals_all() {
    let (interpreter, _) = setup(MockHttp::default());
    let mut ctx = ExecutionContext::new("home").with_state("draft", json!("x"));
    interpreter.host().state.set("draft", json!("x"));
    interpreter.host().state.set("other", json!(1));

    let clear_one = step(json!({ "id": "c1", "type": "state.clear", "config": { "key": "draft" } }));
    let clear_all = step(json!({ "id": "c2", "type": "state.clear", "config": { "key": "" } }));
    interpreter.execute_step(&clear_one, &mut ctx).await;
    interpreter.execute_step(&clear_all, &mut ctx).await;

    assert!(interpreter.host().state.get("draft").is_none());
    assert!(ctx.state.get("draft").is_none());
    assert_eq!(interpreter.host().state.get("other"), Some(json!(1)));
    assert_eq!(
        interpreter.host().events.emitted("state:cleared"),
        vec![json!({ "key": "draft" }), json!({ "key": null })]
    );
}

#[tokio::test]
async fn unknown_type_is_a_successful_no_op() {
    let (interpreter, _) = setup(MockHttp::default());
    let mystery = step(json!({
        "id": "m",
        "type": "payments.charge",
        "config": { "amount": 10 },
        "onSuccess": [{ "id": "after", "type": "state.set", "config": { "key": "continued", "value": true } }]
    }));

    let mut ctx = ExecutionContext::new("home");
    assert_eq!(interpreter.execute_step(&mystery, &mut ctx).await, StepOutcome::Succeeded);
    assert_eq!(interpreter.host().state.get("continued"), Some(json!(true)));
}

#[tokio::test]
async fn malformed_config_takes_error_branch() {
    let (interpreter, _) = setup(MockHttp::default());
    let broken = step(json!({
        "id": "b",
        "type": "visibility.hide",
        "config": {},
        "onError": [{ "id": "e", "type": "state.set", "config": { "key": "handled", "value": 1 } }]
    }));

    let mut ctx = ExecutionContext::new("home");
    assert!(matches!(
        interpreter.execute_step(&broken, &mut ctx).await,
        StepOutcome::Failed(_)
    ));
    assert_eq!(interpreter.host().state.get("handled"), Some(json!(1)));
}

#[tokio::test]
async fn custom_code_errors_are_contained() {
    let console = Arc::new(RecordingConsole::new());
    let host = Host::new(Arc::new(MockHttp::default())).with_console(console.clone());
    let interpreter = ActionInterpreter::new(host);

    let steps = vec![
        step(json!({
            "id": "script",
            "type": "custom.code",
            "config": { "code": "console.log('page', context.pageId); state.set('ran', true); throw 'boom'" },
            "onSuccess": [{ "id": "next", "type": "state.set", "config": { "key": "after", "value": 1 } }]
        })),
        step(json!({ "id": "syntax", "type": "custom.code", "config": { "code": "let = ;" } })),
    ];

    let mut ctx = ExecutionContext::new("home");
    let outcomes = interpreter.run_steps(&steps, &mut ctx).await;

    assert_eq!(outcomes, vec![StepOutcome::Succeeded, StepOutcome::Succeeded]);
    assert_eq!(console.messages(), vec!["page home".to_string()]);
    assert_eq!(interpreter.host().state.get("ran"), Some(json!(true)));
    assert_eq!(interpreter.host().state.get("after"), Some(json!(1)));
}

#[tokio::test]
async fn concurrent_workflows_share_state_without_deadlock() {
    let (interpreter, _) = setup(MockHttp::default());
    let interpreter = Arc::new(interpreter);

    let mut handles = Vec::new();
    for i in 0..16 {
        let interpreter = interpreter.clone();
        handles.push(tokio::spawn(async move {
            let steps = vec![
                step(json!({ "id": "set", "type": "state.set", "config": { "key": "counter", "value": i } })),
                step(json!({
                    "id": "script",
                    "type": "custom.code",
                    "config": { "code": "let n = 0; while (n < 50) { state.set('counter', n); n += 1 }" }
                })),
            ];
            let mut ctx = ExecutionContext::new("home");
            interpreter.run_steps(&steps, &mut ctx).await
        }));
    }

    for handle in handles {
        let outcomes = handle.await.unwrap();
        assert!(outcomes.iter().all(|o| *o == StepOutcome::Succeeded));
    }
    assert!(interpreter.host().state.get("counter").is_some());
}

#[tokio::test]
async fn fire_runs_only_matching_workflows() {
    let (interpreter, _) = setup(MockHttp::default());
    let workflow = |id: &str, trigger: &str, key: &str| -> Workflow {
        serde_json::from_value(json!({
            "id": id,
            "name": id,
            "trigger": trigger,
            "projectId": "p1",
            "steps": [{ "id": "s", "type": "state.set", "config": { "key": key, "value": true } }],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    };
    let workflows = vec![
        workflow("a", "onClick", "clicked"),
        workflow("b", "onPageLoad", "loaded"),
        workflow("c", "onClick", "clickedAgain"),
    ];

    let ran = interpreter
        .fire(TriggerType::OnClick, &workflows, &ExecutionContext::new("home"))
        .await;

    assert_eq!(ran, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(interpreter.host().state.get("clicked"), Some(json!(true)));
    assert_eq!(interpreter.host().state.get("clickedAgain"), Some(json!(true)));
    assert!(interpreter.host().state.get("loaded").is_none());
}
