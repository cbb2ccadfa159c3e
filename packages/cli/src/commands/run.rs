use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::sync::Arc;
use widgetforge_actions::{
    for_page, for_widget, ActionInterpreter, EventBus, ExecutionContext, Host, ReqwestClient,
    SharedState, TracingConsole, TriggerType, Workflow, WorkflowRepository,
};
use widgetforge_common::FileStore;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project whose workflows are loaded
    pub project_id: String,

    /// Trigger to fire (onClick, onSubmit, onPageLoad, ...)
    #[arg(short, long, value_parser = parse_trigger)]
    pub trigger: TriggerType,

    /// Only workflows attached to this widget
    #[arg(short, long)]
    pub widget: Option<String>,

    /// Page id for the run (defaults to config)
    #[arg(short, long)]
    pub page: Option<String>,

    /// Trigger payload as JSON
    #[arg(short, long)]
    pub data: Option<String>,

    /// Initial shared state, `key=value` (value parsed as JSON when it can be)
    #[arg(short, long = "state")]
    pub state: Vec<String>,
}

fn parse_trigger(name: &str) -> Result<TriggerType, String> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| format!("unknown trigger '{name}'"))
}

fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected key=value, got '{}'", raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub async fn run(args: RunArgs, config: &Config, cwd: &str) -> Result<()> {
    let repository = WorkflowRepository::new(FileStore::new(config.get_data_dir(cwd)));
    let all = repository.list(&args.project_id).await?;

    let page_id = args.page.clone().unwrap_or_else(|| config.default_page_id.clone());
    let workflows: Vec<Workflow> = match (&args.widget, &args.page) {
        (Some(widget), _) => for_widget(&all, widget).into_iter().cloned().collect(),
        (None, Some(page)) => for_page(&all, page).into_iter().cloned().collect(),
        (None, None) => all,
    };

    let state = SharedState::new();
    for raw in &args.state {
        let (key, value) = parse_assignment(raw)?;
        state.set(key, value);
    }

    let mut ctx = ExecutionContext::new(page_id);
    if let Some(widget) = &args.widget {
        ctx = ctx.with_widget(widget.clone());
    }
    if let Some(data) = &args.data {
        let data: Value = serde_json::from_str(data).context("--data is not valid JSON")?;
        ctx = ctx.with_trigger_data(data);
    }

    let http = ReqwestClient::new(config.http_timeout())?;
    let host = Host::new(Arc::new(http))
        .with_state(state.clone())
        .with_events(EventBus::recording())
        .with_console(Arc::new(TracingConsole));
    let interpreter = ActionInterpreter::new(host);

    println!(
        "▶️  {} {:?} for project {}",
        "Firing".green().bold(),
        args.trigger,
        args.project_id
    );
    let ran = interpreter.fire(args.trigger, &workflows, &ctx).await;

    if ran.is_empty() {
        println!("{}", "⚠️  No workflows matched".yellow());
        return Ok(());
    }
    for id in &ran {
        let name = workflows
            .iter()
            .find(|w| &w.id == id)
            .map(|w| w.name.as_str())
            .unwrap_or_default();
        println!("  {} {} {}", "✓".green(), name, id.dimmed());
    }

    let host = interpreter.host();
    let events = host.events.history();
    if !events.is_empty() {
        println!();
        println!("Events:");
        for event in events {
            println!("  {} {}", event.name.cyan(), event.payload);
        }
    }

    let mut visibility: Vec<_> = host.visibility.snapshot().into_iter().collect();
    if !visibility.is_empty() {
        visibility.sort();
        println!();
        println!("Visibility:");
        for (id, visible) in visibility {
            println!("  {} {}", id, if visible { "shown".green() } else { "hidden".red() });
        }
    }

    println!();
    println!("State:");
    println!("{}", serde_json::to_string_pretty(&Value::Object(state.snapshot()))?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_trigger() {
        assert_eq!(parse_trigger("onPageLoad"), Ok(TriggerType::OnPageLoad));
        assert!(parse_trigger("onTeleport").is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("age=19").unwrap(), ("age".to_string(), json!(19)));
        assert_eq!(
            parse_assignment("name=Ada").unwrap(),
            ("name".to_string(), json!("Ada"))
        );
        assert!(parse_assignment("novalue").is_err());
    }
}
