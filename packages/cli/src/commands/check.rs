use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use widgetforge_actions::sandbox::{format_script_error, Capabilities};
use widgetforge_actions::{
    validate_step, Action, ActionStep, ConsoleLevel, EventBus, ExecutionContext, RecordingConsole,
    Sandbox, SharedState, VisibilityControl, WorkflowRepository,
};
use widgetforge_common::FileStore;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project whose workflows are checked
    pub project_id: String,
}

#[derive(Args, Debug)]
pub struct CheckScriptArgs {
    /// Script file
    pub input: PathBuf,

    /// Run the script against empty state after checking it
    #[arg(short, long)]
    pub run: bool,
}

/// Report configuration issues and script syntax errors in a project's workflows
pub async fn check(args: CheckArgs, config: &Config, cwd: &str) -> Result<()> {
    println!("🔍 {} workflows of {}", "Checking".green().bold(), args.project_id);
    println!();

    let repository = WorkflowRepository::new(FileStore::new(config.get_data_dir(cwd)));
    let workflows = repository.list(&args.project_id).await?;

    let mut total_issues = 0;
    for workflow in &workflows {
        let mut lines = Vec::new();
        for step in &workflow.steps {
            for issue in validate_step(step) {
                lines.push(format!("[{}] {} {}", issue.step_id, issue.key.bold(), issue.message));
            }
            check_scripts(step, &workflow.name, &mut lines);
        }

        if lines.is_empty() {
            println!("{} {}", "✓".green(), workflow.name);
        } else {
            println!("{} {}", "✗".red(), workflow.name);
            for line in &lines {
                println!("  {}", line);
            }
            total_issues += lines.len();
        }
    }

    println!();
    println!("   Workflows checked: {}", workflows.len());
    if total_issues > 0 {
        return Err(anyhow!("{} issue(s) found", total_issues));
    }
    println!("   {} No issues found!", "✓".green());
    Ok(())
}

fn check_scripts(step: &ActionStep, workflow: &str, lines: &mut Vec<String>) {
    if let Action::CustomCode(config) = &step.action {
        if let Err(err) = Sandbox::new().check(&config.code) {
            let filename = format!("{}/{}", workflow, step.id);
            lines.push(format_script_error(&config.code, &filename, &err));
        }
    }
    for branch in step.on_success.iter().chain(&step.on_error) {
        check_scripts(branch, workflow, lines);
    }
}

/// Parse (and optionally run) a custom code script
pub fn check_script(args: CheckScriptArgs, config: &Config) -> Result<()> {
    let source = fs::read_to_string(&args.input)?;
    let filename = args.input.display().to_string();
    let sandbox = Sandbox::new();

    if let Err(err) = sandbox.check(&source) {
        eprintln!("{}", format_script_error(&source, &filename, &err));
        return Err(anyhow!("{} does not parse", filename));
    }
    println!("{} {}", "✓".green(), filename);

    if !args.run {
        return Ok(());
    }

    let state = SharedState::new();
    let visibility = VisibilityControl::new();
    let events = EventBus::recording();
    let console = RecordingConsole::new();
    let mut context = ExecutionContext::new(config.default_page_id.clone());

    let result = sandbox.run(
        &source,
        Capabilities {
            state: &state,
            visibility: &visibility,
            events: &events,
            console: &console,
            context: &mut context,
        },
    );

    for (level, line) in console.lines() {
        let label = match level {
            ConsoleLevel::Log | ConsoleLevel::Info => "log".blue(),
            ConsoleLevel::Warn => "warn".yellow(),
            ConsoleLevel::Error => "error".red(),
        };
        println!("  {} {}", label, line);
    }
    for event in events.history() {
        println!("  {} {} {}", "emit".magenta(), event.name, event.payload);
    }

    let value = result.map_err(|err| {
        eprintln!("{}", format_script_error(&source, &filename, &err));
        anyhow!("{} failed", filename)
    })?;
    let summary = json!({ "result": value, "state": state.snapshot() });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
