use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::PathBuf;
use widgetforge_actions::{ActionStep, TriggerType, WorkflowDraft, WorkflowRepository};
use widgetforge_common::{FileStore, RowStore};
use widgetforge_editor::{Document, WIDGETS_TABLE};
use widgetforge_tree::{Mutation, PropsPatch, WidgetType};

pub const SAMPLE_PROJECT: &str = "demo";
pub const SAMPLE_WIDGET: &str = "welcome";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Data directory
    #[arg(short, long, default_value = "data")]
    pub data_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub async fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing widgetforge project...".bright_blue().bold());

    let config = Config {
        data_dir: args.data_dir.clone(),
        ..Config::default()
    };

    let data_dir = config.get_data_dir(cwd);
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
        println!("  {} Created {}/", "✓".green(), args.data_dir);
    }

    let store = FileStore::new(&data_dir);
    if store.read(WIDGETS_TABLE, SAMPLE_WIDGET).await.is_err() {
        let button_id = seed_widget(&store).await?;
        seed_workflow(store, &button_id).await?;
        println!("  {} Created sample widget '{}'", "✓".green(), SAMPLE_WIDGET);
    }

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: widgetforge inspect {}", SAMPLE_WIDGET);
    println!("  2. Run: widgetforge style {}", SAMPLE_WIDGET);
    println!("  3. Run: widgetforge run {} --trigger onClick", SAMPLE_PROJECT);

    Ok(())
}

/// Welcome card: a heading and a sign-up button. Returns the button id.
async fn seed_widget(store: &FileStore) -> Result<String> {
    let mut document = Document::new(SAMPLE_WIDGET, SAMPLE_PROJECT, "Welcome card");
    let root = document.root_id().to_string();

    let mut insert = |widget_type: WidgetType| -> Result<String> {
        document
            .apply(&Mutation::InsertChild {
                parent_id: root.clone(),
                widget_type,
            })?
            .created_id()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("insert produced no node"))
    };
    let heading = insert(WidgetType::Text)?;
    let button = insert(WidgetType::Button)?;

    let patch: PropsPatch = serde_json::from_value(json!({
        "text": "Welcome aboard",
        "typography": { "fontSize": 24, "fontWeight": "700" }
    }))?;
    document.apply(&Mutation::PatchProps { node_id: heading, patch })?;
    document.apply(&Mutation::Rename {
        node_id: button.clone(),
        name: "Sign up".to_string(),
    })?;

    let mut row = Map::new();
    row.insert("id".to_string(), Value::String(document.id.clone()));
    row.insert("project_id".to_string(), Value::String(document.project_id.clone()));
    row.insert("name".to_string(), Value::String(document.name.clone()));
    row.insert("elements".to_string(), document.to_payload());
    store.insert(WIDGETS_TABLE, row).await?;

    Ok(button)
}

async fn seed_workflow(store: FileStore, button_id: &str) -> Result<()> {
    let steps: Vec<ActionStep> = serde_json::from_value(json!([
        {
            "id": "remember-click",
            "type": "state.set",
            "config": { "key": "signedUp", "value": true },
            "onSuccess": [{
                "id": "thank-you",
                "type": "ui.showToast",
                "config": { "message": "Thanks for signing up", "type": "success" }
            }]
        }
    ]))?;

    WorkflowRepository::new(store)
        .create(WorkflowDraft {
            project_id: SAMPLE_PROJECT.to_string(),
            name: "Sign up click".to_string(),
            trigger: TriggerType::OnClick,
            steps,
            widget_id: Some(button_id.to_string()),
            page_id: None,
        })
        .await?;
    Ok(())
}
