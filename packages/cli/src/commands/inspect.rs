use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use widgetforge_common::FileStore;
use widgetforge_editor::{Document, DocumentStore, WidgetKind};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Widget id to load
    pub widget_id: String,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn inspect(args: InspectArgs, config: &Config, cwd: &str) -> Result<()> {
    let mut store = DocumentStore::new(FileStore::new(config.get_data_dir(cwd)));
    store.load(&args.widget_id).await?;
    let Some(document) = store.document() else {
        return Ok(());
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&document.to_payload())?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "🧩".bright_blue(),
        document.name.bold(),
        format!("({})", document.id).dimmed()
    );
    println!("   Project: {}", document.project_id);
    println!(
        "   Kind:    {}",
        match document.kind() {
            WidgetKind::Standard => "standard",
            WidgetKind::ListItem => "list-item",
        }
    );
    println!("   Nodes:   {}", document.tree().len());
    println!();

    print_node(document, document.root_id(), 0);

    let bindings = &document.list_item_meta().data_bindings;
    if !bindings.is_empty() {
        println!();
        println!("Data bindings:");
        for binding in bindings {
            println!(
                "  {} {:?} ← {}",
                binding.node_id,
                binding.property,
                binding.field.cyan()
            );
        }
    }

    Ok(())
}

fn print_node(document: &Document, id: &str, depth: usize) {
    let Some(node) = document.tree().get(id) else {
        return;
    };

    let mut line = format!(
        "{}{} {}",
        "  ".repeat(depth),
        node.widget_type.to_string().green(),
        node.name
    );
    if let Some(text) = node.props.text.as_deref() {
        line.push_str(&format!(" {}", format!("\"{text}\"").yellow()));
    }
    if node.is_hidden() {
        line.push_str(&format!(" {}", "[hidden]".dimmed()));
    }
    if node.is_locked() {
        line.push_str(&format!(" {}", "[locked]".dimmed()));
    }
    for (trigger, steps) in &node.actions {
        line.push_str(&format!(" {}", format!("{trigger:?}×{}", steps.len()).magenta()));
    }
    line.push_str(&format!(" {}", node.id.dimmed()));
    println!("{line}");

    for child in document.tree().children(id) {
        print_node(document, child, depth + 1);
    }
}
