use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::{Map, Value};
use widgetforge_common::FileStore;
use widgetforge_editor::DocumentStore;
use widgetforge_tree::project_span_style;

#[derive(Args, Debug)]
pub struct StyleArgs {
    /// Widget id to load
    pub widget_id: String,

    /// Only this node
    #[arg(short, long)]
    pub node: Option<String>,

    /// Output format (css, json)
    #[arg(short, long, default_value = "css")]
    pub format: String,
}

pub async fn style(args: StyleArgs, config: &Config, cwd: &str) -> Result<()> {
    let mut store = DocumentStore::new(FileStore::new(config.get_data_dir(cwd)));
    store.load(&args.widget_id).await?;
    let Some(document) = store.document() else {
        return Ok(());
    };

    let ids: Vec<&str> = match args.node.as_deref() {
        Some(id) if document.tree().contains(id) => vec![id],
        Some(id) => return Err(anyhow!("Node not found: {}", id)),
        None => document.tree().ids(),
    };

    let mut json = Map::new();
    for id in ids {
        let (Some(node), Some(style)) = (document.tree().get(id), store.style_of(id)) else {
            continue;
        };
        let spans = node.props.rich_spans.as_deref().unwrap_or_default();

        if args.format == "json" {
            json.insert(id.to_string(), serde_json::to_value(&style)?);
            for span in spans {
                json.insert(span.id.clone(), serde_json::to_value(project_span_style(span))?);
            }
            continue;
        }

        println!("/* {} {} */", node.widget_type, node.name);
        println!("#{} {{", id);
        for line in style.to_css().lines() {
            println!("  {}", line);
        }
        println!("}}");
        for span in spans {
            let span_style = project_span_style(span);
            if !span_style.is_empty() {
                println!("#{} {{ {} }}", span.id, span_style.to_inline());
            }
        }
        println!();
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&Value::Object(json))?);
    }
    Ok(())
}
