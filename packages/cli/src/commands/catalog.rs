use anyhow::Result;
use clap::Args;
use colored::Colorize;
use widgetforge_actions::{by_category, catalog as built_in_actions};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// List the built-in actions an editor can offer
pub fn catalog(args: CatalogArgs) -> Result<()> {
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(built_in_actions())?);
        return Ok(());
    }

    for (category, definitions) in by_category() {
        println!("{}", format!("{category:?}").bright_blue().bold());
        for def in definitions {
            println!("  {:<22} {}", def.action_type.as_str().green(), def.label);
            println!("  {:<22} {}", "", def.description.dimmed());
            for field in def.config_fields {
                let required = if field.required { "*" } else { "" };
                println!("  {:<22}   {}{}", "", field.key, required.red());
            }
        }
        println!();
    }
    Ok(())
}
