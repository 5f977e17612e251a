//! Generations command - list cache generations

use crate::cli::args::{GenerationsArgs, OutputFormat};
use crate::cli::commands::current_identity;
use crate::config::{Config, ConfigManager};
use crate::error::CachegateResult;
use crate::storage::{create_storage, GenerationInfo};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the generations command
pub async fn execute(
    args: GenerationsArgs,
    manager: &ConfigManager,
    config: &Config,
) -> CachegateResult<()> {
    let storage = create_storage(&config.storage);
    let current = current_identity(manager, config)
        .await
        .ok()
        .map(|(identity, _)| identity.to_string());

    let mut generations = vec![];
    for name in storage.names().await? {
        if let Some(info) = storage.info(&name).await? {
            generations.push(info);
        }
    }

    if generations.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "No cache generations"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&generations, current.as_deref()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generations)?),
        OutputFormat::Plain => {
            for generation in &generations {
                println!("{}", generation.name);
            }
        }
    }

    Ok(())
}

fn print_table(generations: &[GenerationInfo], current: Option<&str>) {
    println!(
        "{:<40} {:>8} {:<17} {}",
        style("NAME").bold(),
        style("ENTRIES").bold(),
        style("CREATED").bold(),
        style("STATUS").bold()
    );
    println!("{}", "-".repeat(76));

    for generation in generations {
        let status = if Some(generation.name.as_str()) == current {
            style("current").green()
        } else {
            style("stale").yellow()
        };
        println!(
            "{:<40} {:>8} {:<17} {}",
            generation.name,
            generation.entries,
            generation.created_at.format("%Y-%m-%d %H:%M"),
            status
        );
    }

    println!();
    println!("{} generation(s)", generations.len());
}
