//! cachegate - versioned read-through cache controller
//!
//! CLI entry point that dispatches to subcommands.

use cachegate::cli::args::{ConfigAction, ConfigArgs};
use cachegate::cli::{Cli, Commands};
use cachegate::config::{Config, ConfigManager};
use cachegate::error::CachegateResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CachegateResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    // `config init` must be able to replace a broken file
    let config = match config_manager.load().await {
        Ok(config) => config,
        Err(_) if is_config_init(&cli.command) => Config::default(),
        Err(e) => return Err(e),
    };

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("cachegate=warn"),
        1 => EnvFilter::new("cachegate=info"),
        _ => EnvFilter::new("cachegate=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    cachegate::ui::init_theme();

    match cli.command {
        Commands::Identity => cachegate::cli::commands::identity(&config_manager, &config).await,
        Commands::Install => cachegate::cli::commands::install(&config_manager, &config).await,
        Commands::Activate => cachegate::cli::commands::activate(&config_manager, &config).await,
        Commands::Deploy => cachegate::cli::commands::deploy(&config_manager, &config).await,
        Commands::Fetch(args) => {
            cachegate::cli::commands::fetch(args, &config_manager, &config).await
        }
        Commands::Generations(args) => {
            cachegate::cli::commands::generations(args, &config_manager, &config).await
        }
        Commands::Config(args) => {
            cachegate::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

fn is_config_init(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Init { .. })
        })
    )
}
