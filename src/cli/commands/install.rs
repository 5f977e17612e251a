//! Install command - provision the current generation

use crate::cli::commands::Runtime;
use crate::config::{Config, ConfigManager};
use crate::error::CachegateResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(manager: &ConfigManager, config: &Config) -> CachegateResult<()> {
    let ctx = UiContext::detect();
    let runtime = Runtime::load(manager, config).await?;
    let identity = runtime.identity.clone();
    let assets = runtime.manifest.len();
    let controller = runtime.controller();

    ui::intro(&ctx, "Install");
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Provisioning {} ({} assets)", identity, assets));

    match controller.on_install().await {
        Ok(outcome) => {
            spinner.stop(&format!(
                "Provisioned {} ({} assets)",
                outcome.generation, outcome.assets
            ));
        }
        Err(e) => {
            spinner.stop_error(&format!("Provisioning {} failed", identity));
            return Err(e);
        }
    }

    ui::remark(&ctx, "Run `cachegate activate` to retire older generations");
    Ok(())
}
