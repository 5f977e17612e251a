//! Deploy command - register a controller through the host

use crate::cli::commands::activate::report;
use crate::cli::commands::Runtime;
use crate::config::{Config, ConfigManager};
use crate::controller::{Host, Registration};
use crate::error::CachegateResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the deploy command
pub async fn execute(manager: &ConfigManager, config: &Config) -> CachegateResult<()> {
    let ctx = UiContext::detect();
    let runtime = Runtime::load(manager, config).await?;
    let host = Host::new(runtime.transport.clone());
    let identity = runtime.identity.clone();
    let assets = runtime.manifest.len();

    ui::intro(&ctx, "Deploy");
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Installing {} ({} assets)", identity, assets));

    let registration = match host.register(runtime.controller()).await {
        Ok(registration) => registration,
        Err(e) => {
            spinner.stop_error(&format!("Deploy of {} failed", identity));
            return Err(e);
        }
    };

    match registration {
        Registration::Active { identity, retired } => {
            spinner.stop(&format!("Installed {}", identity));
            report(&ctx, &retired);
            if host.clients_claimed() {
                ui::step_ok(&ctx, "Clients claimed");
            }
            ui::outro_success(&ctx, &format!("{} is active", identity));
        }
        Registration::Waiting { identity } => {
            spinner.stop(&format!("Installed {}", identity));
            ui::outro_warn(&ctx, &format!("{} is waiting for activation", identity));
        }
    }
    Ok(())
}
