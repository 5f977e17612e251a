//! Activate command - retire stale generations

use crate::cli::commands::Runtime;
use crate::config::{Config, ConfigManager};
use crate::controller::RetireReport;
use crate::error::CachegateResult;
use crate::ui::{self, UiContext};

/// Execute the activate command
pub async fn execute(manager: &ConfigManager, config: &Config) -> CachegateResult<()> {
    let ctx = UiContext::detect();
    let controller = Runtime::load(manager, config).await?.controller();

    controller.adopt().await?;
    let outcome = controller.on_activate().await?;

    ui::intro(&ctx, "Activate");
    report(&ctx, &outcome.retired);

    if outcome.retired.is_clean() {
        ui::outro_success(&ctx, &format!("{} is active", controller.identity()));
    } else {
        ui::outro_warn(
            &ctx,
            &format!(
                "{} is active, {} stale generation(s) remain",
                controller.identity(),
                outcome.retired.failures.len()
            ),
        );
    }
    Ok(())
}

/// Print what retirement removed and what it could not
pub(crate) fn report(ctx: &UiContext, retired: &RetireReport) {
    if retired.deleted.is_empty() && retired.failures.is_empty() {
        ui::step_info(ctx, "No stale generations");
    }
    for name in &retired.deleted {
        ui::step_ok_detail(ctx, "Retired", name);
    }
    for failure in &retired.failures {
        ui::step_warn(ctx, &failure.to_string());
    }
}
