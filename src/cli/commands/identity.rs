//! Identity command - print the current cache identity

use crate::cli::commands::current_identity;
use crate::config::{Config, ConfigManager};
use crate::error::CachegateResult;

/// Execute the identity command
pub async fn execute(manager: &ConfigManager, config: &Config) -> CachegateResult<()> {
    let (identity, _) = current_identity(manager, config).await?;
    println!("{}", identity);
    Ok(())
}
