//! Fetch command - intercept one request

use crate::cli::args::FetchArgs;
use crate::cli::commands::Runtime;
use crate::config::{Config, ConfigManager};
use crate::error::{CachegateError, CachegateResult};
use crate::fetch::{resolve_url, Request, Served};
use console::style;
use std::io::Write;
use tokio::fs;
use tracing::debug;

/// Execute the fetch command
pub async fn execute(
    args: FetchArgs,
    manager: &ConfigManager,
    config: &Config,
) -> CachegateResult<()> {
    let url = resolve_url(&config.origin.url, &args.url)?;
    let request = args
        .headers
        .into_iter()
        .fold(Request::new(&args.method, url), |request, (name, value)| {
            request.with_header(name, value)
        });

    let runtime = Runtime::load(manager, config).await?;
    let transport = runtime.transport.clone();
    let controller = runtime.controller();

    let mut response = match controller.adopt().await {
        Ok(()) => controller.on_fetch(request).await?,
        Err(CachegateError::GenerationMissing(name)) => {
            debug!("Generation {} not provisioned, passing through", name);
            transport.fetch(request).await?
        }
        Err(e) => return Err(e),
    };

    let served = match response.served() {
        Served::Cache => style(response.served().to_string()).green(),
        Served::Network => style(response.served().to_string()).cyan(),
    };
    eprintln!(
        "{} {} ({}, {})",
        style(response.status()).bold(),
        response.url(),
        response.kind(),
        served
    );

    let body = response.bytes()?;
    match args.output {
        Some(path) => {
            fs::write(&path, &body[..])
                .await
                .map_err(|e| CachegateError::io(format!("writing {}", path.display()), e))?;
        }
        None => {
            std::io::stdout()
                .write_all(&body)
                .map_err(|e| CachegateError::io("writing response body", e))?;
        }
    }

    controller.settle().await;
    Ok(())
}
