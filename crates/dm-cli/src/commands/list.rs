//! List command implementation

use std::time::Duration;

use anyhow::{bail, Context as _, Result};

use dm_orchestrator::RefreshStatus;

use crate::commands::print_notifications;
use crate::context::Context;
use crate::output::format_desktops;

/// Run one reconciliation cycle and print the resulting desktops
pub async fn list_command(ctx: &Context, configuration: &str) -> Result<()> {
    let target = ctx.resolve(configuration).await?;
    let manager = ctx.manager();
    let mut notifications = manager
        .subscribe_notifications()
        .context("Manager has no notification channel")?;
    let mut cycles = manager.subscribe_cycles();

    if manager.refresh_desktop_list(target.scope()) != RefreshStatus::Started {
        bail!("Could not start a refresh");
    }

    // Every remote call is already bounded by the request timeout; this only
    // guards against a configuration that disables it
    let limit = ctx
        .config()
        .api
        .request_timeout()
        .map(|t| t * 2)
        .unwrap_or(Duration::from_secs(300));
    tokio::time::timeout(limit, cycles.changed())
        .await
        .context("Timed out waiting for the desktop list")?
        .context("Refresh loop stopped")?;
    manager.close_view();

    // A cycle only notifies when the listing failed
    if !print_notifications(&mut notifications).is_empty() {
        bail!("Failed to list desktops in {}", target.configuration.name);
    }
    println!("{}", format_desktops(&manager.snapshot()));
    Ok(())
}
