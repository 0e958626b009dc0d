//! Watch command implementation

use std::io::Write;

use anyhow::{Context as _, Result};
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use tokio::sync::broadcast::error::RecvError;

use dm_orchestrator::DesktopManager;

use crate::commands::print_notification;
use crate::context::{Context, Target};
use crate::output::{format_countdown, format_desktops, print_info};

const BAR_WIDTH: usize = 30;

/// Keep the desktop list on screen, refreshing until Ctrl+C
pub async fn watch_command(ctx: &Context, configuration: &str) -> Result<()> {
    let target = ctx.resolve(configuration).await?;
    let manager = ctx.manager();
    let mut notifications = manager
        .subscribe_notifications()
        .context("Manager has no notification channel")?;
    let mut snapshots = manager.subscribe_snapshot();
    let mut countdown = manager.subscribe_countdown();
    let mut cycles = manager.subscribe_cycles();

    manager.refresh_desktop_list(target.scope());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_message: Option<String> = None;

    redraw(&manager, &target, last_message.as_deref())?;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(&manager, &target, last_message.as_deref())?;
            }
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                redraw(&manager, &target, last_message.as_deref())?;
            }
            changed = countdown.changed() => {
                if changed.is_err() {
                    break;
                }
                let remaining = *countdown.borrow_and_update();
                draw_countdown(remaining, manager.settings().countdown_ticks)?;
            }
            message = notifications.recv() => {
                match message {
                    Ok(message) => {
                        last_message = Some(message);
                        redraw(&manager, &target, last_message.as_deref())?;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Skipped {} notifications", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    manager.close_view();
    println!();
    print_info("Stopped watching");
    Ok(())
}

fn redraw(manager: &DesktopManager, target: &Target, last_message: Option<&str>) -> Result<()> {
    let mut stdout = std::io::stdout();
    crossterm::execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

    println!(
        "Desktops in {} for {} (Ctrl+C to stop)",
        target.configuration.name, target.username
    );
    println!("{}", format_desktops(&manager.snapshot()));
    if let Some(message) = last_message {
        print_notification(message);
    }
    draw_countdown(manager.countdown(), manager.settings().countdown_ticks)
}

fn draw_countdown(remaining: u32, total: u32) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "\r{}", format_countdown(remaining, total, BAR_WIDTH))?;
    stdout.flush()?;
    Ok(())
}
