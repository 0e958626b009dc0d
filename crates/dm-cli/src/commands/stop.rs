//! Stop command implementation

use std::io::Write;

use anyhow::{Context as _, Result};
use async_trait::async_trait;

use dm_core::error::DmError;
use dm_core::traits::{ConfirmDeletion, DeletionPrompt};
use dm_core::types::JobId;
use dm_orchestrator::DeleteOutcome;

use crate::commands::print_notifications;
use crate::context::Context;
use crate::output::print_warning;

/// Asks on the terminal; anything but `y`/`yes` declines
pub struct StdinConfirm;

#[async_trait]
impl ConfirmDeletion for StdinConfirm {
    async fn confirm(&self, prompt: &DeletionPrompt) -> bool {
        let question = format!("{} [y/N] ", prompt.content);
        tokio::task::spawn_blocking(move || ask(&question))
            .await
            .unwrap_or(false)
    }
}

fn ask(question: &str) -> bool {
    print!("{}", question);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    is_yes(&input)
}

fn is_yes(input: &str) -> bool {
    let answer = input.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Confirms without asking (`--yes`)
struct AssumeYes;

#[async_trait]
impl ConfirmDeletion for AssumeYes {
    async fn confirm(&self, _prompt: &DeletionPrompt) -> bool {
        true
    }
}

/// Delete a desktop after confirmation
pub async fn stop_command(ctx: &Context, configuration: &str, job_id: &str, yes: bool) -> Result<()> {
    let target = ctx.resolve(configuration).await?;
    let manager = ctx.manager();
    let mut notifications = manager
        .subscribe_notifications()
        .context("Manager has no notification channel")?;

    let job_id = JobId::new(job_id);
    let confirm: &dyn ConfirmDeletion = if yes {
        &AssumeYes as &dyn ConfirmDeletion
    } else {
        &StdinConfirm
    };
    let outcome = manager.stop_desktop(&target.scope(), &job_id, confirm).await;
    manager.close_view();
    print_notifications(&mut notifications);

    match outcome {
        DeleteOutcome::Declined => {
            print_warning("Aborted");
            Ok(())
        }
        DeleteOutcome::Deleted(_) => Ok(()),
        DeleteOutcome::Failed(e) => {
            Err(DmError::from(e)).with_context(|| format!("Failed to delete desktop #{}", job_id))
        }
    }
}
