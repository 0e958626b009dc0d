//! Confirmed deletion

use std::sync::Arc;

use dm_core::error::RemoteError;
use dm_core::traits::{ConfirmDeletion, DeletionPrompt};
use dm_core::types::{DesktopScope, JobId};

use crate::manager::Shared;
use crate::reconcile;

/// How a deletion request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user said no; nothing was sent
    Declined,
    Deleted(JobId),
    Failed(RemoteError),
}

pub(crate) async fn stop_desktop(
    shared: &Arc<Shared>,
    scope: &DesktopScope,
    job_id: &JobId,
    confirm: &dyn ConfirmDeletion,
) -> DeleteOutcome {
    let prompt = DeletionPrompt::for_job(job_id);
    if !confirm.confirm(&prompt).await {
        tracing::debug!("Deletion of desktop #{} declined", job_id);
        return DeleteOutcome::Declined;
    }

    shared.notify(&format!("Deleting desktop #{}...", job_id));

    match shared
        .remote(shared.api.stop(&scope.configuration, job_id))
        .await
    {
        Ok(_) => {
            shared.deleted.lock().push(job_id.clone());
            shared.notify("Desktop deleted!");
            reconcile::request_refresh(shared, scope.clone());
            DeleteOutcome::Deleted(job_id.clone())
        }
        Err(e) => {
            tracing::warn!("Stop failed for desktop #{} in {}: {}", job_id, scope, e);
            shared.notify("Could not delete desktop!");
            DeleteOutcome::Failed(e)
        }
    }
}
