//! Launch admission
//!
//! A launch lists the user's desktops first and only submits when the
//! standing count is below the configured limit. At most one launch runs at a
//! time; the gate is released on every exit path.

use std::sync::Arc;

use dm_core::error::RemoteError;
use dm_core::types::{Configuration, JobId, LaunchParameters};

use crate::manager::Shared;
use crate::reconcile;

/// How a launch attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The job was submitted and a refresh was requested
    Launched(JobId),
    /// The standing count already reached the limit; nothing was submitted
    Denied { limit: usize, running: usize },
    /// The pre-launch listing failed
    ListFailed(RemoteError),
    /// The start call failed
    StartFailed(RemoteError),
    /// Another launch was in flight; nothing happened
    AlreadyInProgress,
}

impl LaunchOutcome {
    pub fn is_launched(&self) -> bool {
        matches!(self, LaunchOutcome::Launched(_))
    }
}

/// Message shown when a launch would exceed `limit`
pub fn limit_message(limit: usize) -> String {
    let noun = if limit == 1 {
        "running desktop"
    } else {
        "running desktops"
    };
    format!(
        "Could not start desktop because it would exceed the limit of {} {}.",
        limit, noun
    )
}

pub(crate) async fn launch_desktop(
    shared: &Arc<Shared>,
    parameters: LaunchParameters,
    configuration: &Configuration,
    username: &str,
) -> LaunchOutcome {
    let Some(guard) = shared.admission.try_begin() else {
        tracing::debug!("Launch already in progress, ignoring request");
        return LaunchOutcome::AlreadyInProgress;
    };
    tracing::debug!(
        "Launch attempt {} for {}@{}",
        guard.attempt(),
        username,
        configuration.name
    );

    shared.notify("Starting desktop...");

    let name = &configuration.name;
    let existing = match shared.remote(shared.api.list(name, username)).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!("Pre-launch listing failed for {}: {}", name, e);
            shared.notify("Desktop failed to launch! (error checking desktop list)");
            return LaunchOutcome::ListFailed(e);
        }
    };

    if let Some(limit) = shared.settings.desktop_limit() {
        if existing.len() >= limit {
            shared.notify(&limit_message(limit));
            return LaunchOutcome::Denied {
                limit,
                running: existing.len(),
            };
        }
    }

    let request = parameters.into_request(name, username);
    match shared.remote(shared.api.start(&request)).await {
        Ok(job) => {
            shared.notify(&format!("Desktop #{} launched successfully!", job.job_id));
            reconcile::request_refresh(shared, configuration.scope(username));
            LaunchOutcome::Launched(job.job_id)
        }
        Err(e) => {
            tracing::warn!("Start failed for {}: {}", name, e);
            shared.notify("Desktop failed to launch!");
            LaunchOutcome::StartFailed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_message_wording() {
        assert_eq!(
            limit_message(1),
            "Could not start desktop because it would exceed the limit of 1 running desktop."
        );
        assert_eq!(
            limit_message(2),
            "Could not start desktop because it would exceed the limit of 2 running desktops."
        );
    }
}
