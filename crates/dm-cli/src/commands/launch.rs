//! Launch command implementation

use anyhow::{bail, Context as _, Result};

use dm_core::error::DmError;
use dm_core::types::LaunchParameters;
use dm_orchestrator::{DesktopManager, LaunchOutcome};

use crate::commands::print_notifications;
use crate::context::Context;
use crate::output::print_info;

/// Command-line edits to the configuration's launch defaults
#[derive(Debug, Clone, Default)]
pub struct LaunchOverrides {
    pub nodes: Option<u32>,
    pub hours: Option<u32>,
    pub ppn: Option<u32>,
    pub mem: Option<u32>,
    pub resolution: Option<String>,
}

impl LaunchOverrides {
    pub fn apply(&self, params: &mut LaunchParameters) {
        if let Some(nodes) = self.nodes {
            params.nodes = nodes;
        }
        if let Some(hours) = self.hours {
            params.hours = hours;
        }
        if let Some(ppn) = self.ppn {
            params.ppn = ppn;
        }
        if let Some(mem) = self.mem {
            params.mem = mem;
        }
        if let Some(resolution) = &self.resolution {
            params.resolution = resolution.clone();
        }
    }
}

/// Launch a desktop in `configuration`
pub async fn launch_command(
    ctx: &Context,
    configuration: &str,
    overrides: &LaunchOverrides,
) -> Result<()> {
    let target = ctx.resolve(configuration).await?;
    let manager = ctx.manager();
    let mut notifications = manager
        .subscribe_notifications()
        .context("Manager has no notification channel")?;

    manager.select_configuration(&target.configuration.flavor, &target.configuration);
    manager.update_launch_parameters(|params| overrides.apply(params));
    let (Some(configuration), Some(parameters)) =
        (manager.selected_configuration(), manager.launch_parameters())
    else {
        bail!("No configuration selected");
    };
    tracing::debug!("Launch parameters for {}: {:?}", configuration.name, parameters);

    let outcome = manager
        .launch_desktop(parameters, &configuration, &target.username)
        .await;
    manager.close_view();
    print_notifications(&mut notifications);

    match outcome {
        LaunchOutcome::Launched(job_id) => {
            print_info(&format!(
                "Viewer: {}",
                DesktopManager::show_desktop_path(&configuration.name, &job_id)
            ));
            Ok(())
        }
        LaunchOutcome::Denied { limit, running } => {
            bail!("{} of {} allowed desktops already running", running, limit)
        }
        LaunchOutcome::ListFailed(e) => {
            Err(DmError::from(e)).context("Could not check the desktop list")
        }
        LaunchOutcome::StartFailed(e) => Err(DmError::from(e)).context("Desktop launch failed"),
        LaunchOutcome::AlreadyInProgress => bail!("A launch is already in progress"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dm_core::types::LaunchDefaults;

    #[test]
    fn test_overrides_apply_only_given_fields() {
        let defaults = LaunchDefaults {
            hours: 4,
            ppn: 2,
            mem: 16,
        };
        let mut params = LaunchParameters::from_defaults(&defaults, 1, "1440x900");
        let overrides = LaunchOverrides {
            hours: Some(8),
            resolution: Some("1920x1080".to_string()),
            ..LaunchOverrides::default()
        };

        overrides.apply(&mut params);

        assert_eq!(params.nodes, 1);
        assert_eq!(params.hours, 8);
        assert_eq!(params.ppn, 2);
        assert_eq!(params.mem, 16);
        assert_eq!(params.resolution, "1920x1080");
    }
}
