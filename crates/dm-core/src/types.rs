//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Full name of a configuration, in the form `facility|flavor`
///
/// This is the key every Job API call is scoped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationName(pub String);

impl ConfigurationName {
    /// Create a new configuration name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Build the full name from its facility and flavor parts
    pub fn from_parts(facility: &str, flavor: &str) -> Self {
        Self(format!("{}|{}", facility, flavor))
    }

    /// Split into `(facility, flavor)`, if the name contains a separator
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('|')
    }

    /// Get the raw name string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConfigurationName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConfigurationName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Scheduler-assigned job identifier
///
/// Opaque to the desktop manager; stable for the lifetime of the job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for JobId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// The (configuration, user) pair that list/refresh operations are scoped by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesktopScope {
    /// Configuration full name
    pub configuration: ConfigurationName,
    /// Cluster username
    pub username: String,
}

impl DesktopScope {
    /// Create a new scope
    pub fn new(configuration: impl Into<ConfigurationName>, username: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            username: username.into(),
        }
    }
}

impl fmt::Display for DesktopScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.configuration)
    }
}

/// Launch defaults published by a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDefaults {
    /// Walltime in hours
    pub hours: u32,
    /// Processors per node
    pub ppn: u32,
    /// Memory (in the unit the scheduler expects)
    pub mem: u32,
}

/// A (facility, flavor) deployment target the user is authorized against
///
/// Owned by the configuration catalog; the orchestrator only references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Full name (`facility|flavor`), used in all remote calls
    pub name: ConfigurationName,
    /// Facility part of the name
    pub facility: String,
    /// Flavor part of the name
    pub flavor: String,
    /// Default launch parameters
    pub defaults: LaunchDefaults,
}

impl Configuration {
    /// Create a configuration from its facility, flavor and defaults
    pub fn new(facility: &str, flavor: &str, defaults: LaunchDefaults) -> Self {
        Self {
            name: ConfigurationName::from_parts(facility, flavor),
            facility: facility.to_string(),
            flavor: flavor.to_string(),
            defaults,
        }
    }

    /// Scope this configuration to a user
    pub fn scope(&self, username: impl Into<String>) -> DesktopScope {
        DesktopScope::new(self.name.clone(), username)
    }
}

/// Launch parameters the user edits before submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchParameters {
    /// Node count
    pub nodes: u32,
    /// Walltime in hours
    pub hours: u32,
    /// Processors per node
    pub ppn: u32,
    /// Memory
    pub mem: u32,
    /// Desktop resolution, e.g. `1440x900`
    pub resolution: String,
}

impl LaunchParameters {
    /// Fresh parameters for a configuration
    pub fn from_defaults(defaults: &LaunchDefaults, nodes: u32, resolution: &str) -> Self {
        Self {
            nodes,
            hours: defaults.hours,
            ppn: defaults.ppn,
            mem: defaults.mem,
            resolution: resolution.to_string(),
        }
    }

    /// Attach the configuration/user identity for submission
    pub fn into_request(self, configuration: &ConfigurationName, username: &str) -> LaunchRequest {
        LaunchRequest {
            parameters: self,
            configuration: configuration.clone(),
            username: username.to_string(),
        }
    }
}

/// Launch parameters merged with the identity they are submitted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// User-edited parameters
    pub parameters: LaunchParameters,
    /// Configuration full name
    pub configuration: ConfigurationName,
    /// Cluster username
    pub username: String,
}

/// A desktop job as reported by the list/start operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Scheduler job id
    pub job_id: JobId,
    /// Remaining walltime as reported by the server
    pub remaining_walltime: Option<String>,
}

impl JobRecord {
    /// Create a record with no walltime information
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            remaining_walltime: None,
        }
    }

    /// Attach a remaining walltime
    pub fn with_walltime(mut self, walltime: impl Into<String>) -> Self {
        self.remaining_walltime = Some(walltime.into());
        self
    }

    /// Combine with a running-status check result
    pub fn with_status(self, running: bool) -> DesktopJob {
        DesktopJob {
            job_id: self.job_id,
            remaining_walltime: self.remaining_walltime,
            running,
        }
    }
}

/// A desktop job with its resolved running status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopJob {
    /// Scheduler job id
    pub job_id: JobId,
    /// Remaining walltime as reported by the server
    pub remaining_walltime: Option<String>,
    /// Whether the status check found the job running
    pub running: bool,
}

/// The desktops observed in one reconciliation cycle
///
/// Rebuilt from scratch every cycle. Entry order follows status-check
/// completion order, not listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSnapshot {
    jobs: Vec<DesktopJob>,
}

impl DesktopSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resolved job
    pub fn push(&mut self, job: DesktopJob) {
        self.jobs.push(job);
    }

    /// Remove all jobs
    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Jobs in completion order
    pub fn jobs(&self) -> &[DesktopJob] {
        &self.jobs
    }

    /// Find a job by id
    pub fn get(&self, job_id: &JobId) -> Option<&DesktopJob> {
        self.jobs.iter().find(|j| &j.job_id == job_id)
    }

    /// Number of jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl FromIterator<DesktopJob> for DesktopSnapshot {
    fn from_iter<I: IntoIterator<Item = DesktopJob>>(iter: I) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}
