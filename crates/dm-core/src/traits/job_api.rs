//! Job API capability

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::types::{ConfigurationName, JobId, JobRecord, LaunchRequest};

/// Acknowledgement of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

/// The four remote operations of the cluster job service
///
/// Every call is scoped by a configuration full name and, where relevant, a
/// user or job id. Implementations must not retry; callers decide whether a
/// failure is surfaced or ignored.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Submit a new desktop job
    async fn start(&self, request: &LaunchRequest) -> Result<JobRecord, RemoteError>;

    /// List the user's desktops in a configuration (may be empty)
    async fn list(
        &self,
        configuration: &ConfigurationName,
        username: &str,
    ) -> Result<Vec<JobRecord>, RemoteError>;

    /// Stop a desktop job
    async fn stop(&self, configuration: &ConfigurationName, job_id: &JobId)
        -> Result<Ack, RemoteError>;

    /// Whether the job is currently running
    async fn is_running(
        &self,
        configuration: &ConfigurationName,
        job_id: &JobId,
    ) -> Result<bool, RemoteError>;
}
