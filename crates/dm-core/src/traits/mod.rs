//! Core trait definitions

mod confirm;
mod job_api;
mod notify;

pub use confirm::{ConfirmDeletion, DeletionPrompt};
pub use job_api::{Ack, JobApi};
pub use notify::NotificationSink;
