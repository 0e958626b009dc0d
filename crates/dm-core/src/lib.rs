//! dm-core: Core abstractions and configuration for the desktop manager
//!
//! This crate provides the shared data model, error taxonomy, configuration
//! structures and capability traits used by the orchestrator and CLI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{DmError, RemoteError};
pub use types::{
    Configuration, ConfigurationName, DesktopJob, DesktopScope, DesktopSnapshot, JobId,
    LaunchDefaults, LaunchParameters,
};
