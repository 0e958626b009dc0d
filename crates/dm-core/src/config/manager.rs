//! Desktop manager configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};

/// On-disk configuration file, one table per section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Remote Job API settings
    pub api: ApiConfig,
    /// Launch admission and launch defaults
    pub desktops: DesktopsConfig,
    /// Reconciliation loop timing
    pub refresh: RefreshConfig,
}

impl ConfigFile {
    /// Project the file onto the settings the orchestrator consumes
    pub fn manager_settings(&self) -> ManagerSettings {
        ManagerSettings {
            max_desktops_allowed: self.desktops.max_desktops_allowed,
            default_nodes: self.desktops.default_nodes,
            default_resolution: self.desktops.default_resolution.clone(),
            tick_interval: self.refresh.tick_interval,
            countdown_ticks: self.refresh.countdown_ticks,
            request_timeout: self.api.request_timeout(),
        }
    }
}

/// Remote Job API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all endpoints are resolved against (with trailing slash)
    pub base_url: String,

    /// Session cookie sent with every request
    pub session_cookie: Option<String>,

    /// Upper bound on a single remote call, in seconds (0 disables)
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Endpoint paths relative to `base_url`
    pub endpoints: EndpointConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/".to_string(),
            session_cookie: None,
            request_timeout: Duration::from_secs(60),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ApiConfig {
    /// The configured request timeout, if enabled
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout.is_zero() {
            None
        } else {
            Some(self.request_timeout)
        }
    }
}

/// Endpoint paths of the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub start: String,
    pub list: String,
    pub stop: String,
    pub running: String,
    pub configurations: String,
    pub session_info: String,
    /// Invalidates the server-side session (sign-out)
    pub end_session: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            start: "execute/startserver".to_string(),
            list: "execute/listall".to_string(),
            stop: "execute/stop".to_string(),
            running: "execute/running".to_string(),
            configurations: "configurations".to_string(),
            session_info: "session_info".to_string(),
            end_session: "end_session".to_string(),
        }
    }
}

/// Launch admission and launch defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopsConfig {
    /// Highest allowed standing desktop count per (configuration, user).
    /// Zero or negative disables the limit.
    pub max_desktops_allowed: i64,

    /// Node count for fresh launch parameters
    pub default_nodes: u32,

    /// Resolution for fresh launch parameters
    pub default_resolution: String,
}

impl Default for DesktopsConfig {
    fn default() -> Self {
        Self {
            max_desktops_allowed: 0,
            default_nodes: 1,
            default_resolution: "1440x900".to_string(),
        }
    }
}

/// Reconciliation loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Interval between countdown ticks
    #[serde(rename = "tick_interval_ms", with = "duration_millis")]
    pub tick_interval: Duration,

    /// Number of ticks before the next cycle (also the countdown's full value)
    pub countdown_ticks: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(30),
            countdown_ticks: 100,
        }
    }
}

/// Runtime settings of a desktop manager instance
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerSettings {
    pub max_desktops_allowed: i64,
    pub default_nodes: u32,
    pub default_resolution: String,
    pub tick_interval: Duration,
    pub countdown_ticks: u32,
    pub request_timeout: Option<Duration>,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        ConfigFile::default().manager_settings()
    }
}

impl ManagerSettings {
    /// The active desktop limit, or `None` when unlimited
    pub fn desktop_limit(&self) -> Option<usize> {
        if self.max_desktops_allowed > 0 {
            Some(self.max_desktops_allowed as usize)
        } else {
            None
        }
    }

    /// Total idle wait between two cycles
    pub fn rearm_delay(&self) -> Duration {
        self.tick_interval * self.countdown_ticks
    }
}
