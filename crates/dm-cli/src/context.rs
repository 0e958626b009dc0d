//! Shared command context
//!
//! Loads the config file, builds the HTTP client and resolves the session
//! and the configuration a command targets.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};

use dm_core::catalog::{find_configuration, ConfigurationTree, SessionInfo};
use dm_core::config::{self, ConfigFile};
use dm_core::error::DmError;
use dm_core::types::{Configuration, DesktopScope};
use dm_orchestrator::{DesktopManager, HttpJobClient};

/// A configuration resolved for the signed-in user
#[derive(Debug, Clone)]
pub struct Target {
    pub configuration: Configuration,
    pub username: String,
}

impl Target {
    pub fn scope(&self) -> DesktopScope {
        self.configuration.scope(self.username.clone())
    }
}

pub struct Context {
    config: ConfigFile,
    client: Arc<HttpJobClient>,
    user: Option<String>,
}

impl Context {
    /// Load configuration and build the Job API client
    pub fn new(config_path: Option<&Path>, user: Option<String>) -> Result<Self> {
        let config = config::load_or_default(config_path)
            .map_err(DmError::from)
            .context("Failed to load configuration")?;
        let client = HttpJobClient::new(&config.api)
            .map_err(DmError::from)
            .context("Invalid [api] configuration")?;

        Ok(Self {
            config,
            client: Arc::new(client),
            user,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Look up the session, refusing to continue without a credential
    pub async fn session(&self) -> Result<SessionInfo> {
        let session = self
            .client
            .session_info()
            .await
            .map_err(DmError::from)
            .with_context(|| format!("Failed to look up session at {}", self.client.base_url()))?;

        if !session.is_signed_in() {
            bail!("Not signed in: the session holds no certificate (check api.session_cookie)");
        }
        Ok(session)
    }

    /// Configurations accessible to the session's auth backend
    pub async fn configurations(&self, session: &SessionInfo) -> Result<ConfigurationTree> {
        let catalog = self
            .client
            .configurations()
            .await
            .map_err(DmError::from)
            .context("Failed to fetch configurations")?;
        Ok(catalog.accessible_for(&session.auth_backend_name))
    }

    /// Resolve a `facility|flavor` name for the current user
    pub async fn resolve(&self, full_name: &str) -> Result<Target> {
        let session = self.session().await?;
        let tree = self.configurations(&session).await?;

        let configuration = find_configuration(&tree, full_name)
            .cloned()
            .ok_or_else(|| anyhow!("Configuration {} not found or not accessible", full_name))?;

        let username = match &self.user {
            Some(user) => user.clone(),
            None => session.uid,
        };
        if username.is_empty() {
            bail!("No username in session; pass --user");
        }

        tracing::debug!("Resolved {} for {}", configuration.name, username);
        Ok(Target {
            configuration,
            username,
        })
    }

    /// End the server-side session, returning the server's message
    pub async fn sign_out(&self) -> Result<Option<String>> {
        self.client
            .end_session()
            .await
            .map_err(DmError::from)
            .with_context(|| format!("Failed to sign out at {}", self.client.base_url()))
    }

    /// A fresh manager over the HTTP client
    pub fn manager(&self) -> DesktopManager {
        DesktopManager::with_broadcast(self.client.clone(), self.config.manager_settings())
    }
}
