//! Configuration catalog and session lookup models
//!
//! The remote service publishes every configuration it knows about, keyed by
//! `facility|flavor`. A user only sees the entries whose `authBackendNames`
//! contain the backend they signed in with, regrouped as
//! `facility -> flavor -> Configuration`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::types::{Configuration, LaunchDefaults};

/// Configurations grouped by facility, then flavor
pub type ConfigurationTree = BTreeMap<String, BTreeMap<String, Configuration>>;

/// Session state reported by the remote service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default)]
    pub session_id: String,
    /// `"true"` once a signed certificate is attached to the session
    #[serde(default)]
    pub has_certificate: String,
    /// Cluster username
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub auth_backend_name: String,
    #[serde(default)]
    pub email: String,
}

impl SessionInfo {
    /// Whether the session holds a valid credential
    pub fn is_signed_in(&self) -> bool {
        self.has_certificate == "true"
    }
}

/// One raw catalog entry
#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "authBackendNames")]
    auth_backend_names: Option<Vec<String>>,
    #[serde(default)]
    configurations: Value,
}

/// The full configuration catalog as published by the service
#[derive(Debug, Clone, Default)]
pub struct ConfigurationCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ConfigurationCatalog {
    /// Parse the catalog from its JSON body
    pub fn from_json(value: Value) -> Result<Self, CatalogError> {
        let entries: BTreeMap<String, CatalogEntry> = serde_json::from_value(value)?;
        Ok(Self { entries })
    }

    /// Number of entries, accessible or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configurations the given auth backend may use
    ///
    /// Entries with a malformed key or unreadable launch defaults are skipped.
    pub fn accessible_for(&self, auth_backend_name: &str) -> ConfigurationTree {
        let mut tree = ConfigurationTree::new();

        for (key, entry) in &self.entries {
            let Some(backends) = &entry.auth_backend_names else {
                continue;
            };
            if !backends.iter().any(|b| b == auth_backend_name) {
                continue;
            }

            match build_configuration(key, &entry.configurations) {
                Ok(configuration) => {
                    tree.entry(configuration.facility.clone())
                        .or_default()
                        .insert(configuration.flavor.clone(), configuration);
                }
                Err(e) => {
                    tracing::warn!("Skipping catalog entry {}: {}", key, e);
                }
            }
        }

        tree
    }
}

/// Find a configuration by full name in a grouped tree
pub fn find_configuration<'a>(tree: &'a ConfigurationTree, full_name: &str) -> Option<&'a Configuration> {
    let (facility, flavor) = full_name.split_once('|')?;
    tree.get(facility)?.get(flavor)
}

fn build_configuration(key: &str, body: &Value) -> Result<Configuration, CatalogError> {
    let (facility, flavor) = key
        .split_once('|')
        .ok_or_else(|| CatalogError::InvalidKey(key.to_string()))?;

    let params = &body["startserver"]["defaultParams"];
    let defaults = LaunchDefaults {
        hours: read_default(key, params, "hours")?,
        ppn: read_default(key, params, "ppn")?,
        mem: read_default(key, params, "mem")?,
    };

    Ok(Configuration::new(facility, flavor, defaults))
}

/// Read an integer default that may be published as a number or a string.
/// Strings contribute their leading digits only, so `"16gb"` reads as 16.
fn read_default(key: &str, params: &Value, field: &'static str) -> Result<u32, CatalogError> {
    let invalid = |value: String| CatalogError::InvalidDefault {
        key: key.to_string(),
        field,
        value,
    };

    match &params[field] {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(n.to_string())),
        Value::String(s) => {
            let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().map_err(|_| invalid(s.clone()))
        }
        other => Err(invalid(other.to_string())),
    }
}
