//! HTTP implementation of the Job API
//!
//! Every job call is a `GET {base}{endpoint}/in/{configuration}/` with the
//! remaining arguments as query parameters. Responses are JSON arrays of
//! flat objects.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use dm_core::catalog::{ConfigurationCatalog, SessionInfo};
use dm_core::config::{ApiConfig, EndpointConfig};
use dm_core::error::{ConfigError, RemoteError};
use dm_core::traits::{Ack, JobApi};
use dm_core::types::{ConfigurationName, JobId, JobRecord, LaunchRequest};

type Row = Map<String, Value>;

/// Job API client over HTTP
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    http: reqwest::Client,
    base: Url,
    endpoints: EndpointConfig,
}

impl HttpJobClient {
    /// Build a client from the `[api]` configuration table
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        let base = normalize_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ConfigError::Invalid(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            endpoints: config.endpoints.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Look up the caller's session
    pub async fn session_info(&self) -> Result<SessionInfo, RemoteError> {
        let url = self.url(&self.endpoints.session_info, None)?;
        self.get_json(url, &[]).await
    }

    /// Fetch the full configuration catalog
    pub async fn configurations(&self) -> Result<ConfigurationCatalog, RemoteError> {
        let url = self.url(&self.endpoints.configurations, None)?;
        let body: Value = self.get_json(url, &[]).await?;
        ConfigurationCatalog::from_json(body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    /// Invalidate the server-side session
    ///
    /// Returns the server's status message, if it sent one.
    pub async fn end_session(&self) -> Result<Option<String>, RemoteError> {
        let url = self.url(&self.endpoints.end_session, None)?;
        let body: Value = self.get_json(url, &[]).await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn url(
        &self,
        endpoint: &str,
        configuration: Option<&ConfigurationName>,
    ) -> Result<Url, RemoteError> {
        let mut url = self
            .base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| RemoteError::Transport(format!("Invalid endpoint {}: {}", endpoint, e)))?;

        if let Some(configuration) = configuration {
            // `|` in the full name must not reach the server unescaped
            let path = format!(
                "{}/in/{}/",
                url.path().trim_end_matches('/'),
                urlencoding::encode(configuration.as_str())
            );
            url.set_path(&path);
        }

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    async fn get_rows(
        &self,
        endpoint: &str,
        configuration: &ConfigurationName,
        query: &[(&str, String)],
    ) -> Result<Vec<Row>, RemoteError> {
        let url = self.url(endpoint, Some(configuration))?;
        self.get_json(url, query).await
    }
}

#[async_trait]
impl JobApi for HttpJobClient {
    async fn start(&self, request: &LaunchRequest) -> Result<JobRecord, RemoteError> {
        let params = &request.parameters;
        let query = [
            ("username", request.username.clone()),
            ("nodes", params.nodes.to_string()),
            ("hours", params.hours.to_string()),
            ("ppn", params.ppn.to_string()),
            ("mem", params.mem.to_string()),
            ("resolution", params.resolution.clone()),
        ];

        let rows = self
            .get_rows(&self.endpoints.start, &request.configuration, &query)
            .await?;
        let first = rows
            .first()
            .ok_or_else(|| RemoteError::Malformed("start returned no job".to_string()))?;
        job_record(first)
    }

    async fn list(
        &self,
        configuration: &ConfigurationName,
        username: &str,
    ) -> Result<Vec<JobRecord>, RemoteError> {
        let query = [("username", username.to_string())];
        let rows = self
            .get_rows(&self.endpoints.list, configuration, &query)
            .await?;

        // Unreadable rows are skipped, not fatal
        let jobs = rows
            .iter()
            .filter_map(|row| match job_record(row) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!("Skipping desktop row in {}: {}", configuration, e);
                    None
                }
            })
            .collect();
        Ok(jobs)
    }

    async fn stop(
        &self,
        configuration: &ConfigurationName,
        job_id: &JobId,
    ) -> Result<Ack, RemoteError> {
        let query = [("jobidNumber", job_id.to_string())];
        let url = self.url(&self.endpoints.stop, Some(configuration))?;
        // Only the status matters; the body is whatever the scheduler printed
        let _: Value = self.get_json(url, &query).await?;
        Ok(Ack)
    }

    async fn is_running(
        &self,
        configuration: &ConfigurationName,
        job_id: &JobId,
    ) -> Result<bool, RemoteError> {
        let query = [("jobidNumber", job_id.to_string())];
        let rows = self
            .get_rows(&self.endpoints.running, configuration, &query)
            .await?;
        Ok(rows.len() == 1)
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url, ConfigError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingField("api.base_url".to_string()));
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash)
        .map_err(|e| ConfigError::Invalid(format!("Invalid base_url {}: {}", trimmed, e)))
}

fn job_record(row: &Row) -> Result<JobRecord, RemoteError> {
    let job_id = match row.get("jobid") {
        Some(Value::String(s)) if !s.is_empty() => JobId::new(s.as_str()),
        Some(Value::Number(n)) => JobId::new(n.to_string()),
        other => {
            return Err(RemoteError::Malformed(format!(
                "missing or invalid jobid: {:?}",
                other
            )))
        }
    };

    let remaining_walltime = match row.get("remainingWalltime") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    Ok(JobRecord {
        job_id,
        remaining_walltime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> HttpJobClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        HttpJobClient::new(&config).unwrap()
    }

    #[test]
    fn test_job_url_layout() {
        let client = client("https://hpc.example.org/api");
        let url = client
            .url("execute/listall", Some(&ConfigurationName::new("siteA|gpu")))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://hpc.example.org/api/execute/listall/in/siteA%7Cgpu/"
        );

        let url = client.url("session_info", None).unwrap();
        assert_eq!(url.as_str(), "https://hpc.example.org/api/session_info");
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            HttpJobClient::new(&config),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_job_record_accepts_string_and_number_ids() {
        let row = json!({ "jobid": "101", "remainingWalltime": "01:59:00" });
        let record = job_record(row.as_object().unwrap()).unwrap();
        assert_eq!(record.job_id, JobId::new("101"));
        assert_eq!(record.remaining_walltime.as_deref(), Some("01:59:00"));

        let row = json!({ "jobid": 102 });
        let record = job_record(row.as_object().unwrap()).unwrap();
        assert_eq!(record.job_id, JobId::new("102"));
        assert!(record.remaining_walltime.is_none());

        let row = json!({ "state": "R" });
        assert!(matches!(
            job_record(row.as_object().unwrap()),
            Err(RemoteError::Malformed(_))
        ));
    }
}
