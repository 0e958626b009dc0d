//! HTTP Job API client tests
//!
//! Runs `HttpJobClient` against a fake service served by axum on an
//! ephemeral port.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use dm_core::config::{ApiConfig, ManagerSettings};
use dm_core::error::RemoteError;
use dm_core::traits::JobApi;
use dm_core::types::{ConfigurationName, JobId, LaunchDefaults, LaunchParameters};
use dm_orchestrator::{DesktopManager, HttpJobClient, LaunchOutcome};

type Params = HashMap<String, String>;

/// Requests seen by the fake service, as (route, configuration, query)
#[derive(Default)]
struct Recorder {
    requests: Mutex<Vec<(&'static str, String, Params)>>,
}

impl Recorder {
    fn record(&self, route: &'static str, configuration: String, query: Params) {
        self.requests.lock().push((route, configuration, query));
    }

    fn requests(&self, route: &str) -> Vec<(String, Params)> {
        self.requests
            .lock()
            .iter()
            .filter(|(r, _, _)| *r == route)
            .map(|(_, c, q)| (c.clone(), q.clone()))
            .collect()
    }
}

type AppState = State<Arc<Recorder>>;

async fn start(
    State(recorder): AppState,
    Path(configuration): Path<String>,
    Query(query): Query<Params>,
) -> Json<Value> {
    recorder.record("start", configuration, query);
    Json(json!([{ "jobid": 4242 }]))
}

async fn list(
    State(recorder): AppState,
    Path(configuration): Path<String>,
    Query(query): Query<Params>,
) -> Json<Value> {
    let rows = match query.get("username").map(String::as_str) {
        Some("alice") => json!([
            { "jobid": "101", "remainingWalltime": "01:59:00" },
            { "jobid": "102", "remainingWalltime": "00:10:00" }
        ]),
        Some("carol") => json!([
            { "jobid": "201", "remainingWalltime": "00:30:00" },
            { "state": "Q" },
            { "jobid": 202 }
        ]),
        _ => json!([]),
    };
    recorder.record("list", configuration, query);
    Json(rows)
}

async fn stop(
    State(recorder): AppState,
    Path(configuration): Path<String>,
    Query(query): Query<Params>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let job = query.get("jobidNumber").cloned().unwrap_or_default();
    recorder.record("stop", configuration, query);
    if job == "999" {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "qdel: unknown job".to_string()));
    }
    Ok(Json(json!([])))
}

async fn running(
    State(recorder): AppState,
    Path(configuration): Path<String>,
    Query(query): Query<Params>,
) -> Json<Value> {
    let rows = match query.get("jobidNumber").map(String::as_str) {
        Some("101") => json!([{ "jobid": "101", "state": "R" }]),
        Some("103") => json!([{ "jobid": "103" }, { "jobid": "103" }]),
        _ => json!([]),
    };
    recorder.record("running", configuration, query);
    Json(rows)
}

async fn session_info() -> Json<Value> {
    Json(json!({
        "session_id": "s-1",
        "has_certificate": "true",
        "uid": "alice",
        "auth_backend_name": "aaf",
        "email": "alice@example.org"
    }))
}

async fn configurations() -> Json<Value> {
    Json(json!({
        "siteA|gpu": {
            "authBackendNames": ["aaf"],
            "configurations": {
                "startserver": { "defaultParams": { "hours": "4", "ppn": "2", "mem": "16" } }
            }
        }
    }))
}

async fn end_session(State(recorder): AppState) -> Json<Value> {
    recorder.record("end_session", String::new(), Params::new());
    Json(json!({ "message": "Session s-1 invalidated" }))
}

async fn broken() -> &'static str {
    "not json"
}

async fn spawn_server() -> (String, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let app = Router::new()
        .route("/api/execute/startserver/in/:configuration/", get(start))
        .route("/api/execute/listall/in/:configuration/", get(list))
        .route("/api/execute/stop/in/:configuration/", get(stop))
        .route("/api/execute/running/in/:configuration/", get(running))
        .route("/api/session_info", get(session_info))
        .route("/api/configurations", get(configurations))
        .route("/api/end_session", get(end_session))
        .route("/api/broken/in/:configuration/", get(broken))
        .with_state(Arc::clone(&recorder));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake Job API");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake Job API failed");
    });

    (format!("http://{}/api/", addr), recorder)
}

fn client(base_url: &str) -> HttpJobClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    };
    HttpJobClient::new(&config).expect("Failed to build client")
}

fn gpu() -> ConfigurationName {
    ConfigurationName::from_parts("siteA", "gpu")
}

#[tokio::test]
async fn test_list_parses_rows() {
    let (base, recorder) = spawn_server().await;
    let client = client(&base);

    let jobs = client.list(&gpu(), "alice").await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].job_id, JobId::new("101"));
    assert_eq!(jobs[0].remaining_walltime.as_deref(), Some("01:59:00"));

    let empty = client.list(&gpu(), "bob").await.unwrap();
    assert!(empty.is_empty());

    let requests = recorder.requests("list");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "siteA|gpu");
    assert_eq!(requests[0].1.get("username").map(String::as_str), Some("alice"));
}

#[tokio::test]
async fn test_list_skips_unreadable_rows() {
    let (base, _recorder) = spawn_server().await;
    let client = client(&base);

    let jobs = client.list(&gpu(), "carol").await.unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.job_id.clone()).collect();
    assert_eq!(ids, vec![JobId::new("201"), JobId::new("202")]);
}

#[tokio::test]
async fn test_start_sends_parameters() {
    let (base, recorder) = spawn_server().await;
    let client = client(&base);

    let defaults = LaunchDefaults {
        hours: 4,
        ppn: 2,
        mem: 16,
    };
    let request =
        LaunchParameters::from_defaults(&defaults, 2, "1440x900").into_request(&gpu(), "alice");
    let job = client.start(&request).await.unwrap();
    assert_eq!(job.job_id, JobId::new("4242"));

    let requests = recorder.requests("start");
    assert_eq!(requests.len(), 1);
    let query = &requests[0].1;
    assert_eq!(query["username"], "alice");
    assert_eq!(query["nodes"], "2");
    assert_eq!(query["hours"], "4");
    assert_eq!(query["ppn"], "2");
    assert_eq!(query["mem"], "16");
    assert_eq!(query["resolution"], "1440x900");
}

#[tokio::test]
async fn test_is_running_requires_exactly_one_row() {
    let (base, _recorder) = spawn_server().await;
    let client = client(&base);

    assert!(client.is_running(&gpu(), &JobId::new("101")).await.unwrap());
    assert!(!client.is_running(&gpu(), &JobId::new("102")).await.unwrap());
    assert!(!client.is_running(&gpu(), &JobId::new("103")).await.unwrap());
}

#[tokio::test]
async fn test_stop_maps_server_errors() {
    let (base, recorder) = spawn_server().await;
    let client = client(&base);

    client.stop(&gpu(), &JobId::new("101")).await.unwrap();

    let err = client.stop(&gpu(), &JobId::new("999")).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Status {
            status: 500,
            body: "qdel: unknown job".to_string()
        }
    );

    let requests = recorder.requests("stop");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].1["jobidNumber"], "999");
}

#[tokio::test]
async fn test_malformed_and_unreachable() {
    let (base, _recorder) = spawn_server().await;
    let mut config = ApiConfig {
        base_url: base,
        ..ApiConfig::default()
    };
    config.endpoints.list = "broken".to_string();
    let client = HttpJobClient::new(&config).unwrap();

    let err = client.list(&gpu(), "alice").await.unwrap_err();
    assert!(matches!(err, RemoteError::Malformed(_)));

    // Nothing listens on port 9 of the loopback interface
    let client = self::client("http://127.0.0.1:9/api/");
    let err = client.list(&gpu(), "alice").await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn test_session_and_catalog() {
    let (base, _recorder) = spawn_server().await;
    let client = client(&base);

    let session = client.session_info().await.unwrap();
    assert!(session.is_signed_in());
    assert_eq!(session.uid, "alice");

    let catalog = client.configurations().await.unwrap();
    let tree = catalog.accessible_for(&session.auth_backend_name);
    let gpu = &tree["siteA"]["gpu"];
    assert_eq!(gpu.defaults.hours, 4);
    assert_eq!(gpu.defaults.mem, 16);
}

#[tokio::test]
async fn test_end_session() {
    let (base, recorder) = spawn_server().await;
    let client = client(&base);

    let message = client.end_session().await.unwrap();
    assert_eq!(message.as_deref(), Some("Session s-1 invalidated"));
    assert_eq!(recorder.requests("end_session").len(), 1);

    let mut config = ApiConfig {
        base_url: base,
        ..ApiConfig::default()
    };
    config.endpoints.end_session = "missing".to_string();
    let client = HttpJobClient::new(&config).unwrap();
    let err = client.end_session().await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_manager_over_http_enforces_limit() {
    let (base, recorder) = spawn_server().await;
    let settings = ManagerSettings {
        max_desktops_allowed: 2,
        ..ManagerSettings::default()
    };
    let manager = DesktopManager::with_broadcast(Arc::new(client(&base)), settings);

    let configuration = dm_core::types::Configuration::new(
        "siteA",
        "gpu",
        LaunchDefaults {
            hours: 4,
            ppn: 2,
            mem: 16,
        },
    );
    let params = LaunchParameters::from_defaults(&configuration.defaults, 1, "1440x900");
    let outcome = manager
        .launch_desktop(params, &configuration, "alice")
        .await;

    assert_eq!(
        outcome,
        LaunchOutcome::Denied {
            limit: 2,
            running: 2
        }
    );
    assert!(recorder.requests("start").is_empty());
}
