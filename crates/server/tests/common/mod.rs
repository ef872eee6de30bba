//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, so jobs run end to end without ffmpeg
//! or network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use montage_core::{
    testing::{MockEngine, MockStager},
    Config, FetchConfig, HttpAssetStager, InMemoryJobStore, JobConfig, JobPipeline, RenderConfig,
};

/// Re-export fixtures for test convenience
pub use montage_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_job_submission() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "duration": 5.0, "width": 1280, "height": 720
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock engine - control renders and probes
    pub engine: Arc<MockEngine>,
    /// Mock stager - records staged jobs
    pub stager: Arc<MockStager>,
    /// Temporary directory for work and output files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Like [`new`](Self::new), but also reports the download pool and rate
    /// limiter of a real stager built from `fetch`. Jobs still use the mocks.
    pub fn with_fetcher(fetch: FetchConfig) -> Self {
        Self::build(Some(fetch))
    }

    fn build(fetch: Option<FetchConfig>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let engine = Arc::new(MockEngine::new());
        let stager = Arc::new(MockStager::new());

        let jobs = JobConfig::new(temp_dir.path().join("work"), temp_dir.path().join("out"));
        let config = Config {
            jobs: jobs.clone(),
            ..Config::default()
        };

        let pipeline = JobPipeline::new(
            engine.clone(),
            stager.clone(),
            Arc::new(InMemoryJobStore::new()),
            RenderConfig::default(),
            jobs,
        );

        let mut state = montage_server::state::AppState::new(config, pipeline);
        if let Some(fetch) = fetch {
            let fetcher = HttpAssetStager::new(fetch).expect("Failed to create stager");
            state = state.with_fetcher(Arc::new(fetcher));
        }
        let state = Arc::new(state);
        let router = montage_server::api::create_router(state);

        Self {
            router,
            engine,
            stager,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a DELETE request with JSON body.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> TestResponse {
        self.request("DELETE", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Fetch the raw metrics exposition.
    pub async fn metrics_text(&self) -> (StatusCode, String) {
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_for_terminal(&self, id: &str) -> Value {
        for _ in 0..200 {
            let response = self.get(&format!("/api/v1/jobs/{}", id)).await;
            let status = response.body["status"].as_str().unwrap_or_default();
            if matches!(status, "completed" | "failed" | "cancelled") {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal status", id);
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
