//! Generation backend HTTP client.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use reel_models::{Artifact, GenerateResponse, JobId, JobStatusResponse};

use crate::error::{ClientError, ClientResult};

/// Configuration for the job client.
///
/// Every remote operation carries a bounded timeout; the backend has been
/// observed to hang on overloaded artifact fetches, so nothing waits
/// indefinitely.
#[derive(Debug, Clone)]
pub struct JobClientConfig {
    /// Base URL of the generation backend
    pub base_url: String,
    /// Timeout for the start request
    pub start_timeout: Duration,
    /// Timeout for a single status poll
    pub status_timeout: Duration,
    /// Timeout for the artifact download
    pub artifact_timeout: Duration,
    /// Timeout for the cleanup request
    pub cleanup_timeout: Duration,
}

impl Default for JobClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            start_timeout: Duration::from_secs(30),
            status_timeout: Duration::from_secs(10),
            artifact_timeout: Duration::from_secs(120),
            cleanup_timeout: Duration::from_secs(10),
        }
    }
}

impl JobClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("REEL_API_URL").unwrap_or(defaults.base_url),
            start_timeout: env_secs("REEL_START_TIMEOUT", defaults.start_timeout),
            status_timeout: env_secs("REEL_STATUS_TIMEOUT", defaults.status_timeout),
            artifact_timeout: env_secs("REEL_ARTIFACT_TIMEOUT", defaults.artifact_timeout),
            cleanup_timeout: env_secs("REEL_CLEANUP_TIMEOUT", defaults.cleanup_timeout),
        }
    }
}

fn env_secs(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Client for the video generation backend.
pub struct JobClient {
    http: Client,
    config: JobClientConfig,
}

impl JobClient {
    /// Create a new job client.
    ///
    /// The underlying HTTP client carries no global timeout because it is
    /// shared with the long-lived log stream; each operation sets its own.
    pub fn new(config: JobClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(JobClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Shared HTTP client, reused by the log stream transport.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Submit generation input. Returns immediately with a job id; the job
    /// keeps running server-side.
    pub async fn start(&self, content: &str) -> ClientResult<GenerateResponse> {
        let url = format!("{}/generate_video_stream", self.config.base_url);

        debug!("Starting generation job at {}", url);

        let response = self
            .http
            .post(&url)
            .timeout(self.config.start_timeout)
            .json(&json!({ "content": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::RequestFailed(format!(
                "start returned {}: {}",
                status, body
            )));
        }

        let started: GenerateResponse = response.json().await?;
        debug!("Job started: {}", started.job_id);
        Ok(started)
    }

    /// Fetch the current job status. Idempotent; safe to call concurrently
    /// with the push channel.
    pub async fn get_status(&self, job_id: &JobId) -> ClientResult<JobStatusResponse> {
        let url = format!("{}/job_status/{}", self.config.base_url, job_id);

        let response = self
            .http
            .get(&url)
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::RequestFailed(format!(
                "status returned {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch the finished job's artifact.
    ///
    /// The endpoint serves either the encoded video directly or a JSON body
    /// carrying a URL, distinguished by the response content type. Only
    /// valid once the job status is complete.
    pub async fn get_artifact(&self, job_id: &JobId) -> ClientResult<Artifact> {
        let url = format!("{}/get_video/{}", self.config.base_url, job_id);

        let response = self
            .http
            .get(&url)
            .timeout(self.config.artifact_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::RequestFailed(format!(
                "artifact fetch returned {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("application/json") {
            let body: Value = response.json().await?;

            if let Some(error) = body.get("error").and_then(Value::as_str) {
                return Err(ClientError::RequestFailed(format!(
                    "artifact fetch failed: {}",
                    error
                )));
            }

            return body
                .get("url")
                .and_then(Value::as_str)
                .map(|url| Artifact::Remote(url.to_string()))
                .ok_or_else(|| {
                    ClientError::InvalidResponse("artifact response carries neither url nor error".to_string())
                });
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} byte artifact for job {}", bytes.len(), job_id);
        Ok(Artifact::Media(bytes))
    }

    /// Release server-side resources for a finished job. Best effort: a
    /// missing-resource response means the job was already cleaned up.
    pub async fn release(&self, job_id: &JobId) -> ClientResult<()> {
        let url = format!("{}/cleanup/{}", self.config.base_url, job_id);

        let response = self
            .http
            .delete(&url)
            .timeout(self.config.cleanup_timeout)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                warn!("Cleanup for job {} found nothing to release", job_id);
                Ok(())
            }
            status => Err(ClientError::RequestFailed(format!(
                "cleanup returned {}",
                status
            ))),
        }
    }
}
