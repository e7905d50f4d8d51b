//! Client for the security server's HTTP API.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::{fs::create_dir_all, io::AsyncWriteExt};
use vigil_bridge::events::ViolationRecord;

/// Errors returned by [`ApiClient`] calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("{0}")]
    Rejected(String),
    /// A downloaded export could not be written to disk.
    #[error("failed to save export: {0}")]
    Io(#[from] std::io::Error),
}

/// The `{status, message}` body most endpoints answer with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub status: String,
    pub message: Option<String>,
}

impl Envelope {
    /// Turns a non-`success` status into [`ApiError::Rejected`], using
    /// `fallback` when the server gave no message.
    pub fn into_result(self, fallback: &str) -> Result<(), ApiError> {
        if self.status == "success" {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                self.message.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

/// Body of `GET /api/system/health`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub status: String,
    pub issues: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `GET /api/status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerStatus {
    pub monitoring: bool,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        Ok(request.send().await?.json::<T>().await?)
    }

    pub async fn start_monitoring(&self) -> Result<(), ApiError> {
        Self::json::<Envelope>(self.client.post(self.url("/api/start_monitoring")))
            .await?
            .into_result("Failed to start monitoring")
    }

    pub async fn stop_monitoring(&self) -> Result<(), ApiError> {
        Self::json::<Envelope>(self.client.post(self.url("/api/stop_monitoring")))
            .await?
            .into_result("Failed to stop monitoring")
    }

    pub async fn violations(&self, limit: u32) -> Result<Vec<ViolationRecord>, ApiError> {
        Self::json(
            self.client
                .get(self.url("/api/violations"))
                .query(&[("limit", limit)]),
        )
        .await
    }

    pub async fn clear_violations(&self) -> Result<(), ApiError> {
        Self::json::<Envelope>(self.client.delete(self.url("/api/violations/clear")))
            .await?
            .into_result("Failed to clear violations")
    }

    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        Self::json(self.client.get(self.url("/api/system/health"))).await
    }

    pub async fn test_alarm(&self) -> Result<(), ApiError> {
        Self::json::<Envelope>(self.client.post(self.url("/api/test/alarm")))
            .await?
            .into_result("Alarm test failed")
    }

    pub async fn set_recording_quality(&self, quality: &str) -> Result<(), ApiError> {
        Self::json::<Envelope>(
            self.client
                .post(self.url("/api/settings/recording-quality"))
                .json(&json!({ "quality": quality })),
        )
        .await?
        .into_result("Failed to set recording quality")
    }

    pub async fn status(&self) -> Result<ServerStatus, ApiError> {
        Self::json(self.client.get(self.url("/api/status"))).await
    }

    /// Downloads the export of one violation into `dir`. Returns the file
    /// written.
    pub async fn export_violation(&self, id: i64, dir: &Path) -> Result<PathBuf, ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/api/violations/{id}/export")));
        let file_name = format!("violation-{id}-{}.zip", crate::connection::now_millis());
        self.download(request, dir, &file_name).await
    }

    /// Downloads the server logs into `dir`. Returns the file written.
    pub async fn export_logs(&self, dir: &Path) -> Result<PathBuf, ApiError> {
        let request = self.client.post(self.url("/api/export/logs"));
        let file_name = format!("vault-logs-{}.zip", crate::connection::now_millis());
        self.download(request, dir, &file_name).await
    }

    async fn download(
        &self,
        request: reqwest::RequestBuilder,
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, ApiError> {
        let response = request.send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        create_dir_all(dir).await?;
        let path = dir.join(file_name);
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        log::info!("Saved {} bytes to {path:?}", bytes.len());
        Ok(path)
    }
}
