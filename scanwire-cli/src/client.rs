//! HTTP/WebSocket client for the scanwire server API.

use serde::Deserialize;

use scanwire_core::snapshot::SessionSnapshot;
use scanwire_core::types::{ScanMode, ScanOptions, Session};

use crate::error::CliError;

/// Thin wrapper over the server's request/response API.
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateScanResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ScanListResponse {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    message: String,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. `http://127.0.0.1:8080`).
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    /// Derive the WebSocket endpoint from the HTTP base URL.
    pub fn ws_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{}", self.base)
        };
        format!("{ws_base}/ws")
    }

    /// `POST /api/scans` -- create a session, returns its id.
    pub async fn create_scan(
        &self,
        target: &str,
        mode: ScanMode,
        options: ScanOptions,
    ) -> Result<String, CliError> {
        let response = self
            .http
            .post(format!("{}/api/scans", self.base))
            .json(&serde_json::json!({
                "target": target,
                "mode": mode,
                "options": options,
            }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: CreateScanResponse = response.json().await?;
        Ok(body.session_id)
    }

    /// `GET /api/scans/{id}` -- full session snapshot.
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, CliError> {
        let response = self
            .http
            .get(format!("{}/api/scans/{session_id}", self.base))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// `GET /api/scans` -- all sessions, newest first.
    pub async fn sessions(&self) -> Result<Vec<Session>, CliError> {
        let response = self.http.get(format!("{}/api/scans", self.base)).send().await?;
        let response = Self::check(response).await?;
        let body: ScanListResponse = response.json().await?;
        Ok(body.sessions)
    }

    /// `DELETE /api/scans/{id}` -- evict a session.
    pub async fn evict(&self, session_id: &str) -> Result<(), CliError> {
        let response = self
            .http
            .delete(format!("{}/api/scans/{session_id}", self.base))
            .send()
            .await?;
        let _ = Self::check(response).await?;
        Ok(())
    }

    /// Map non-success responses onto CLI errors.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CliError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body: Option<ApiErrorBody> = response.json().await.ok();
        match body {
            Some(body) if body.error == "not_found" => Err(CliError::NotFound(body.message)),
            Some(body) => Err(CliError::Api(body.message)),
            None => Err(CliError::Api(format!("server returned {status}"))),
        }
    }
}
