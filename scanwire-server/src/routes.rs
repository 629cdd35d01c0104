//! HTTP API -- session creation, history queries, and health.
//!
//! The request/response surface mirrors the transport contract:
//! sessions are created over plain HTTP, live events flow over the
//! WebSocket channel (`crate::ws`).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use scanwire_core::snapshot::SessionSnapshot;
use scanwire_core::types::{ScanMode, ScanOptions, Session};
use scanwire_event_hub::HubError;
use scanwire_scan_engine::{EventSink, ScanSpec};

use crate::state::AppState;

/// API error wrapper mapping hub errors onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            HubError::InvalidTarget => (StatusCode::BAD_REQUEST, "invalid_target"),
            HubError::UnknownSession { .. } => (StatusCode::NOT_FOUND, "not_found"),
            HubError::ConnectionClosed { .. } | HubError::Terminated { .. } => {
                (StatusCode::CONFLICT, "conflict")
            }
        };
        let body = Json(serde_json::json!({
            "error": code,
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Request body for `POST /api/scans`.
#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    /// Scan target (hostname or URL); must not be empty.
    pub target: String,
    /// Scan mode; defaults to `quick`.
    #[serde(default)]
    pub mode: ScanMode,
    /// Producer options (seed, failure injection).
    #[serde(default)]
    pub options: ScanOptions,
}

/// Response body for `POST /api/scans`.
#[derive(Debug, Serialize)]
pub struct CreateScanResponse {
    /// Identifier of the newly created session.
    pub session_id: String,
}

/// Response body for `GET /api/scans`.
#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    /// Sessions, newest first.
    pub sessions: Vec<Session>,
    /// Total session count.
    pub total: usize,
}

/// Health report shape for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the server is able to answer.
    pub status: &'static str,
    /// Seconds since server start.
    pub uptime_secs: u64,
    /// Sessions currently held in the registry.
    pub sessions: usize,
    /// Registered observer connections.
    pub connections: usize,
    /// Server version.
    pub version: &'static str,
}

/// `POST /api/scans` -- create a session and start its producer.
pub async fn create_scan(
    State(state): State<AppState>,
    Json(request): Json<CreateScanRequest>,
) -> Result<(StatusCode, Json<CreateScanResponse>), ApiError> {
    let (session, event_tx) = state.hub.open_session(&request.target, request.mode).await?;

    let spec = ScanSpec {
        session_id: session.id.clone(),
        target: session.target.clone(),
        mode: session.mode,
        options: request.options,
    };
    let engine = state.engine.clone();
    let cancel = state.shutdown.child_token();
    tokio::spawn(async move {
        let name = engine.name().to_owned();
        if let Err(e) = engine.run(spec, EventSink::new(event_tx), cancel).await {
            // Producer-declared failure is already surfaced to observers
            // as a terminal event; this is operator-facing logging only.
            tracing::warn!(engine = %name, error = %e, "scan engine finished with error");
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(CreateScanResponse {
            session_id: session.id,
        }),
    ))
}

/// `GET /api/scans` -- list all sessions, newest first.
pub async fn list_scans(State(state): State<AppState>) -> Json<ScanListResponse> {
    let sessions = state.hub.sessions().await;
    let total = sessions.len();
    Json(ScanListResponse { sessions, total })
}

/// `GET /api/scans/{id}` -- full session snapshot (history query).
pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.hub.snapshot(&id).await?))
}

/// `DELETE /api/scans/{id}` -- evict a session from the registry.
///
/// The only way a session is ever removed; terminal sessions stay
/// queryable until an operator calls this.
pub async fn evict_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.hub.evict(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /health` -- liveness and basic gauges.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        uptime_secs: state.started_at.elapsed().as_secs(),
        sessions: state.hub.sessions().await.len(),
        connections: state.hub.connection_count().await,
        version: env!("CARGO_PKG_VERSION"),
    })
}
