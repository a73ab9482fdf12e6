//! HTTP control surface.
//!
//! Operational endpoints over the table manager: destructive reindex,
//! backfill, and a health probe. Per-table variants are reserved and answer
//! 501.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::SyncError;
use crate::manager::TableManager;

/// Request body for `POST /reindex`.
#[derive(Debug, Default, Deserialize)]
pub struct ReindexRequest {
    /// Whether to backfill after the reindex. Defaults to true.
    pub backfill: Option<bool>,
}

#[derive(Clone)]
struct AppState {
    manager: Arc<TableManager>,
}

/// Build the control-surface router.
pub fn create_app(manager: Arc<TableManager>) -> Router {
    let state = AppState { manager };

    Router::new()
        .route("/reindex", post(reindex))
        .route("/reindex/:table", post(reserved))
        .route("/backfill", post(backfill))
        .route("/backfill/:table", post(reserved))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve the control surface on the given address.
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), SyncError> {
    info!("Control surface listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SyncError::config(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SyncError::config(e.to_string()))?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn reindex(
    State(state): State<AppState>,
    body: Option<Json<ReindexRequest>>,
) -> StatusCode {
    let backfill = body.and_then(|Json(request)| request.backfill).unwrap_or(true);

    if let Err(e) = state.manager.reindex_all().await {
        error!(error = %e, "Reindex failed");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    if backfill {
        if let Err(e) = state.manager.backfill_all().await {
            error!(error = %e, "Backfill after reindex failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    StatusCode::OK
}

async fn backfill(State(state): State<AppState>) -> StatusCode {
    match state.manager.backfill_all().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!(error = %e, "Backfill failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Per-table operations are reserved.
async fn reserved() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}
