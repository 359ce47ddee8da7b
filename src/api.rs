//! HTTP API endpoints for state management.
//!
//! These endpoints are used by the operator screen for exporting/importing the session.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::state::export::SessionExport;
use crate::state::AppState;
use crate::types::Player;

/// Export the entire session as JSON.
///
/// GET /api/state/export
pub async fn export_state(State(state): State<Arc<AppState>>) -> Json<SessionExport> {
    let export = state.export_state().await;
    Json(export)
}

/// Import a session snapshot.
///
/// POST /api/state/import
///
/// Replaces the current session with the imported data.
/// Broadcasts the restored state to all connected clients.
pub async fn import_state(
    State(state): State<Arc<AppState>>,
    Json(export): Json<SessionExport>,
) -> Response {
    match state.import_state(export).await {
        Ok(()) => (StatusCode::OK, "State imported successfully").into_response(),
        Err(e) => {
            tracing::error!("State import failed: {}", e);
            (StatusCode::BAD_REQUEST, format!("Import failed: {}", e)).into_response()
        }
    }
}

/// Current ranking.
///
/// GET /api/standings
pub async fn standings(State(state): State<Arc<AppState>>) -> Json<Vec<Player>> {
    Json(state.standings().await)
}
