use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and whether the
/// record store integration is live or in degraded mode.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": "0.1.0",
        "service": "drivehouse-api",
        "project": state.config.identity_project_id,
        "record_store": if state.records.is_some() { "configured" } else { "degraded" },
    }))
}
