//! Liveness endpoint.
//!
//! GET /health - live session count and database reachability.

use axum::Json;
use axum::extract::State;

use crate::http::error::AppError;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db_pool.reader)
        .await
        .map_err(|e| AppError::Internal(format!("database unavailable: {e}")))?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "sessions": state.registry().len(),
    })))
}
