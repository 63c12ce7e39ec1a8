//! Telegram webhook receiver.
//!
//! POST /telegram/webhook - one `Update` per request.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use reviewbot_core::dispatch::DispatchOutcome;
use reviewbot_infra::telegram::Update;
use reviewbot_types::event::InboundEvent;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /telegram/webhook - hand an update to the user's session.
///
/// Returns as soon as the event is queued; Telegram only needs the 200.
/// Updates that carry no message, and updates dropped on a full inbox, are
/// still acknowledged so Telegram does not redeliver them.
pub async fn receive_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidUpdate(format!("invalid update: {e}")))?;
    let update_id = update.update_id;

    if update.message.is_none() {
        tracing::debug!(update_id, "ignoring update without a message");
        return Ok(StatusCode::OK);
    }

    let outcome = state.dispatcher.dispatch(InboundEvent::from(update)).await?;
    if outcome == DispatchOutcome::Dropped {
        tracing::warn!(update_id, "update dropped");
    }

    Ok(StatusCode::OK)
}
