use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::services::conversation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DevMessage {
    pub from_phone: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct DevResponse {
    pub replies: Vec<String>,
    pub state: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn current_state(state: &AppState, from: &str) -> anyhow::Result<String> {
    let db = state
        .db
        .lock()
        .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
    Ok(queries::get_session(&db, from)?
        .map(|s| s.state.as_str().to_string())
        .unwrap_or_default())
}

/// Runs a message through the dialog without sending any SMS, so the flow
/// can be exercised locally with curl.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DevMessage>,
) -> Result<Json<DevResponse>, AppError> {
    let from = payload.from_phone.trim().to_string();
    if from.is_empty() {
        return Err(AppError::BadRequest("from_phone must not be empty".to_string()));
    }

    let (replies, error) =
        match conversation::process_message(&state, &from, payload.message.trim()).await {
            Ok(replies) => (replies, None),
            Err(e) => {
                tracing::error!(error = %e, from = %from, "dev message failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

    Ok(Json(DevResponse {
        replies,
        state: current_state(&state, &from)?,
        success: error.is_none(),
        error,
    }))
}
