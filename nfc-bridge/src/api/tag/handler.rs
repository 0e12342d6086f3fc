//! Tag API Handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::core::{SeenTag, ServerState};
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Serialize)]
pub struct TagView {
    pub tag: Option<SeenTag>,
    /// Most recent write failure, empty if none
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WriteTagRequest {
    pub spool: u64,
    pub filament: u64,
}

/// GET /api/tag
pub async fn current(State(state): State<ServerState>) -> AppResult<Json<AppResponse<TagView>>> {
    ok(TagView {
        tag: state.last_tag(),
        status: state.handler.status(),
    })
}

/// POST /api/tag/write - blocks until the reader loop wrote the tag or the
/// write timeout elapsed
pub async fn write(
    State(state): State<ServerState>,
    Json(payload): Json<WriteTagRequest>,
) -> AppResult<Json<AppResponse<WriteTagRequest>>> {
    if payload.spool == 0 {
        return Err(AppError::validation("spool must be non-zero"));
    }

    tracing::info!(spool = payload.spool, filament = payload.filament, "Tag write requested");
    let handler = state.handler.clone();
    let written = tokio::task::spawn_blocking(move || {
        handler.write_to_tag(payload.spool, payload.filament)
    })
    .await?;

    if written {
        ok(payload)
    } else {
        let status = state.handler.status();
        let message = if status.is_empty() {
            "No tag written before the timeout".to_string()
        } else {
            status
        };
        Err(AppError::WriteFailed(message))
    }
}
