//! Simulated field handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use spool_nfc::{SimulatedField, SimulatedTag, TagIdentifiers};

use crate::core::ServerState;
use crate::utils::{AppError, AppResponse, AppResult, ok};

#[derive(Debug, Deserialize)]
pub struct PlaceTagRequest {
    pub spool: u32,
    pub filament: u32,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Serialize)]
pub struct SimTagView {
    pub writable: bool,
    /// Ids last written to the tag's NDEF area
    pub written: Option<TagIdentifiers>,
}

fn field(state: &ServerState) -> AppResult<&SimulatedField> {
    state
        .field
        .as_ref()
        .ok_or_else(|| AppError::not_found("No simulated reader configured"))
}

/// GET /api/sim/tag
pub async fn get_tag(
    State(state): State<ServerState>,
) -> AppResult<Json<AppResponse<Option<SimTagView>>>> {
    let view = field(&state)?.tag().map(|tag| SimTagView {
        writable: tag.writable,
        written: tag.written_identifiers(),
    });
    ok(view)
}

/// PUT /api/sim/tag
pub async fn place_tag(
    State(state): State<ServerState>,
    Json(payload): Json<PlaceTagRequest>,
) -> AppResult<Json<AppResponse<TagIdentifiers>>> {
    let field = field(&state)?;

    let mut tag = SimulatedTag::with_ids(payload.spool, payload.filament);
    if payload.read_only {
        tag = tag.read_only();
    }
    field.place(tag);

    tracing::info!(spool = payload.spool, filament = payload.filament, "Simulated tag placed");
    ok(TagIdentifiers::new(payload.spool.into(), payload.filament.into()))
}

/// DELETE /api/sim/tag
pub async fn remove_tag(State(state): State<ServerState>) -> AppResult<Json<AppResponse<bool>>> {
    let removed = field(&state)?.remove().is_some();
    tracing::info!(removed, "Simulated tag removed");
    ok(removed)
}
