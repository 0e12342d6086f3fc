//! Simulated reader field
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /api/sim/tag | GET | Tag in the field |
//! | /api/sim/tag | PUT | Place a tag |
//! | /api/sim/tag | DELETE | Remove the tag |
//!
//! Answers 404 when a hardware reader is configured.

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub use handler::{PlaceTagRequest, SimTagView};

pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/sim/tag",
        get(handler::get_tag)
            .put(handler::place_tag)
            .delete(handler::remove_tag),
    )
}
