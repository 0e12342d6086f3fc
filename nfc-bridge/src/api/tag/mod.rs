//! Tag API
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /api/tag | GET | Last seen tag |
//! | /api/tag/write | POST | Write ids to the next tag read |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub use handler::{TagView, WriteTagRequest};

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tag", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::current))
        .route("/write", post(handler::write))
}
