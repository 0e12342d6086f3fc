//! Health check route
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /health | GET | Reader and Moonraker status |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "uptime_seconds": 42,
//!   "reader": { "running": true, "status": "" },
//!   "moonraker": { "url": "http://localhost:7125", "online": true }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    reader: ReaderCheck,
    moonraker: MoonrakerCheck,
}

#[derive(Serialize)]
pub struct ReaderCheck {
    running: bool,
    /// Most recent write failure, empty if none
    status: String,
}

#[derive(Serialize)]
pub struct MoonrakerCheck {
    url: String,
    online: bool,
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let online = state.moonraker.is_online().await;
    let running = !state.handler.is_stopped();

    Json(HealthResponse {
        status: if online && running { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        reader: ReaderCheck {
            running,
            status: state.handler.status(),
        },
        moonraker: MoonrakerCheck {
            url: state.moonraker.base_url().to_string(),
            online,
        },
    })
}
