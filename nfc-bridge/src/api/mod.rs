//! API routes
//!
//! - [`health`] - health check
//! - [`tag`] - last seen tag and tag writes
//! - [`sim`] - simulated reader field (simulated backend only)

pub mod health;
pub mod sim;
pub mod tag;

use axum::{Router, extract::Request, middleware, response::Response};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// HTTP access log middleware
async fn log_request(request: Request, next: middleware::Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(tag::router())
        .merge(sim::router())
}

/// Router bound to `state` with the HTTP middleware stack
pub fn app(state: ServerState) -> Router {
    build_app()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(log_request))
}
