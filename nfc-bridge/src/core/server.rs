//! Server Implementation
//!
//! Starts the reader loop, the tag notifier and the HTTP API, and stops them
//! again on Ctrl-C.

use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::core::{BackgroundTasks, Config, ServerState, TaskKind};
use crate::services::TagNotifier;

pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Run until Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();
        {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    return;
                }
                tracing::info!("Shutting down...");
                shutdown.cancel();
            });
        }
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` is cancelled
    pub async fn run_until(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = self.state;
        let tasks = start_background_tasks(&state, shutdown.clone());
        tasks.log_summary();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("NFC bridge listening on {}", addr);

        let app = crate::api::app(state);
        let serve_shutdown = shutdown.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
            .await;

        // Stop the workers even when the server failed on its own
        shutdown.cancel();
        tasks.shutdown().await;

        result.map_err(Into::into)
    }
}

/// Register the reader loop and tag notifier
///
/// The loop is blocking and checks its own stop flag, so a listener bridges
/// the shutdown token to [`spool_nfc::NfcHandler::stop`].
pub fn start_background_tasks(state: &ServerState, shutdown: CancellationToken) -> BackgroundTasks {
    let mut tasks = BackgroundTasks::with_token(shutdown.clone());

    let events = state
        .handler
        .subscribe(state.config.event_queue_capacity);

    let handler = state.handler.clone();
    tasks.spawn_blocking("nfc_reader", move || handler.run());

    let handler = state.handler.clone();
    let token = shutdown.clone();
    tasks.spawn("nfc_reader_stopper", TaskKind::Listener, async move {
        token.cancelled().await;
        handler.stop();
    });

    let notifier = TagNotifier::new(state.moonraker.clone(), state.last_tag.clone());
    tasks.spawn(
        "tag_notifier",
        TaskKind::Listener,
        notifier.run(events, shutdown),
    );

    tasks
}
