use nfc_bridge::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logging) and configuration
    let config = setup_environment();

    print_banner();
    tracing::info!(
        reader = ?config.reader,
        moonraker = %config.moonraker_url,
        "NFC bridge starting..."
    );

    // 2. Open the reader and build shared state
    let state = ServerState::initialize(&config)?;

    // 3. Reader loop, notifier and HTTP API until Ctrl-C
    let server = Server::new(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {:#}", e);
        return Err(e);
    }

    Ok(())
}
