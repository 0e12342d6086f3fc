//! NFC Bridge - spool tags to Moonraker
//!
//! # Architecture
//!
//! - Reader loop (`spool_nfc::NfcHandler`) polls the NFC reader on a blocking
//!   worker and publishes tag events
//! - Notifier (`services`) tells Moonraker about the active spool
//! - HTTP API (`api`) exposes the last seen tag and tag writes
//!
//! # Module layout
//!
//! ```text
//! nfc-bridge/src/
//! ├── core/          # Config, state, background tasks, server
//! ├── services/      # Tag notifier
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # Errors, logging
//! ```

pub mod api;
pub mod core;
pub mod services;
pub mod utils;

pub use self::core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};
pub use utils::logger::init_logger_with_file;

/// Load `.env` and install the logger
pub fn setup_environment() -> Config {
    // Missing .env is fine
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
    config
}

pub fn print_banner() {
    println!(
        r#"
    _   __________     __         _     __
   / | / / ____/ /_   / /_  _____(_)___/ /___ ____
  /  |/ / /_  / __/  / __ \/ ___/ / __  / __ `/ _ \
 / /|  / __/ / /_   / /_/ / /  / / /_/ / /_/ /  __/
/_/ |_/_/    \__/  /_.___/_/  /_/\__,_/\__, /\___/
                                      /____/
    "#
    );
}
