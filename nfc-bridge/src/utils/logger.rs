//! Logging Infrastructure
//!
//! Console output (plain or JSON) plus an optional daily rotating file.

use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logger with optional JSON console and file output
///
/// `RUST_LOG` takes precedence over `log_level`. The file layer is only added
/// when `log_dir` exists.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_target(false)
            .boxed()
    };

    let file = log_dir.and_then(|dir| {
        let log_path = Path::new(dir);
        if !log_path.exists() {
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(log_path, "nfc-bridge");
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender)
                .boxed(),
        )
    });

    // A second init (tests) is ignored
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
}
