//! Moonraker Client - HTTP client for the printer service
//!
//! Tells Moonraker which filament spool is active.

pub mod client;
pub mod config;
pub mod error;

pub use client::{GcodeScript, MoonrakerClient};
pub use config::{DEFAULT_PORT, MoonrakerConfig};
pub use error::{MoonrakerError, MoonrakerResult};
