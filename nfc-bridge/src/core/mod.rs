//! Core module - configuration, state, tasks and the server
//!
//! - [`Config`] - bridge configuration
//! - [`ServerState`] - shared state
//! - [`BackgroundTasks`] - long-running task manager
//! - [`Server`] - process runtime

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, ReaderBackend};
pub use server::Server;
pub use state::{SeenTag, ServerState};
pub use tasks::{BackgroundTasks, TaskKind};
