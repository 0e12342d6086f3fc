//! Services
//!
//! - [`TagNotifier`] - forwards tag reads to Moonraker

pub mod notifier;

pub use notifier::TagNotifier;
