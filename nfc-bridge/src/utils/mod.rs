//! Utilities
//!
//! - [`AppError`] - API error type
//! - [`AppResponse`] - API response body
//! - logging setup

pub mod error;
pub mod logger;

pub use error::{AppError, AppResponse, AppResult, ok};
