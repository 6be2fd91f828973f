//! Shared library for the anime catalog client.
//!
//! This crate provides common functionality used by the client crate:
//! - Configuration management
//! - Logging infrastructure
//! - Canonical catalog models

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::{Backend, Config};
pub use logging::LogConfig;
pub use models::*;
