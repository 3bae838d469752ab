//! Shared utilities for tradeguard
//!
//! This crate provides the pieces every binary in the workspace needs:
//! tracing subscriber setup and the application-level configuration.

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use logging::init_tracing;
