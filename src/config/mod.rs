//! # Configuration
//!
//! Operator and HTTP server settings loaded from environment variables.
//! Values are read once at process start and stay fixed for the lifetime of the process.

pub mod controller;
pub mod server;

pub use controller::{ControllerConfig, ControllerConfigError};
pub use server::ServerConfig;

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
