//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.
//!
//! `FEDRAMP` and `MAX_CLUSTER_AGE_MINUTES` are strict: an unparsable value is a
//! startup error rather than a silent fallback, since both change what gets paged.

use super::{env_var_or_default, env_var_or_default_str};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading [`ControllerConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerConfigError {
    #[error("invalid value for env var {key}={value} (expected bool)")]
    InvalidBool { key: String, value: String },
    #[error("invalid value for env var {key}={value} (expected int)")]
    InvalidInt { key: String, value: String },
}

/// Operator-level configuration
///
/// All settings except `fedramp` have defaults that suit an OSD/ROSA cluster.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace holding the input objects and the rendered `alertmanager-main` secret
    pub operator_namespace: String,
    /// FedRAMP mode: enables GoAlert and redacts cluster-identifying PagerDuty details
    pub fedramp: bool,
    /// Clusters older than this are considered ready even without the readiness Job
    pub max_cluster_age_minutes: i64,
    /// Delay applied when a pass asks to be requeued immediately (milliseconds)
    pub immediate_requeue_ms: u64,
    /// Fibonacci backoff starting value for failed passes (milliseconds)
    pub backoff_start_ms: u64,
    /// Fibonacci backoff maximum value for failed passes (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after the stream ends (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            operator_namespace: DEFAULT_OPERATOR_NAMESPACE.to_string(),
            fedramp: false,
            max_cluster_age_minutes: DEFAULT_MAX_CLUSTER_AGE_MINUTES,
            immediate_requeue_ms: DEFAULT_IMMEDIATE_REQUEUE_MS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self, ControllerConfigError> {
        use crate::constants::*;
        Ok(Self {
            operator_namespace: env_var_or_default_str(
                "OPERATOR_NAMESPACE",
                DEFAULT_OPERATOR_NAMESPACE,
            ),
            fedramp: parse_bool_var("FEDRAMP", std::env::var("FEDRAMP").ok().as_deref())?,
            max_cluster_age_minutes: parse_int_var(
                "MAX_CLUSTER_AGE_MINUTES",
                std::env::var("MAX_CLUSTER_AGE_MINUTES").ok().as_deref(),
                DEFAULT_MAX_CLUSTER_AGE_MINUTES,
            )?,
            immediate_requeue_ms: env_var_or_default(
                "IMMEDIATE_REQUEUE_MS",
                DEFAULT_IMMEDIATE_REQUEUE_MS,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
        })
    }

    /// Get immediate requeue duration
    pub fn immediate_requeue_duration(&self) -> Duration {
        Duration::from_millis(self.immediate_requeue_ms)
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }

    /// Get backoff max duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

/// Parse a boolean flag; unset or empty means `false`
///
/// Accepts the same spellings as the platform tooling that sets these variables:
/// `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool_var(key: &str, value: Option<&str>) -> Result<bool, ControllerConfigError> {
    match value {
        None | Some("") => Ok(false),
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => Ok(true),
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => Ok(false),
        Some(other) => Err(ControllerConfigError::InvalidBool {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Parse an integer variable; unset or empty means `default`
pub fn parse_int_var(
    key: &str,
    value: Option<&str>,
    default: i64,
) -> Result<i64, ControllerConfigError> {
    match value {
        None | Some("") => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ControllerConfigError::InvalidInt {
                key: key.to_string(),
                value: raw.to_string(),
            }),
    }
}
