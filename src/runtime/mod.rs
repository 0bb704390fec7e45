//! # Runtime
//!
//! Process-level wiring around the reconciler.
//!
//! - `initialization`: Startup of tracing, configuration, metrics, server and client
//! - `watch_loop`: Watchers feeding the reconciliation queue
//! - `error_policy`: Requeue and backoff decisions, watch error handling

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
