//! # Controller
//!
//! Core controller modules for the operator.
//!
//! - `backoff`: Fibonacci backoff for failed passes
//! - `inputs`: Extraction of builder inputs from listed Secrets and ConfigMaps
//! - `readiness`: Cluster readiness gate for paging notifiers
//! - `reconciler`: Core reconciliation logic
//! - `server`: HTTP server for metrics and health checks
//! - `store`: Cluster state access behind the `ClusterStore` trait

pub mod backoff;
pub mod inputs;
pub mod readiness;
pub mod reconciler;
pub mod server;
pub mod store;
