//! # Reconciler
//!
//! Regenerates the Alertmanager configuration whenever one of its inputs changes.
//!
//! ## Reconciliation Flow
//!
//! 1. Skip events for namespaces and object names that are not inputs
//! 2. Consult the readiness gate (errors stop the pass here)
//! 3. List Secrets and ConfigMaps in the operator namespace
//! 4. Extract credentials, namespace regexes and the OCM Agent URL
//! 5. Read cluster ID and HTTPS proxy
//! 6. Build the config
//! 7. Encode and upsert `alertmanager-main`
//! 8. Return the readiness requeue policy

pub mod reconcile;
pub mod types;
pub mod write;

pub use reconcile::is_watched;
pub use types::{BackoffState, ReconcileRequest, Reconciler, ReconcilerError};
pub use write::{alertmanager_secret, upsert_secret, write_config};
