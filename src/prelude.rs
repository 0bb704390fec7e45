//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use configure_alertmanager_operator::prelude::*;
//! ```

// Alertmanager document model and builder
pub use crate::alertmanager::{build_config, Config, ConfigError, ConfigInputs};

// Cluster resources read for auxiliary inputs
pub use crate::crd::{ClusterVersion, Proxy};

// Seams between the reconciler and the cluster
pub use crate::controller::readiness::{Readiness, ReadinessError, ReadinessSource, Requeue};
pub use crate::controller::store::{ClusterStore, StoreError};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    BackoffState, ReconcileRequest, Reconciler, ReconcilerError,
};

// Config types
pub use crate::config::{ControllerConfig, ControllerConfigError, ServerConfig};
