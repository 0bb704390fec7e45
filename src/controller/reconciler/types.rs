//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::readiness::{Readiness, ReadinessError, Requeue};
use crate::controller::store::ClusterStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Readiness could not be determined; the pass stopped before rendering anything
    #[error("Error determining cluster readiness: {source}")]
    Readiness {
        #[source]
        source: ReadinessError,
        /// Requeue policy the readiness check asked for
        requeue: Requeue,
    },
}

impl ReconcilerError {
    /// Requeue policy carried by the error, if it asks for one
    pub fn requeue(&self) -> Option<Requeue> {
        match self {
            Self::Readiness { requeue, .. } if *requeue != Requeue::Never => Some(*requeue),
            Self::Readiness { .. } => None,
        }
    }
}

/// Namespace and name of the Secret or ConfigMap whose change triggered a pass
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl std::fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Backoff state for a specific request key
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(start: Duration, max: Duration) -> Self {
        Self {
            backoff: FibonacciBackoff::new(start, max),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub store: Arc<dyn ClusterStore>,
    pub readiness: Arc<dyn Readiness>,
    /// Namespace watched for inputs and written to
    pub namespace: String,
    pub fedramp: bool,
    pub backoff_start: Duration,
    pub backoff_max: Duration,
    /// Error backoff per request key, owned by the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("namespace", &self.namespace)
            .field("fedramp", &self.fedramp)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn ClusterStore>,
        readiness: Arc<dyn Readiness>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            store,
            readiness,
            namespace: config.operator_namespace.clone(),
            fedramp: config.fedramp,
            backoff_start: config.backoff_start_duration(),
            backoff_max: config.backoff_max_duration(),
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
