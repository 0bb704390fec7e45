//! # Cluster Readiness
//!
//! Gate that keeps paging notifiers switched off until a freshly installed cluster
//! has settled.
//!
//! The cluster is ready once the `osd-cluster-ready` Job has succeeded, or once the
//! cluster is older than the configured maximum age (older clusters are assumed to
//! have been healthy long before this operator started). Readiness is a latch: after
//! it flips to true, no further lookups are made.
//!
//! Every check also records a [`Requeue`] policy that the reconciler returns
//! verbatim, so a not-yet-ready cluster keeps being polled.

use crate::constants::{
    CLUSTER_VERSION_NAME, READINESS_AGE_LOOKUP_REQUEUE_SECS, READINESS_JOB_ACTIVE_REQUEUE_SECS,
    READINESS_JOB_NAME,
};
use crate::controller::store::StoreError;
use crate::crd::ClusterVersion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::DeleteParams;
use kube::{Api, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// What the caller should do after an otherwise successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requeue {
    /// Wait for the next watch event
    #[default]
    Never,
    /// Run again as soon as possible
    Immediately,
    After(Duration),
}

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("failed to retrieve osd-cluster-ready Job: {0}")]
    JobLookup(#[source] StoreError),
    #[error("failed to delete failed osd-cluster-ready Job: {0}")]
    JobDelete(#[source] StoreError),
}

/// Opaque readiness gate consulted once per reconciliation pass
#[async_trait]
pub trait Readiness: Send + Sync {
    async fn is_ready(&self) -> Result<bool, ReadinessError>;

    /// Requeue policy decided by the most recent [`Readiness::is_ready`] call
    fn result(&self) -> Requeue;
}

/// Cluster lookups the readiness check depends on
#[async_trait]
pub trait ReadinessSource: Send + Sync {
    /// The readiness Job, or `None` when it does not exist
    async fn readiness_job(&self) -> Result<Option<Job>, StoreError>;

    async fn delete_readiness_job(&self) -> Result<(), StoreError>;

    async fn cluster_created_at(&self) -> Result<DateTime<Utc>, StoreError>;
}

/// Progress of the readiness Job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Missing,
    Succeeded,
    Active,
    /// Finished without a successful pod
    Failed,
}

pub fn job_state(job: Option<&Job>) -> JobState {
    let Some(job) = job else {
        return JobState::Missing;
    };
    let status = job.status.as_ref();
    let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);
    let active = status.and_then(|s| s.active).unwrap_or(0);

    if succeeded > 0 {
        JobState::Succeeded
    } else if active > 0 {
        JobState::Active
    } else {
        JobState::Failed
    }
}

/// True when `created` is more than `max_age_minutes` before `now`
pub fn cluster_too_old(created: DateTime<Utc>, now: DateTime<Utc>, max_age_minutes: i64) -> bool {
    created < now - chrono::Duration::minutes(max_age_minutes)
}

/// Readiness latch backed by a [`ReadinessSource`]
pub struct ClusterReadiness {
    source: Arc<dyn ReadinessSource>,
    max_cluster_age_minutes: i64,
    ready: AtomicBool,
    result: Mutex<Requeue>,
    created_at: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for ClusterReadiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterReadiness")
            .field("max_cluster_age_minutes", &self.max_cluster_age_minutes)
            .field("ready", &self.ready.load(Ordering::Relaxed))
            .field("result", &self.result())
            .finish_non_exhaustive()
    }
}

impl ClusterReadiness {
    pub fn new(source: Arc<dyn ReadinessSource>, max_cluster_age_minutes: i64) -> Self {
        Self {
            source,
            max_cluster_age_minutes,
            ready: AtomicBool::new(false),
            result: Mutex::new(Requeue::Never),
            created_at: Mutex::new(None),
        }
    }

    fn set_result(&self, requeue: Requeue) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = requeue;
    }

    fn mark_ready(&self) -> bool {
        self.ready.store(true, Ordering::Relaxed);
        true
    }

    /// Cluster creation time, looked up once and then cached
    async fn created_at(&self) -> Result<DateTime<Utc>, StoreError> {
        let cached = *self.created_at.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(created) = cached {
            return Ok(created);
        }
        let created = self.source.cluster_created_at().await?;
        info!(created = %created, "Determined cluster creation time");
        *self.created_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(created);
        Ok(created)
    }
}

#[async_trait]
impl Readiness for ClusterReadiness {
    async fn is_ready(&self) -> Result<bool, ReadinessError> {
        if self.ready.load(Ordering::Relaxed) {
            debug!("Using cached positive cluster readiness");
            return Ok(true);
        }

        self.set_result(Requeue::Never);

        let job = match self.source.readiness_job().await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(ReadinessError::JobLookup(e)),
        };
        let state = job_state(job.as_ref());

        if state == JobState::Succeeded {
            info!(job = READINESS_JOB_NAME, "Found a succeeded readiness Job");
            return Ok(self.mark_ready());
        }

        let created = match self.created_at().await {
            Ok(created) => created,
            Err(e) => {
                // Not ready, but let the pass continue and poll again shortly
                error!(error = %e, "Failed to determine cluster creation time");
                self.set_result(Requeue::After(Duration::from_secs(
                    READINESS_AGE_LOOKUP_REQUEUE_SECS,
                )));
                return Ok(false);
            }
        };

        if cluster_too_old(created, Utc::now(), self.max_cluster_age_minutes) {
            info!(
                max_age_minutes = self.max_cluster_age_minutes,
                "Cluster is older than the maximum age; ignoring readiness Job"
            );
            return Ok(self.mark_ready());
        }

        match state {
            JobState::Active => {
                info!(job = READINESS_JOB_NAME, "Found an active readiness Job; will requeue");
                self.set_result(Requeue::After(Duration::from_secs(
                    READINESS_JOB_ACTIVE_REQUEUE_SECS,
                )));
                Ok(false)
            }
            JobState::Failed => {
                info!(job = READINESS_JOB_NAME, "Deleting failed readiness Job");
                self.set_result(Requeue::Immediately);
                match self.source.delete_readiness_job().await {
                    Ok(()) => Ok(false),
                    Err(e) if e.is_not_found() => Ok(false),
                    Err(e) => Err(ReadinessError::JobDelete(e)),
                }
            }
            JobState::Missing => {
                info!(job = READINESS_JOB_NAME, "Readiness Job does not exist yet; will requeue");
                self.set_result(Requeue::Immediately);
                Ok(false)
            }
            JobState::Succeeded => Ok(self.mark_ready()),
        }
    }

    fn result(&self) -> Requeue {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`ReadinessSource`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeReadinessSource {
    client: Client,
    namespace: String,
}

impl std::fmt::Debug for KubeReadinessSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeReadinessSource")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeReadinessSource {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn jobs(&self) -> Api<Job> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

/// Kubernetes timestamps carry second precision, so milliseconds lose nothing
fn to_utc(time: &Time) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(time.0.timestamp_millis())
}

#[async_trait]
impl ReadinessSource for KubeReadinessSource {
    async fn readiness_job(&self) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs().get_opt(READINESS_JOB_NAME).await?)
    }

    async fn delete_readiness_job(&self) -> Result<(), StoreError> {
        self.jobs()
            .delete(READINESS_JOB_NAME, &DeleteParams::background())
            .await?;
        Ok(())
    }

    async fn cluster_created_at(&self) -> Result<DateTime<Utc>, StoreError> {
        let api: Api<ClusterVersion> = Api::all(self.client.clone());
        let version = api.get(CLUSTER_VERSION_NAME).await?;
        version
            .metadata
            .creation_timestamp
            .as_ref()
            .and_then(to_utc)
            .ok_or_else(|| {
                StoreError::NotFound("ClusterVersion has no creationTimestamp".to_string())
            })
    }
}
