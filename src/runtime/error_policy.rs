//! # Error Policy
//!
//! Requeue decisions after a pass, and handling of watch stream errors.

use crate::controller::readiness::Requeue;
use crate::controller::reconciler::{BackoffState, ReconcileRequest, Reconciler, ReconcilerError};
use crate::observability;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay before the next pass for a requeue policy; `None` waits for the next event
pub fn requeue_delay(requeue: Requeue, immediate: Duration) -> Option<Duration> {
    match requeue {
        Requeue::Never => None,
        Requeue::Immediately => Some(immediate),
        Requeue::After(delay) => Some(delay),
    }
}

/// Handle a failed pass and return the delay before it is retried
///
/// A requeue policy carried by the error wins. Otherwise the request key backs off
/// along its own Fibonacci sequence so one failing key does not slow the others.
pub fn handle_reconciliation_error(
    request: &ReconcileRequest,
    error: &ReconcilerError,
    ctx: &Reconciler,
    immediate: Duration,
) -> Duration {
    error!(request = %request, error = %error, "Reconciliation error");
    observability::metrics::increment_reconciliation_errors();

    if let Some(delay) = error.requeue().and_then(|r| requeue_delay(r, immediate)) {
        info!(
            request = %request,
            delay_secs = delay.as_secs_f64(),
            "Retrying with readiness requeue policy"
        );
        observability::metrics::increment_requeues_total("readiness");
        return delay;
    }

    let key = request.key();
    let (delay, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states
                .entry(key)
                .or_insert_with(|| BackoffState::new(ctx.backoff_start, ctx.backoff_max));
            state.increment_error();
            (state.backoff.next_backoff(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using maximum backoff", e);
            (ctx.backoff_max, 0)
        }
    };

    info!(
        request = %request,
        delay_secs = delay.as_secs_f64(),
        error_count,
        "Retrying with Fibonacci backoff"
    );
    observability::metrics::increment_requeues_total("error-backoff");
    delay
}

/// Forget the error backoff of a key after a successful pass
pub fn reset_backoff(request: &ReconcileRequest, ctx: &Reconciler) {
    match ctx.backoff_states.lock() {
        Ok(mut states) => {
            if let Some(state) = states.get_mut(&request.key()) {
                state.reset();
            }
        }
        Err(e) => warn!("Failed to lock backoff_states: {}", e),
    }
}

/// Watch error classes that warrant different log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    /// Resource version too old; the watcher relists on its own
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if is_not_found {
        WatchErrorKind::NotFound
    } else if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else {
        WatchErrorKind::Other
    }
}

/// Log a watch stream error; the stream's own backoff handles the retry
pub fn handle_watch_stream_error(kind: &str, error_string: &str) {
    match classify_watch_error(error_string) {
        WatchErrorKind::Unauthorized => {
            error!(
                kind,
                "Watch authentication failed (401 Unauthorized); RBAC may have been revoked or the token expired"
            );
            error!("Verify the operator ServiceAccount can list and watch {} in its namespace", kind);
        }
        WatchErrorKind::Expired => {
            debug!(kind, "Watch resource version expired (410), relisting");
        }
        WatchErrorKind::TooManyRequests => {
            warn!(kind, "API server storage reinitializing (429), backing off");
        }
        WatchErrorKind::NotFound => {
            warn!(kind, error = error_string, "Watched resource not found (404)");
        }
        WatchErrorKind::Other => {
            error!(kind, error = error_string, "Watch stream error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::readiness::{Readiness, ReadinessError};
    use crate::controller::store::{ClusterStore, StoreError};
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{ConfigMap, Secret};
    use std::sync::Arc;

    struct NoStore;

    #[async_trait]
    impl ClusterStore for NoStore {
        async fn list_secrets(&self, _: &str) -> Result<Vec<Secret>, StoreError> {
            Ok(Vec::new())
        }
        async fn list_config_maps(&self, _: &str) -> Result<Vec<ConfigMap>, StoreError> {
            Ok(Vec::new())
        }
        async fn cluster_id(&self) -> Result<String, StoreError> {
            Ok(String::new())
        }
        async fn cluster_https_proxy(&self) -> Result<String, StoreError> {
            Ok(String::new())
        }
        async fn replace_secret(&self, _: &Secret) -> Result<(), StoreError> {
            Ok(())
        }
        async fn create_secret(&self, _: &Secret) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct AlwaysReady;

    #[async_trait]
    impl Readiness for AlwaysReady {
        async fn is_ready(&self) -> Result<bool, ReadinessError> {
            Ok(true)
        }
        fn result(&self) -> Requeue {
            Requeue::Never
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Arc::new(NoStore),
            Arc::new(AlwaysReady),
            &ControllerConfig::default(),
        )
    }

    fn readiness_error(requeue: Requeue) -> ReconcilerError {
        ReconcilerError::Readiness {
            source: ReadinessError::JobLookup(StoreError::NotFound("job".to_string())),
            requeue,
        }
    }

    const IMMEDIATE: Duration = Duration::from_millis(1000);

    #[test]
    fn test_requeue_delay() {
        assert_eq!(requeue_delay(Requeue::Never, IMMEDIATE), None);
        assert_eq!(requeue_delay(Requeue::Immediately, IMMEDIATE), Some(IMMEDIATE));
        assert_eq!(
            requeue_delay(Requeue::After(Duration::from_secs(10)), IMMEDIATE),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_error_requeue_policy_wins() {
        let ctx = reconciler();
        let request = ReconcileRequest::new("openshift-monitoring", "pd-secret");
        let delay = handle_reconciliation_error(
            &request,
            &readiness_error(Requeue::After(Duration::from_secs(10))),
            &ctx,
            IMMEDIATE,
        );
        assert_eq!(delay, Duration::from_secs(10));
        assert!(ctx.backoff_states.lock().expect("Should lock").is_empty());
    }

    #[test]
    fn test_fibonacci_backoff_per_key() {
        let ctx = reconciler();
        let pd = ReconcileRequest::new("openshift-monitoring", "pd-secret");
        let dms = ReconcileRequest::new("openshift-monitoring", "dms-secret");
        let err = readiness_error(Requeue::Never);

        let observed: Vec<u64> = (0..4)
            .map(|_| handle_reconciliation_error(&pd, &err, &ctx, IMMEDIATE).as_secs())
            .collect();
        assert_eq!(observed, vec![1, 1, 2, 3]);
        assert_eq!(
            handle_reconciliation_error(&dms, &err, &ctx, IMMEDIATE),
            Duration::from_secs(1)
        );

        reset_backoff(&pd, &ctx);
        assert_eq!(
            handle_reconciliation_error(&pd, &err, &ctx, IMMEDIATE),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_classify_watch_error() {
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorKind::Unauthorized
        );
        assert_eq!(
            classify_watch_error("WatchFailed: too old resource version"),
            WatchErrorKind::Expired
        );
        assert_eq!(
            classify_watch_error("storage is (re)initializing"),
            WatchErrorKind::TooManyRequests
        );
        assert_eq!(
            classify_watch_error("WatchFailed: invalid type: integer `404`"),
            WatchErrorKind::NotFound
        );
        assert_eq!(classify_watch_error("connection reset"), WatchErrorKind::Other);
    }
}
