//! # Watch Loop
//!
//! Watches Secrets and ConfigMaps in the operator namespace and feeds a single
//! reconciliation queue.
//!
//! Both watchers push [`ReconcileRequest`]s into one channel. A single consumer runs
//! passes one at a time, so passes never race each other. Requeues are timers that
//! push the request back into the same channel; at most one timer is pending per key.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{ReconcileRequest, Reconciler};
use crate::controller::server::ServerState;
use crate::runtime::error_policy::{
    handle_reconciliation_error, handle_watch_stream_error, requeue_delay, reset_backoff,
};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use kube_runtime::watcher::{self, Event};
use kube_runtime::WatchStreamExt;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Request for the object carried by a watch event, if the event carries one
pub fn event_request<K>(event: &Event<K>) -> Option<ReconcileRequest>
where
    K: Resource,
{
    match event {
        Event::Apply(obj) | Event::InitApply(obj) | Event::Delete(obj) => Some(
            ReconcileRequest::new(obj.namespace().unwrap_or_default(), obj.name_any()),
        ),
        Event::Init | Event::InitDone => None,
    }
}

/// Keys that currently have a requeue timer pending
#[derive(Debug, Clone, Default)]
pub struct PendingRequeues {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl PendingRequeues {
    /// Record a timer for `key`; false when one is already pending
    pub fn try_schedule(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string())
    }

    pub fn complete(&self, key: &str) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

fn schedule_requeue(
    tx: &mpsc::UnboundedSender<ReconcileRequest>,
    pending: &PendingRequeues,
    request: ReconcileRequest,
    delay: Duration,
) {
    let key = request.key();
    if !pending.try_schedule(&key) {
        debug!(request = %request, "Requeue already pending");
        return;
    }
    let tx = tx.clone();
    let pending = pending.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        pending.complete(&key);
        if tx.send(request).is_err() {
            debug!("Reconcile queue closed, dropping requeue");
        }
    });
}

/// Forward watch events for one resource kind into the queue until the channel closes
async fn watch_objects<K>(
    api: Api<K>,
    kind: &'static str,
    tx: mpsc::UnboundedSender<ReconcileRequest>,
    restart_delay: Duration,
) where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    loop {
        info!(kind, "Starting watch");
        let mut stream = watcher::watcher(api.clone(), watcher::Config::default())
            .default_backoff()
            .boxed();

        while let Some(event) = stream.next().await {
            match event {
                Ok(event) => {
                    if let Some(request) = event_request(&event) {
                        debug!(kind, request = %request, "watch.event.received");
                        if tx.send(request).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => handle_watch_stream_error(kind, &format!("{e:?}")),
            }
        }

        if tx.is_closed() {
            return;
        }
        warn!(
            kind,
            "Watch stream ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }
}

/// Resolves on SIGINT, or on SIGTERM where available (sent by the kubelet)
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Run the operator until a shutdown signal arrives
///
/// The signal marks the HTTP server not ready and stops the queue consumer after the
/// in-flight pass completes.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_state = server_state.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_state.set_ready(false);
        if shutdown_tx.send(true).is_err() {
            debug!("Watch loop already stopped");
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<ReconcileRequest>();
    let namespace = reconciler.namespace.clone();
    let restart_delay = config.watch_restart_delay_duration();
    let immediate = config.immediate_requeue_duration();

    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);
    let config_maps: Api<ConfigMap> = Api::namespaced(client, &namespace);
    let watchers = [
        tokio::spawn(watch_objects(secrets, "Secret", tx.clone(), restart_delay)),
        tokio::spawn(watch_objects(config_maps, "ConfigMap", tx.clone(), restart_delay)),
    ];

    let pending = PendingRequeues::default();
    info!(namespace = namespace.as_str(), "Starting controller watch loop...");

    loop {
        let request = tokio::select! {
            Ok(()) = shutdown_rx.changed() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let delay = match reconciler.reconcile(&request).await {
            Ok(requeue) => {
                reset_backoff(&request, &reconciler);
                requeue_delay(requeue, immediate)
            }
            Err(e) => Some(handle_reconciliation_error(
                &request,
                &e,
                &reconciler,
                immediate,
            )),
        };

        if let Some(delay) = delay {
            schedule_requeue(&tx, &pending, request, delay);
        }
    }

    for handle in &watchers {
        handle.abort();
    }
    info!("Controller stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn secret(namespace: &str, name: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            ..Secret::default()
        }
    }

    #[test]
    fn test_event_request() {
        let applied = Event::Apply(secret("openshift-monitoring", "pd-secret"));
        assert_eq!(
            event_request(&applied),
            Some(ReconcileRequest::new("openshift-monitoring", "pd-secret"))
        );

        let deleted = Event::Delete(secret("openshift-monitoring", "dms-secret"));
        assert_eq!(
            event_request(&deleted).map(|r| r.name),
            Some("dms-secret".to_string())
        );

        let init_apply = Event::InitApply(secret("openshift-monitoring", "goalert-secret"));
        assert!(event_request(&init_apply).is_some());

        assert_eq!(event_request::<Secret>(&Event::Init), None);
        assert_eq!(event_request::<Secret>(&Event::InitDone), None);
    }

    #[test]
    fn test_pending_requeues_dedupe() {
        let pending = PendingRequeues::default();
        assert!(pending.try_schedule("openshift-monitoring/pd-secret"));
        assert!(!pending.try_schedule("openshift-monitoring/pd-secret"));
        assert!(pending.try_schedule("openshift-monitoring/dms-secret"));
        pending.complete("openshift-monitoring/pd-secret");
        assert!(pending.try_schedule("openshift-monitoring/pd-secret"));
    }

    #[tokio::test]
    async fn test_schedule_requeue_sends_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pending = PendingRequeues::default();
        let request = ReconcileRequest::new("openshift-monitoring", "pd-secret");

        schedule_requeue(&tx, &pending, request.clone(), Duration::from_millis(10));
        schedule_requeue(&tx, &pending, request.clone(), Duration::from_millis(10));

        let received = rx.recv().await.expect("Should receive requeue");
        assert_eq!(received, request);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }
}
