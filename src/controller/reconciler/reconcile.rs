//! # Reconciliation Logic
//!
//! One pass: filter the triggering object, consult readiness, list the operator
//! namespace, extract inputs, render the config, write `alertmanager-main`.
//!
//! Only readiness errors are surfaced. Every other failure is logged and degrades to
//! "value absent", so a broken input yields a smaller configuration rather than none.

use crate::alertmanager::{build_config, ConfigInputs};
use crate::constants::WATCHED_OBJECT_NAMES;
use crate::controller::inputs::{parse_namespaces, parse_secrets, read_ocm_agent_url};
use crate::controller::readiness::Requeue;
use crate::controller::reconciler::types::{ReconcileRequest, Reconciler, ReconcilerError};
use crate::controller::reconciler::write::write_config;
use crate::observability;
use std::time::Instant;
use tracing::{debug, error, info};

/// Whether an event for this object name should trigger a pass
pub fn is_watched(name: &str) -> bool {
    WATCHED_OBJECT_NAMES.contains(&name)
}

impl Reconciler {
    /// Run one reconciliation pass
    ///
    /// Returns the requeue policy decided by the readiness check. Events for other
    /// namespaces or uninteresting object names return [`Requeue::Never`] without
    /// touching the cluster.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Only readiness failures are returned, see ReconcilerError"
    )]
    #[tracing::instrument(
        name = "controller.reconcile",
        skip_all,
        fields(resource.name = %request.name, resource.namespace = %request.namespace)
    )]
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<Requeue, ReconcilerError> {
        if request.namespace != self.namespace {
            return Ok(Requeue::Never);
        }
        if !is_watched(&request.name) {
            debug!(request = %request, "Skip reconcile: not an Alertmanager input");
            return Ok(Requeue::Never);
        }

        let start = Instant::now();
        info!("Reconciling object");

        let cluster_ready = match self.readiness.is_ready().await {
            Ok(ready) => ready,
            Err(source) => {
                error!(error = %source, "Error determining cluster readiness");
                return Err(ReconcilerError::Readiness {
                    source,
                    requeue: self.readiness.result(),
                });
            }
        };

        let secrets = self
            .store
            .list_secrets(&self.namespace)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Unable to list secrets");
                Vec::new()
            });
        let config_maps = self
            .store
            .list_config_maps(&self.namespace)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Unable to list configmaps");
                Vec::new()
            });

        let secret_inputs = parse_secrets(&secrets, cluster_ready);
        let namespaces = parse_namespaces(&config_maps);
        debug!(namespaces = ?namespaces, "Adding paging routes for namespaces");
        let ocm_agent_url = read_ocm_agent_url(&config_maps);

        let cluster_proxy = self.store.cluster_https_proxy().await.unwrap_or_else(|e| {
            error!(error = %e, "Unable to get cluster proxy");
            String::new()
        });
        let cluster_id = self.store.cluster_id().await.unwrap_or_else(|e| {
            error!(error = %e, "Error reading cluster id");
            String::new()
        });

        let config = build_config(&ConfigInputs {
            pagerduty_key: secret_inputs.pagerduty_key,
            watchdog_url: secret_inputs.watchdog_url,
            ocm_agent_url,
            goalert_low_url: secret_inputs.goalert_low_url,
            goalert_high_url: secret_inputs.goalert_high_url,
            goalert_heartbeat_url: secret_inputs.goalert_heartbeat_url,
            cluster_id,
            cluster_proxy,
            namespaces,
            fedramp: self.fedramp,
        });

        write_config(self.store.as_ref(), &self.namespace, &config).await;

        observability::metrics::update_secrets_metrics(&secrets, &config);
        observability::metrics::update_config_map_metrics(&config_maps);
        observability::metrics::increment_reconciliations();
        observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        info!(
            receivers = config.receivers.len(),
            duration_secs = start.elapsed().as_secs_f64(),
            "Finished reconcile"
        );

        Ok(self.readiness.result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        CONFIGMAP_NAME_MANAGED_NAMESPACES, CONFIGMAP_NAME_OCM_AGENT, SECRET_NAME_ALERTMANAGER,
        SECRET_NAME_PAGERDUTY,
    };

    #[test]
    fn test_is_watched() {
        assert!(is_watched(SECRET_NAME_PAGERDUTY));
        assert!(is_watched(SECRET_NAME_ALERTMANAGER));
        assert!(is_watched(CONFIGMAP_NAME_OCM_AGENT));
        assert!(is_watched(CONFIGMAP_NAME_MANAGED_NAMESPACES));
        assert!(!is_watched("kube-root-ca.crt"));
        assert!(!is_watched(""));
    }
}
