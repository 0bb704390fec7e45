//! # Config Builder
//!
//! Pure construction of the Alertmanager [`Config`] from the values extracted from the cluster.
//!
//! The builder does no I/O and never fails. The same [`ConfigInputs`] always produce the
//! same document, so re-running a pass against unchanged cluster state rewrites identical
//! bytes. Malformed URLs are passed through untouched; Alertmanager validates them on load.

use super::inhibit::inhibit_rules;
use super::receivers::{
    goalert_receivers, heartbeat_receivers, ocm_agent_receivers, pagerduty_receivers,
    watchdog_receivers, RECEIVER_NULL,
};
use super::routes::{goalert_route, heartbeat_route, ocm_agent_route, pagerduty_route, watchdog_route};
use super::types::{Config, GlobalConfig, Receiver, Route};
use crate::constants::PAGERDUTY_URL;

/// Everything the builder needs, already extracted from cluster state
///
/// Empty strings mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInputs {
    pub pagerduty_key: String,
    pub watchdog_url: String,
    pub ocm_agent_url: String,
    pub goalert_low_url: String,
    pub goalert_high_url: String,
    pub goalert_heartbeat_url: String,
    pub cluster_id: String,
    pub cluster_proxy: String,
    /// Namespace regexes that page through the per-namespace routes
    pub namespaces: Vec<String>,
    pub fedramp: bool,
}

/// Build the full Alertmanager configuration
pub fn build_config(inputs: &ConfigInputs) -> Config {
    let mut routes: Vec<Route> = Vec::new();
    let mut receivers: Vec<Receiver> = Vec::new();
    let proxy = inputs.cluster_proxy.as_str();

    if !inputs.watchdog_url.is_empty() {
        routes.push(watchdog_route());
        receivers.extend(watchdog_receivers(&inputs.watchdog_url, proxy));
    }

    if !inputs.ocm_agent_url.is_empty() {
        routes.push(ocm_agent_route());
        receivers.extend(ocm_agent_receivers(&inputs.ocm_agent_url));
    }

    if !inputs.pagerduty_key.is_empty() {
        routes.push(pagerduty_route(&inputs.namespaces, inputs.fedramp));
        receivers.extend(pagerduty_receivers(
            &inputs.pagerduty_key,
            &inputs.cluster_id,
            proxy,
            inputs.fedramp,
        ));
    }

    if inputs.fedramp {
        if !inputs.goalert_heartbeat_url.is_empty() {
            routes.push(heartbeat_route());
            receivers.extend(heartbeat_receivers(&inputs.goalert_heartbeat_url, proxy));
        }

        if !inputs.goalert_low_url.is_empty() && !inputs.goalert_high_url.is_empty() {
            routes.push(goalert_route(&inputs.namespaces, inputs.fedramp));
            receivers.extend(goalert_receivers(
                &inputs.goalert_low_url,
                &inputs.goalert_high_url,
                proxy,
            ));
        }
    }

    receivers.push(Receiver::blackhole(RECEIVER_NULL));

    Config {
        global: Some(GlobalConfig {
            resolve_timeout: "5m".to_string(),
            pagerduty_url: PAGERDUTY_URL.to_string(),
        }),
        route: Some(Route {
            receiver: RECEIVER_NULL.to_string(),
            group_by: vec!["job".to_string()],
            group_wait: "30s".to_string(),
            group_interval: "5m".to_string(),
            repeat_interval: "12h".to_string(),
            routes,
            ..Route::default()
        }),
        inhibit_rules: inhibit_rules(),
        receivers,
        templates: Vec::new(),
    }
}
