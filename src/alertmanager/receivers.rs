//! # Receivers
//!
//! Receiver definitions for every notifier the operator can enable.
//! Each builder returns an empty list when its input is unset.

use super::types::{HttpConfig, NotifierConfig, PagerdutyConfig, Receiver, WebhookConfig};
use std::collections::BTreeMap;

pub const RECEIVER_NULL: &str = "null";
pub const RECEIVER_WATCHDOG: &str = "watchdog";
pub const RECEIVER_OCM_AGENT: &str = "ocmagent";
pub const RECEIVER_PAGERDUTY: &str = "pagerduty";
pub const RECEIVER_MAKE_IT_WARNING: &str = "make-it-warning";
pub const RECEIVER_MAKE_IT_ERROR: &str = "make-it-error";
pub const RECEIVER_MAKE_IT_CRITICAL: &str = "make-it-critical";
pub const RECEIVER_GOALERT: &str = "goalert";
pub const RECEIVER_GOALERT_LOW: &str = "goalert-low";
pub const RECEIVER_GOALERT_HIGH: &str = "goalert-high";
pub const RECEIVER_GOALERT_HEARTBEAT: &str = "goalert-heartbeat";

const PAGERDUTY_SEVERITY: &str =
    "{{ if .CommonLabels.severity }}{{ .CommonLabels.severity | toLower }}{{ else }}critical{{ end }}";
const PAGERDUTY_CLIENT_URL: &str = r#"{{ template "pagerduty.default.clientURL" . }}"#;
const PAGERDUTY_DESCRIPTION: &str =
    "{{ .CommonLabels.alertname }} {{ .CommonLabels.severity | toUpper }} ({{ len .Alerts }})";
const PAGERDUTY_LINK: &str = "{{ if .CommonAnnotations.runbook_url }}{{ .CommonAnnotations.runbook_url }}{{ else if .CommonAnnotations.link }}{{ .CommonAnnotations.link }}{{ else }}https://github.com/openshift/ops-sop/tree/master/v4/alerts/{{ .CommonLabels.alertname }}.md{{ end }}";
const PAGERDUTY_RESOLVED: &str = r#"{{ template "pagerduty.default.instances" .Alerts.Resolved }}"#;
const OCM_CONSOLE_URL: &str = "https://console.redhat.com/openshift/details/";

/// Cluster name is embedded in the default client URL, which FedRAMP treats as sensitive
pub const FEDRAMP_CLIENT_URL: &str = "ROSA";

const SEND_RESOLVED: NotifierConfig = NotifierConfig {
    send_resolved: true,
};

fn webhook(url: &str, proxy: &str) -> WebhookConfig {
    WebhookConfig {
        notifier: SEND_RESOLVED,
        http_config: HttpConfig::for_proxy(proxy),
        url: url.to_string(),
    }
}

fn webhook_receiver(name: &str, config: WebhookConfig) -> Receiver {
    Receiver {
        name: name.to_string(),
        webhook_configs: vec![config],
        ..Receiver::default()
    }
}

/// Dead Man's Snitch
pub fn watchdog_receivers(watchdog_url: &str, proxy: &str) -> Vec<Receiver> {
    if watchdog_url.is_empty() {
        return Vec::new();
    }
    vec![webhook_receiver(RECEIVER_WATCHDOG, webhook(watchdog_url, proxy))]
}

/// OCM Agent runs in-cluster, so it never goes through the proxy
pub fn ocm_agent_receivers(ocm_agent_url: &str) -> Vec<Receiver> {
    if ocm_agent_url.is_empty() {
        return Vec::new();
    }
    vec![webhook_receiver(RECEIVER_OCM_AGENT, webhook(ocm_agent_url, ""))]
}

pub fn heartbeat_receivers(heartbeat_url: &str, proxy: &str) -> Vec<Receiver> {
    if heartbeat_url.is_empty() {
        return Vec::new();
    }
    vec![webhook_receiver(RECEIVER_GOALERT_HEARTBEAT, webhook(heartbeat_url, proxy))]
}

/// `goalert` and `goalert-low` go to the low-priority service, `goalert-high` to the high one
///
/// Keep this order: the low URL never backs `goalert-high`.
pub fn goalert_receivers(low_url: &str, high_url: &str, proxy: &str) -> Vec<Receiver> {
    if low_url.is_empty() || high_url.is_empty() {
        return Vec::new();
    }
    vec![
        webhook_receiver(RECEIVER_GOALERT, webhook(low_url, proxy)),
        webhook_receiver(RECEIVER_GOALERT_LOW, webhook(low_url, proxy)),
        webhook_receiver(RECEIVER_GOALERT_HIGH, webhook(high_url, proxy)),
    ]
}

/// PagerDuty integration with the alert's own severity
pub fn pagerduty_config(
    routing_key: &str,
    cluster_id: &str,
    proxy: &str,
    fedramp: bool,
) -> PagerdutyConfig {
    let mut details: BTreeMap<String, String> = [
        ("alert_name", "{{ .CommonLabels.alertname }}".to_string()),
        ("link", PAGERDUTY_LINK.to_string()),
        ("ocm_link", format!("{OCM_CONSOLE_URL}{cluster_id}")),
        ("num_firing", "{{ .Alerts.Firing | len }}".to_string()),
        ("num_resolved", "{{ .Alerts.Resolved | len }}".to_string()),
        ("resolved", PAGERDUTY_RESOLVED.to_string()),
        ("cluster_id", cluster_id.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let mut client_url = PAGERDUTY_CLIENT_URL.to_string();

    if fedramp {
        for key in ["ocm_link", "resolved", "cluster_id", "firing"] {
            details.insert(key.to_string(), String::new());
        }
        client_url = FEDRAMP_CLIENT_URL.to_string();
    }

    PagerdutyConfig {
        notifier: SEND_RESOLVED,
        http_config: HttpConfig::for_proxy(proxy),
        routing_key: routing_key.to_string(),
        client_url,
        description: PAGERDUTY_DESCRIPTION.to_string(),
        details,
        severity: PAGERDUTY_SEVERITY.to_string(),
        ..PagerdutyConfig::default()
    }
}

/// `pagerduty` plus the three severity-override receivers built from the same routing key
pub fn pagerduty_receivers(
    routing_key: &str,
    cluster_id: &str,
    proxy: &str,
    fedramp: bool,
) -> Vec<Receiver> {
    if routing_key.is_empty() {
        return Vec::new();
    }

    [
        (RECEIVER_PAGERDUTY, None),
        (RECEIVER_MAKE_IT_WARNING, Some("warning")),
        (RECEIVER_MAKE_IT_ERROR, Some("error")),
        (RECEIVER_MAKE_IT_CRITICAL, Some("critical")),
    ]
    .into_iter()
    .map(|(name, severity)| {
        let mut config = pagerduty_config(routing_key, cluster_id, proxy, fedramp);
        if let Some(severity) = severity {
            config.severity = severity.to_string();
        }
        Receiver {
            name: name.to_string(),
            pagerduty_configs: vec![config],
            ..Receiver::default()
        }
    })
    .collect()
}
