//! # Input Extraction
//!
//! Turns the Secrets and ConfigMaps listed from the operator namespace into the plain
//! values consumed by the config builder.
//!
//! Nothing here fails. A missing object, a missing key, or an unreadable document all
//! degrade to "not configured" so the pass can still render a minimal configuration.

use crate::alertmanager::NamespaceConfig;
use crate::constants::{
    CONFIGMAP_KEY_NAMESPACES, CONFIGMAP_KEY_OCM_AGENT, CONFIGMAP_NAME_MANAGED_NAMESPACES,
    CONFIGMAP_NAME_OCM_AGENT, CONFIGMAP_NAME_OCP_NAMESPACES, DEFAULT_NAMESPACES,
    SECRET_KEY_DMS, SECRET_KEY_GOALERT_HEARTBEAT, SECRET_KEY_GOALERT_HIGH,
    SECRET_KEY_GOALERT_LOW, SECRET_KEY_PAGERDUTY, SECRET_NAME_DMS, SECRET_NAME_GOALERT,
    SECRET_NAME_PAGERDUTY,
};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use tracing::{debug, info, warn};

/// Credential values read from the notifier secrets
///
/// Empty strings mean the notifier is not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretInputs {
    pub pagerduty_key: String,
    pub watchdog_url: String,
    pub goalert_low_url: String,
    pub goalert_high_url: String,
    pub goalert_heartbeat_url: String,
}

pub fn find_secret<'a>(secrets: &'a [Secret], name: &str) -> Option<&'a Secret> {
    let found = secrets
        .iter()
        .find(|s| s.metadata.name.as_deref() == Some(name));
    debug!(secret = name, found = found.is_some(), "secret lookup");
    found
}

pub fn find_config_map<'a>(config_maps: &'a [ConfigMap], name: &str) -> Option<&'a ConfigMap> {
    let found = config_maps
        .iter()
        .find(|cm| cm.metadata.name.as_deref() == Some(name));
    debug!(config_map = name, found = found.is_some(), "configmap lookup");
    found
}

/// Value of `key` in a Secret's `data`, decoded as UTF-8, or empty when absent
fn secret_value(secret: &Secret, key: &str) -> String {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
        .unwrap_or_default()
}

fn config_map_value(config_map: &ConfigMap, key: &str) -> String {
    config_map
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .cloned()
        .unwrap_or_default()
}

/// Extract notifier credentials
///
/// The snitch URL is read whenever `dms-secret` exists. PagerDuty and GoAlert values
/// are only read once the cluster is ready, so paging stays off during installation.
pub fn parse_secrets(secrets: &[Secret], cluster_ready: bool) -> SecretInputs {
    let mut inputs = SecretInputs::default();

    match find_secret(secrets, SECRET_NAME_PAGERDUTY) {
        Some(secret) if cluster_ready => {
            info!("Cluster is ready; configuring PagerDuty");
            inputs.pagerduty_key = secret_value(secret, SECRET_KEY_PAGERDUTY);
        }
        Some(_) => info!("Cluster is not ready; skipping PagerDuty configuration"),
        None => info!("PagerDuty secret does not exist"),
    }

    match find_secret(secrets, SECRET_NAME_DMS) {
        Some(secret) => {
            info!("Dead Man's Snitch secret exists");
            inputs.watchdog_url = secret_value(secret, SECRET_KEY_DMS);
        }
        None => info!("Dead Man's Snitch secret does not exist"),
    }

    match find_secret(secrets, SECRET_NAME_GOALERT) {
        Some(secret) if cluster_ready => {
            info!("Cluster is ready; configuring GoAlert");
            inputs.goalert_low_url = secret_value(secret, SECRET_KEY_GOALERT_LOW);
            inputs.goalert_high_url = secret_value(secret, SECRET_KEY_GOALERT_HIGH);
            inputs.goalert_heartbeat_url = secret_value(secret, SECRET_KEY_GOALERT_HEARTBEAT);
        }
        Some(_) => info!("Cluster is not ready; skipping GoAlert configuration"),
        None => info!("GoAlert secret does not exist"),
    }

    inputs
}

/// Namespace regexes from one namespace ConfigMap; empty on any problem
fn namespace_config_map(config_maps: &[ConfigMap], name: &str) -> Vec<String> {
    let Some(config_map) = find_config_map(config_maps, name) else {
        info!(config_map = name, "ConfigMap does not exist");
        return Vec::new();
    };

    let raw = config_map_value(config_map, CONFIGMAP_KEY_NAMESPACES);
    let parsed: NamespaceConfig = match serde_yaml::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(config_map = name, error = %e, "Unable to decode namespace document");
            return Vec::new();
        }
    };

    parsed
        .resources
        .namespaces
        .iter()
        .map(|ns| format!("^{}$", ns.name))
        .collect()
}

/// Namespace regexes for the per-namespace paging routes
///
/// Managed namespaces come first, then OCP namespaces. If either ConfigMap is missing,
/// unreadable, or lists nothing, the whole list falls back to [`DEFAULT_NAMESPACES`].
pub fn parse_namespaces(config_maps: &[ConfigMap]) -> Vec<String> {
    let managed = namespace_config_map(config_maps, CONFIGMAP_NAME_MANAGED_NAMESPACES);
    let ocp = namespace_config_map(config_maps, CONFIGMAP_NAME_OCP_NAMESPACES);

    if managed.is_empty() || ocp.is_empty() {
        info!(
            defaults = ?DEFAULT_NAMESPACES,
            "Could not retrieve namespaces from one or more ConfigMaps; using defaults"
        );
        return DEFAULT_NAMESPACES.iter().map(|ns| (*ns).to_string()).collect();
    }

    managed.into_iter().chain(ocp).collect()
}

/// Whether `raw` is usable verbatim as a webhook URL
///
/// `Url::parse` strips surrounding whitespace and control characters before parsing,
/// so those are rejected up front; the raw value is what ends up in the config.
fn is_absolute_url(raw: &str) -> Result<(), String> {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("contains whitespace or control characters".to_string());
    }
    url::Url::parse(raw)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// OCM Agent service URL, or empty when the ConfigMap is missing or the URL is not absolute
pub fn read_ocm_agent_url(config_maps: &[ConfigMap]) -> String {
    let Some(config_map) = find_config_map(config_maps, CONFIGMAP_NAME_OCM_AGENT) else {
        info!(config_map = CONFIGMAP_NAME_OCM_AGENT, "ConfigMap does not exist");
        return String::new();
    };

    let service_url = config_map_value(config_map, CONFIGMAP_KEY_OCM_AGENT);
    match is_absolute_url(&service_url) {
        Ok(()) => service_url,
        Err(e) => {
            warn!(url = %service_url, error = %e, "Invalid OCM Agent service URL");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret(name: &str, data: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            ..Secret::default()
        }
    }

    fn config_map(name: &str, key: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([(key.to_string(), value.to_string())])),
            ..ConfigMap::default()
        }
    }

    fn all_secrets() -> Vec<Secret> {
        vec![
            secret(SECRET_NAME_PAGERDUTY, &[(SECRET_KEY_PAGERDUTY, "pd-key")]),
            secret(SECRET_NAME_DMS, &[(SECRET_KEY_DMS, "https://snitch")]),
            secret(
                SECRET_NAME_GOALERT,
                &[
                    (SECRET_KEY_GOALERT_LOW, "https://low"),
                    (SECRET_KEY_GOALERT_HIGH, "https://high"),
                    (SECRET_KEY_GOALERT_HEARTBEAT, "https://heartbeat"),
                ],
            ),
        ]
    }

    const NAMESPACES_DOC: &str = "Resources:\n  Namespace:\n  - name: openshift-etcd\n  - name: openshift-ingress\n";

    #[test]
    fn test_parse_secrets_when_ready() {
        let inputs = parse_secrets(&all_secrets(), true);
        assert_eq!(inputs.pagerduty_key, "pd-key");
        assert_eq!(inputs.watchdog_url, "https://snitch");
        assert_eq!(inputs.goalert_low_url, "https://low");
        assert_eq!(inputs.goalert_high_url, "https://high");
        assert_eq!(inputs.goalert_heartbeat_url, "https://heartbeat");
    }

    #[test]
    fn test_parse_secrets_gates_paging_on_readiness() {
        let inputs = parse_secrets(&all_secrets(), false);
        assert!(inputs.pagerduty_key.is_empty());
        assert!(inputs.goalert_low_url.is_empty());
        assert!(inputs.goalert_heartbeat_url.is_empty());
        assert_eq!(inputs.watchdog_url, "https://snitch");
    }

    #[test]
    fn test_parse_secrets_missing_key_is_empty() {
        let secrets = vec![secret(SECRET_NAME_PAGERDUTY, &[("OTHER", "x")])];
        assert_eq!(parse_secrets(&secrets, true), SecretInputs::default());
    }

    #[test]
    fn test_parse_namespaces_combines_both_config_maps() {
        let cms = vec![
            config_map(CONFIGMAP_NAME_MANAGED_NAMESPACES, CONFIGMAP_KEY_NAMESPACES, NAMESPACES_DOC),
            config_map(
                CONFIGMAP_NAME_OCP_NAMESPACES,
                CONFIGMAP_KEY_NAMESPACES,
                "Resources:\n  Namespace:\n  - name: kube-system\n",
            ),
        ];
        assert_eq!(
            parse_namespaces(&cms),
            vec!["^openshift-etcd$", "^openshift-ingress$", "^kube-system$"]
        );
    }

    #[test]
    fn test_parse_namespaces_falls_back_when_one_is_missing() {
        let cms = vec![config_map(
            CONFIGMAP_NAME_MANAGED_NAMESPACES,
            CONFIGMAP_KEY_NAMESPACES,
            NAMESPACES_DOC,
        )];
        assert_eq!(parse_namespaces(&cms), DEFAULT_NAMESPACES.to_vec());
    }

    #[test]
    fn test_parse_namespaces_falls_back_on_malformed_yaml() {
        let cms = vec![
            config_map(CONFIGMAP_NAME_MANAGED_NAMESPACES, CONFIGMAP_KEY_NAMESPACES, NAMESPACES_DOC),
            config_map(CONFIGMAP_NAME_OCP_NAMESPACES, CONFIGMAP_KEY_NAMESPACES, "Resources: [oops"),
        ];
        assert_eq!(parse_namespaces(&cms), DEFAULT_NAMESPACES.to_vec());
    }

    #[test]
    fn test_parse_namespaces_falls_back_on_empty_list() {
        let cms = vec![
            config_map(CONFIGMAP_NAME_MANAGED_NAMESPACES, CONFIGMAP_KEY_NAMESPACES, NAMESPACES_DOC),
            config_map(
                CONFIGMAP_NAME_OCP_NAMESPACES,
                CONFIGMAP_KEY_NAMESPACES,
                "Resources:\n  Namespace: []\n",
            ),
        ];
        assert_eq!(parse_namespaces(&cms), DEFAULT_NAMESPACES.to_vec());
    }

    #[test]
    fn test_read_ocm_agent_url() {
        let cms = vec![config_map(
            CONFIGMAP_NAME_OCM_AGENT,
            CONFIGMAP_KEY_OCM_AGENT,
            "http://ocm-agent.openshift-ocm-agent-operator.svc.cluster.local:8081/alertmanager-receiver",
        )];
        assert_eq!(
            read_ocm_agent_url(&cms),
            "http://ocm-agent.openshift-ocm-agent-operator.svc.cluster.local:8081/alertmanager-receiver"
        );
    }

    #[test]
    fn test_read_ocm_agent_url_rejects_relative() {
        let cms = vec![config_map(
            CONFIGMAP_NAME_OCM_AGENT,
            CONFIGMAP_KEY_OCM_AGENT,
            "not a url",
        )];
        assert!(read_ocm_agent_url(&cms).is_empty());
        assert!(read_ocm_agent_url(&[]).is_empty());

        for raw in [
            "http://ocm-agent.svc:8081/alertmanager-receiver\n",
            "  http://ocm-agent.svc:8081/alertmanager-receiver",
            "http://ocm-agent.svc:8081/alert manager",
            "http://ocm-agent.svc:8081/\talertmanager-receiver",
        ] {
            let cms = vec![config_map(CONFIGMAP_NAME_OCM_AGENT, CONFIGMAP_KEY_OCM_AGENT, raw)];
            assert_eq!(read_ocm_agent_url(&cms), "", "{raw:?} should be rejected");
        }
    }
}
