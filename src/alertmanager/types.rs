//! # Alertmanager Configuration Types
//!
//! The subset of the upstream Alertmanager configuration schema this operator renders.
//!
//! Field names and nesting follow the upstream YAML schema exactly. Optional values
//! are omitted when empty so the rendered document only carries what was configured.
//! Label maps use [`BTreeMap`] so the encoded document is byte-stable between passes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Label name to value (or regex) pairs
pub type LabelSet = BTreeMap<String, String>;

/// Errors raised while encoding or decoding a [`Config`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("notification config name {0:?} is not unique")]
    DuplicateReceiver(String),
    #[error("failed to encode Alertmanager config: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error("failed to decode Alertmanager config: {0}")]
    Decode(#[source] serde_yaml::Error),
}

/// Root of the Alertmanager configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<GlobalConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inhibit_rules: Vec<InhibitRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receivers: Vec<Receiver>,
    /// Always emitted, even when empty
    #[serde(default)]
    pub templates: Vec<String>,
}

impl Config {
    /// Encode to YAML after checking receiver names are unique
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        serde_yaml::to_string(self).map_err(ConfigError::Encode)
    }

    /// Decode from YAML, rejecting documents with duplicate receiver names
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw).map_err(ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every receiver name appears once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::with_capacity(self.receivers.len());
        for receiver in &self.receivers {
            if !names.insert(receiver.name.as_str()) {
                return Err(ConfigError::DuplicateReceiver(receiver.name.clone()));
            }
        }
        Ok(())
    }

    pub fn receiver(&self, name: &str) -> Option<&Receiver> {
        self.receivers.iter().find(|r| r.name == name)
    }

    pub fn has_receiver(&self, name: &str) -> bool {
        self.receiver(name).is_some()
    }
}

/// Parameters valid globally unless overridden per notifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Time after which an alert is declared resolved if it has not been updated
    #[serde(default)]
    pub resolve_timeout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pagerduty_url: String,
}

/// A node of the routing tree
///
/// Siblings are evaluated in order. The first match without `continue` stops
/// evaluation at that level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    #[serde(default, rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: LabelSet,
    #[serde(default, rename = "match_re", skip_serializing_if = "BTreeMap::is_empty")]
    pub match_re: LabelSet,
    #[serde(default, rename = "continue", skip_serializing_if = "std::ops::Not::not")]
    pub continue_matching: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group_wait: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group_interval: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repeat_interval: String,
}

/// A named bundle of notification integrations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    /// Must be unique across the whole config
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pagerduty_configs: Vec<PagerdutyConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub webhook_configs: Vec<WebhookConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_configs: Vec<EmailConfig>,
}

impl Receiver {
    /// Receiver with no integrations; alerts routed here are dropped
    pub fn blackhole(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_blackhole(&self) -> bool {
        self.pagerduty_configs.is_empty()
            && self.webhook_configs.is_empty()
            && self.email_configs.is_empty()
    }
}

/// Options shared by every notifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub send_resolved: bool,
}

/// HTTP client settings for a notifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_url: String,
}

impl HttpConfig {
    /// `None` when no proxy is configured, so the block is left out entirely
    pub fn for_proxy(proxy_url: &str) -> Option<Self> {
        (!proxy_url.is_empty()).then(|| Self {
            proxy_url: proxy_url.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(flatten)]
    pub notifier: NotifierConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpConfig>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagerdutyConfig {
    #[serde(flatten)]
    pub notifier: NotifierConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_config: Option<HttpConfig>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub routing_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
}

/// Email notifier. Part of the schema but never rendered by this operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(flatten)]
    pub notifier: NotifierConfig,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hello: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub smarthost: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_identity: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_tls: Option<bool>,
}

/// Mutes target alerts while a matching source alert fires
///
/// A label listed in `equal` that is missing on both alerts counts as equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InhibitRule {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_match: LabelSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_match_re: LabelSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target_match: LabelSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target_match_re: LabelSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equal: Vec<String>,
}

/// Document stored in the `managed-namespaces` and `ocp-namespaces` ConfigMaps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    #[serde(rename = "Resources", default)]
    pub resources: NamespaceResources,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceResources {
    #[serde(rename = "Namespace", default)]
    pub namespaces: Vec<NamespaceEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub name: String,
}

/// Build a [`LabelSet`] from static pairs
pub fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
