//! # OpenShift Config Resources
//!
//! Cluster-scoped `config.openshift.io/v1` resources the operator reads for auxiliary inputs.
//!
//! Only the fields the operator consumes are declared. Unknown fields are ignored on
//! decode, so the full upstream objects deserialize cleanly.

use serde::{Deserialize, Serialize};

/// ClusterVersion singleton (`version`)
///
/// # Example
///
/// ```yaml
/// apiVersion: config.openshift.io/v1
/// kind: ClusterVersion
/// metadata:
///   name: version
/// spec:
///   clusterID: 3a9c1f0e-5d2b-4f6e-8a0b-7c1d2e3f4a5b
///   channel: stable-4.14
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(kind = "ClusterVersion", group = "config.openshift.io", version = "v1")]
pub struct ClusterVersionSpec {
    /// Unique identifier of the cluster, shown in the OCM console URL
    #[serde(rename = "clusterID", default)]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Cluster-wide egress proxy (`cluster`)
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Proxy",
    group = "config.openshift.io",
    version = "v1",
    status = "ProxyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

/// Proxy settings as observed by the cluster; the spec is only a request
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatus {
    #[serde(default)]
    pub http_proxy: String,
    /// Only the HTTPS proxy matters; every external notifier is reached over HTTPS
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub no_proxy: String,
}
