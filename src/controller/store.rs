//! # Cluster Store
//!
//! Read and write access to the cluster state a reconciliation pass touches.
//!
//! [`ClusterStore`] is the seam between the reconciler and the Kubernetes API so the
//! reconciler can be exercised against an in-memory store in tests.

use crate::constants::{CLUSTER_PROXY_NAME, CLUSTER_VERSION_NAME};
use crate::crd::{ClusterVersion, Proxy};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The object cannot be addressed, so it is neither replaced nor created
    #[error("invalid object: {0}")]
    InvalidObject(String),
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound(api_err.message),
            other => Self::Kube(other),
        }
    }
}

/// Cluster state consumed and produced by a reconciliation pass
#[async_trait]
pub trait ClusterStore: Send + Sync {
    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>, StoreError>;

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, StoreError>;

    /// `spec.clusterID` of the `version` ClusterVersion
    async fn cluster_id(&self) -> Result<String, StoreError>;

    /// `status.httpsProxy` of the `cluster` Proxy; empty when no proxy is configured
    async fn cluster_https_proxy(&self) -> Result<String, StoreError>;

    /// Replace an existing secret. Returns [`StoreError::NotFound`] when it does not exist.
    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError>;

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError>;
}

/// [`ClusterStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl std::fmt::Debug for KubeClusterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterStore").finish_non_exhaustive()
    }
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn secret_location(secret: &Secret) -> Result<(&str, &str), StoreError> {
    match (
        secret.metadata.namespace.as_deref(),
        secret.metadata.name.as_deref(),
    ) {
        (Some(namespace), Some(name)) => Ok((namespace, name)),
        _ => Err(StoreError::InvalidObject(
            "secret is missing a name or namespace".to_string(),
        )),
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn list_secrets(&self, namespace: &str) -> Result<Vec<Secret>, StoreError> {
        let list = self.secrets(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_config_maps(&self, namespace: &str) -> Result<Vec<ConfigMap>, StoreError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn cluster_id(&self) -> Result<String, StoreError> {
        let api: Api<ClusterVersion> = Api::all(self.client.clone());
        let version = api.get(CLUSTER_VERSION_NAME).await?;
        Ok(version.spec.cluster_id)
    }

    async fn cluster_https_proxy(&self) -> Result<String, StoreError> {
        let api: Api<Proxy> = Api::all(self.client.clone());
        let proxy = api.get(CLUSTER_PROXY_NAME).await?;
        Ok(proxy.status.map(|s| s.https_proxy).unwrap_or_default())
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let (namespace, name) = secret_location(secret)?;
        self.secrets(namespace)
            .replace(name, &PostParams::default(), secret)
            .await?;
        Ok(())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        let (namespace, _) = secret_location(secret)?;
        self.secrets(namespace)
            .create(&PostParams::default(), secret)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_secret_location_requires_name_and_namespace() {
        let err = secret_location(&Secret::default()).expect_err("Should reject unnamed secret");
        assert!(matches!(err, StoreError::InvalidObject(_)));
        assert!(!err.is_not_found());

        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("alertmanager-main".to_string()),
                namespace: Some("openshift-monitoring".to_string()),
                ..ObjectMeta::default()
            },
            ..Secret::default()
        };
        assert_eq!(
            secret_location(&secret).expect("Should locate secret"),
            ("openshift-monitoring", "alertmanager-main")
        );
    }
}
