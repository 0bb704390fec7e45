//! Common test utilities for reconciler integration tests
//!
//! In-memory stand-ins for the cluster store and the readiness check, plus
//! builders for the Secrets and ConfigMaps the operator reads.

#![allow(dead_code, reason = "Each test binary uses a different subset")]

use async_trait::async_trait;
use configure_alertmanager_operator::config::ControllerConfig;
use configure_alertmanager_operator::constants::{
    ALERTMANAGER_CONFIG_KEY, CONFIGMAP_KEY_NAMESPACES, DEFAULT_OPERATOR_NAMESPACE,
};
use configure_alertmanager_operator::controller::readiness::{
    Readiness, ReadinessError, Requeue,
};
use configure_alertmanager_operator::controller::reconciler::Reconciler;
use configure_alertmanager_operator::controller::store::{ClusterStore, StoreError};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const NAMESPACE: &str = DEFAULT_OPERATOR_NAMESPACE;

fn meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..ObjectMeta::default()
    }
}

pub fn secret(name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: meta(name),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Secret::default()
    }
}

pub fn config_map(name: &str, data: &[(&str, &str)]) -> ConfigMap {
    ConfigMap {
        metadata: meta(name),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ),
        ..ConfigMap::default()
    }
}

/// Namespace ConfigMap in the `Resources.Namespace[].name` layout
pub fn namespace_config_map(name: &str, namespaces: &[&str]) -> ConfigMap {
    let mut document = String::from("Resources:\n  Namespace:\n");
    for namespace in namespaces {
        let _ = writeln!(document, "  - name: {namespace}");
    }
    config_map(name, &[(CONFIGMAP_KEY_NAMESPACES, document.as_str())])
}

fn not_found(what: &str) -> StoreError {
    StoreError::NotFound(what.to_string())
}

/// In-memory cluster store recording every write
#[derive(Debug, Default)]
pub struct FakeClusterStore {
    pub secrets: Vec<Secret>,
    pub config_maps: Vec<ConfigMap>,
    pub cluster_id: String,
    pub proxy: String,
    /// `replace_secret` reports NotFound, as when `alertmanager-main` does not exist yet
    pub missing_target: bool,
    /// Listing calls fail
    pub fail_lists: bool,
    /// Cluster ID and proxy lookups fail
    pub fail_cluster_reads: bool,
    /// `replace_secret` fails with an error other than NotFound
    pub fail_replace_with_other: bool,
    pub replaced: Mutex<Vec<Secret>>,
    pub created: Mutex<Vec<Secret>>,
}

impl FakeClusterStore {
    pub fn with_objects(secrets: Vec<Secret>, config_maps: Vec<ConfigMap>) -> Self {
        Self {
            secrets,
            config_maps,
            ..Self::default()
        }
    }

    pub fn replaced_count(&self) -> usize {
        self.replaced.lock().expect("Should lock").len()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().expect("Should lock").len()
    }

    /// `alertmanager.yaml` of the most recent write, replaced or created
    pub fn last_document(&self) -> Option<String> {
        let replaced = self.replaced.lock().expect("Should lock");
        let created = self.created.lock().expect("Should lock");
        created
            .last()
            .or_else(|| replaced.last())
            .and_then(|secret| secret.data.as_ref())
            .and_then(|data| data.get(ALERTMANAGER_CONFIG_KEY))
            .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
    }
}

#[async_trait]
impl ClusterStore for FakeClusterStore {
    async fn list_secrets(&self, _namespace: &str) -> Result<Vec<Secret>, StoreError> {
        if self.fail_lists {
            return Err(not_found("secrets"));
        }
        Ok(self.secrets.clone())
    }

    async fn list_config_maps(&self, _namespace: &str) -> Result<Vec<ConfigMap>, StoreError> {
        if self.fail_lists {
            return Err(not_found("configmaps"));
        }
        Ok(self.config_maps.clone())
    }

    async fn cluster_id(&self) -> Result<String, StoreError> {
        if self.fail_cluster_reads {
            return Err(not_found("clusterversion"));
        }
        Ok(self.cluster_id.clone())
    }

    async fn cluster_https_proxy(&self) -> Result<String, StoreError> {
        if self.fail_cluster_reads {
            return Err(not_found("proxy"));
        }
        Ok(self.proxy.clone())
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        if self.fail_replace_with_other {
            return Err(StoreError::InvalidObject("alertmanager-main".to_string()));
        }
        if self.missing_target {
            return Err(not_found("alertmanager-main"));
        }
        self.replaced
            .lock()
            .expect("Should lock")
            .push(secret.clone());
        Ok(())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<(), StoreError> {
        self.created.lock().expect("Should lock").push(secret.clone());
        Ok(())
    }
}

/// Readiness with a fixed answer and requeue policy
#[derive(Debug)]
pub struct FakeReadiness {
    pub ready: bool,
    pub fail: bool,
    pub requeue: Requeue,
    pub calls: AtomicUsize,
}

impl FakeReadiness {
    pub fn ready() -> Self {
        Self::new(true, false, Requeue::Never)
    }

    pub fn not_ready(requeue: Requeue) -> Self {
        Self::new(false, false, requeue)
    }

    pub fn failing(requeue: Requeue) -> Self {
        Self::new(false, true, requeue)
    }

    fn new(ready: bool, fail: bool, requeue: Requeue) -> Self {
        Self {
            ready,
            fail,
            requeue,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Readiness for FakeReadiness {
    async fn is_ready(&self) -> Result<bool, ReadinessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReadinessError::JobLookup(not_found("osd-cluster-ready")));
        }
        Ok(self.ready)
    }

    fn result(&self) -> Requeue {
        self.requeue
    }
}

pub fn reconciler(
    store: &Arc<FakeClusterStore>,
    readiness: &Arc<FakeReadiness>,
    fedramp: bool,
) -> Reconciler {
    let config = ControllerConfig {
        fedramp,
        ..ControllerConfig::default()
    };
    Reconciler::new(store.clone(), readiness.clone(), &config)
}
