//! # Config Write
//!
//! Upsert of the rendered document into the `alertmanager-main` secret.

use crate::alertmanager::Config;
use crate::constants::{ALERTMANAGER_CONFIG_KEY, SECRET_NAME_ALERTMANAGER};
use crate::controller::store::{ClusterStore, StoreError};
use crate::observability;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use tracing::{error, info};

/// `alertmanager-main` holding `document` under `alertmanager.yaml`
pub fn alertmanager_secret(namespace: &str, document: String) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(SECRET_NAME_ALERTMANAGER.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([(
            ALERTMANAGER_CONFIG_KEY.to_string(),
            ByteString(document.into_bytes()),
        )])),
        ..Secret::default()
    }
}

/// Replace the secret, creating it when it does not exist yet
pub async fn upsert_secret(store: &dyn ClusterStore, secret: &Secret) -> Result<(), StoreError> {
    match store.replace_secret(secret).await {
        Err(e) if e.is_not_found() => store.create_secret(secret).await,
        other => other,
    }
}

/// Encode and write the config. Failures are logged, never returned.
pub async fn write_config(store: &dyn ClusterStore, namespace: &str, config: &Config) {
    let document = match config.to_yaml() {
        Ok(document) => document,
        Err(e) => {
            error!(error = %e, "Failed to encode Alertmanager config");
            observability::metrics::increment_config_write_errors();
            return;
        }
    };

    let secret = alertmanager_secret(namespace, document);
    match upsert_secret(store, &secret).await {
        Ok(()) => info!(
            secret = SECRET_NAME_ALERTMANAGER,
            namespace, "Secret successfully updated"
        ),
        Err(e) => {
            error!(
                secret = SECRET_NAME_ALERTMANAGER,
                namespace,
                error = %e,
                "Could not write secret"
            );
            observability::metrics::increment_config_write_errors();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alertmanager_secret_layout() {
        let secret = alertmanager_secret("openshift-monitoring", "templates: []\n".to_string());
        assert_eq!(secret.metadata.name.as_deref(), Some("alertmanager-main"));
        assert_eq!(
            secret.metadata.namespace.as_deref(),
            Some("openshift-monitoring")
        );
        let data = secret.data.expect("Should have data");
        assert_eq!(data.len(), 1);
        assert_eq!(data["alertmanager.yaml"].0, b"templates: []\n".to_vec());
    }
}
