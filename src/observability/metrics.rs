//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! Presence gauges, labelled `name="configure-alertmanager-operator"`, set to 1 or 0
//! after every completed pass:
//!
//! - `ga_secret_exists`, `pd_secret_exists`, `dms_secret_exists`, `am_secret_exists`
//! - `am_secret_contains_ga`, `am_secret_contains_pd`, `am_secret_contains_dms`
//! - `managed_namespaces_configmap_exists`, `ocp_namespaces_configmap_exists`
//!
//! Reconciliation health:
//!
//! - `alertmanager_operator_reconciliations_total`
//! - `alertmanager_operator_reconciliation_errors_total`
//! - `alertmanager_operator_reconciliation_duration_seconds`
//! - `alertmanager_operator_requeues_total{reason}`
//! - `alertmanager_operator_config_write_errors_total`

use crate::alertmanager::receivers::{RECEIVER_GOALERT, RECEIVER_PAGERDUTY, RECEIVER_WATCHDOG};
use crate::alertmanager::Config;
use crate::constants::{
    CONFIGMAP_NAME_MANAGED_NAMESPACES, CONFIGMAP_NAME_OCP_NAMESPACES, OPERATOR_NAME,
    SECRET_NAME_ALERTMANAGER, SECRET_NAME_DMS, SECRET_NAME_GOALERT, SECRET_NAME_PAGERDUTY,
};
use anyhow::Result;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn presence_gauge(name: &str, help: &str) -> IntGaugeVec {
    IntGaugeVec::new(prometheus::Opts::new(name, help), &["name"])
        .expect("Failed to create presence gauge - this should never happen")
}

static GA_SECRET_EXISTS: LazyLock<IntGaugeVec> =
    LazyLock::new(|| presence_gauge("ga_secret_exists", "GoAlert secret exists"));

static PD_SECRET_EXISTS: LazyLock<IntGaugeVec> =
    LazyLock::new(|| presence_gauge("pd_secret_exists", "Pager Duty secret exists"));

static DMS_SECRET_EXISTS: LazyLock<IntGaugeVec> =
    LazyLock::new(|| presence_gauge("dms_secret_exists", "Dead Man's Snitch secret exists"));

static AM_SECRET_EXISTS: LazyLock<IntGaugeVec> =
    LazyLock::new(|| presence_gauge("am_secret_exists", "AlertManager Config secret exists"));

static AM_SECRET_CONTAINS_GA: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    presence_gauge(
        "am_secret_contains_ga",
        "AlertManager Config contains configuration for GoAlert",
    )
});

static AM_SECRET_CONTAINS_PD: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    presence_gauge(
        "am_secret_contains_pd",
        "AlertManager Config contains configuration for Pager Duty",
    )
});

static AM_SECRET_CONTAINS_DMS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    presence_gauge(
        "am_secret_contains_dms",
        "AlertManager Config contains configuration for Dead Man's Snitch",
    )
});

static MANAGED_NAMESPACES_CONFIGMAP_EXISTS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    presence_gauge(
        "managed_namespaces_configmap_exists",
        "managed-namespaces configMap exists",
    )
});

static OCP_NAMESPACES_CONFIGMAP_EXISTS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    presence_gauge(
        "ocp_namespaces_configmap_exists",
        "ocp-namespaces configMap exists",
    )
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "alertmanager_operator_reconciliations_total",
        "Total number of completed reconciliation passes",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "alertmanager_operator_reconciliation_errors_total",
        "Total number of reconciliation passes that returned an error",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "alertmanager_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "alertmanager_operator_requeues_total",
            "Total number of scheduled requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static CONFIG_WRITE_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "alertmanager_operator_config_write_errors_total",
        "Total number of failed writes of the alertmanager-main secret",
    )
    .expect("Failed to create CONFIG_WRITE_ERRORS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(GA_SECRET_EXISTS.clone()))?;
    REGISTRY.register(Box::new(PD_SECRET_EXISTS.clone()))?;
    REGISTRY.register(Box::new(DMS_SECRET_EXISTS.clone()))?;
    REGISTRY.register(Box::new(AM_SECRET_EXISTS.clone()))?;
    REGISTRY.register(Box::new(AM_SECRET_CONTAINS_GA.clone()))?;
    REGISTRY.register(Box::new(AM_SECRET_CONTAINS_PD.clone()))?;
    REGISTRY.register(Box::new(AM_SECRET_CONTAINS_DMS.clone()))?;
    REGISTRY.register(Box::new(MANAGED_NAMESPACES_CONFIGMAP_EXISTS.clone()))?;
    REGISTRY.register(Box::new(OCP_NAMESPACES_CONFIGMAP_EXISTS.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIG_WRITE_ERRORS_TOTAL.clone()))?;

    Ok(())
}

/// Presence flags derived from the listed secrets and the config just rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecretsPresence {
    pub goalert_secret: bool,
    pub pagerduty_secret: bool,
    pub dms_secret: bool,
    pub alertmanager_secret: bool,
    pub contains_goalert: bool,
    pub contains_pagerduty: bool,
    pub contains_dms: bool,
}

/// The `contains` flags only count when both the input secret and `alertmanager-main`
/// were present at list time
pub fn secrets_presence(secrets: &[Secret], config: &Config) -> SecretsPresence {
    let exists = |name: &str| {
        secrets
            .iter()
            .any(|s| s.metadata.name.as_deref() == Some(name))
    };

    let mut presence = SecretsPresence {
        goalert_secret: exists(SECRET_NAME_GOALERT),
        pagerduty_secret: exists(SECRET_NAME_PAGERDUTY),
        dms_secret: exists(SECRET_NAME_DMS),
        alertmanager_secret: exists(SECRET_NAME_ALERTMANAGER),
        ..SecretsPresence::default()
    };

    if presence.alertmanager_secret {
        presence.contains_goalert = presence.goalert_secret && config.has_receiver(RECEIVER_GOALERT);
        presence.contains_pagerduty =
            presence.pagerduty_secret && config.has_receiver(RECEIVER_PAGERDUTY);
        presence.contains_dms = presence.dms_secret && config.has_receiver(RECEIVER_WATCHDOG);
    }

    presence
}

fn set_flag(gauge: &IntGaugeVec, value: bool) {
    gauge
        .with_label_values(&[OPERATOR_NAME])
        .set(i64::from(value));
}

pub fn update_secrets_metrics(secrets: &[Secret], config: &Config) {
    let presence = secrets_presence(secrets, config);
    set_flag(&GA_SECRET_EXISTS, presence.goalert_secret);
    set_flag(&PD_SECRET_EXISTS, presence.pagerduty_secret);
    set_flag(&DMS_SECRET_EXISTS, presence.dms_secret);
    set_flag(&AM_SECRET_EXISTS, presence.alertmanager_secret);
    set_flag(&AM_SECRET_CONTAINS_GA, presence.contains_goalert);
    set_flag(&AM_SECRET_CONTAINS_PD, presence.contains_pagerduty);
    set_flag(&AM_SECRET_CONTAINS_DMS, presence.contains_dms);
}

pub fn update_config_map_metrics(config_maps: &[ConfigMap]) {
    let exists = |name: &str| {
        config_maps
            .iter()
            .any(|cm| cm.metadata.name.as_deref() == Some(name))
    };
    set_flag(
        &MANAGED_NAMESPACES_CONFIGMAP_EXISTS,
        exists(CONFIGMAP_NAME_MANAGED_NAMESPACES),
    );
    set_flag(
        &OCP_NAMESPACES_CONFIGMAP_EXISTS,
        exists(CONFIGMAP_NAME_OCP_NAMESPACES),
    );
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_config_write_errors() {
    CONFIG_WRITE_ERRORS_TOTAL.inc();
}
