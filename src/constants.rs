//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! Object names and keys are fixed by the cluster layout and are not configurable.
//! Timing values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Operator name, used as the `name` label on every gauge
pub const OPERATOR_NAME: &str = "configure-alertmanager-operator";

/// Namespace the operator watches and writes to
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "openshift-monitoring";

// Secrets read by the operator
pub const SECRET_NAME_GOALERT: &str = "goalert-secret";
pub const SECRET_NAME_PAGERDUTY: &str = "pd-secret";
pub const SECRET_NAME_DMS: &str = "dms-secret";

/// Secret the rendered configuration is written to
pub const SECRET_NAME_ALERTMANAGER: &str = "alertmanager-main";

/// Key inside [`SECRET_NAME_ALERTMANAGER`] holding the rendered document
pub const ALERTMANAGER_CONFIG_KEY: &str = "alertmanager.yaml";

pub const SECRET_KEY_GOALERT_LOW: &str = "GOALERT_URL_LOW";
pub const SECRET_KEY_GOALERT_HIGH: &str = "GOALERT_URL_HIGH";
pub const SECRET_KEY_GOALERT_HEARTBEAT: &str = "GOALERT_HEARTBEAT";
pub const SECRET_KEY_PAGERDUTY: &str = "PAGERDUTY_KEY";
pub const SECRET_KEY_DMS: &str = "SNITCH_URL";

// ConfigMaps read by the operator
pub const CONFIGMAP_NAME_MANAGED_NAMESPACES: &str = "managed-namespaces";
pub const CONFIGMAP_NAME_OCP_NAMESPACES: &str = "ocp-namespaces";
pub const CONFIGMAP_NAME_OCM_AGENT: &str = "ocm-agent";

/// Both namespace ConfigMaps store their document under the same key
pub const CONFIGMAP_KEY_NAMESPACES: &str = "managed_namespaces.yaml";
pub const CONFIGMAP_KEY_OCM_AGENT: &str = "serviceURL";

/// Object names that trigger a reconciliation; every other event is skipped
pub const WATCHED_OBJECT_NAMES: [&str; 7] = [
    SECRET_NAME_GOALERT,
    SECRET_NAME_PAGERDUTY,
    SECRET_NAME_DMS,
    SECRET_NAME_ALERTMANAGER,
    CONFIGMAP_NAME_OCM_AGENT,
    CONFIGMAP_NAME_MANAGED_NAMESPACES,
    CONFIGMAP_NAME_OCP_NAMESPACES,
];

/// Namespace regexes used when either namespace ConfigMap is unusable
pub const DEFAULT_NAMESPACES: [&str; 3] = ["^openshift-.*$", "^redhat-.*$", "^kube-.*$"];

/// Layered-product namespaces, silenced for a handful of noisy alerts
pub const NAMESPACE_REGEX_LAYERED_PRODUCTS: &str = "^redhat-.*$";

/// Label set by workloads that want a managed notification via OCM Agent
pub const MANAGED_NOTIFICATION_LABEL: &str = "send_managed_notification";

pub const PAGERDUTY_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// Cluster-scoped singletons read for auxiliary inputs
pub const CLUSTER_VERSION_NAME: &str = "version";
pub const CLUSTER_PROXY_NAME: &str = "cluster";

// Readiness
pub const READINESS_JOB_NAME: &str = "osd-cluster-ready";
pub const DEFAULT_MAX_CLUSTER_AGE_MINUTES: i64 = 2 * 60;
pub const READINESS_JOB_ACTIVE_REQUEUE_SECS: u64 = 10;
pub const READINESS_AGE_LOOKUP_REQUEUE_SECS: u64 = 1;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default delay for a requeue that asks to run again right away (milliseconds)
pub const DEFAULT_IMMEDIATE_REQUEUE_MS: u64 = 1000;

/// Default Fibonacci backoff starting value for failed passes (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default Fibonacci backoff maximum value for failed passes (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

/// Default delay before restarting a watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;
