//! # Routes
//!
//! The routing tree rendered for each notifier.
//!
//! The PagerDuty and GoAlert subtrees share one ordered rule table. Each rule names a
//! [`RouteTarget`] role rather than a receiver, and a [`ReceiverSet`] maps roles to the
//! receiver names of a specific notifier. Order matters: the first matching sub-route
//! without `continue` wins, so entries are evaluated top to bottom exactly as listed.

use super::receivers::{
    RECEIVER_GOALERT, RECEIVER_GOALERT_HEARTBEAT, RECEIVER_GOALERT_HIGH, RECEIVER_GOALERT_LOW,
    RECEIVER_MAKE_IT_CRITICAL, RECEIVER_MAKE_IT_ERROR, RECEIVER_MAKE_IT_WARNING, RECEIVER_NULL,
    RECEIVER_OCM_AGENT, RECEIVER_PAGERDUTY, RECEIVER_WATCHDOG,
};
use super::types::{labels, Route};
use crate::constants::{MANAGED_NOTIFICATION_LABEL, NAMESPACE_REGEX_LAYERED_PRODUCTS};

const PROMETHEUS_K8S: &str = "openshift-monitoring/k8s";
const LOGGING: &str = "openshift-logging";
const USER_WORKLOAD_MONITORING: &str = "openshift-user-workload-monitoring";
const MASTER_MACHINE: &str = "^.+-master-[123]$";

/// Role a sub-route sends matching alerts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    /// Drop the alert
    Null,
    /// Page with the alert's own severity
    Page,
    Warning,
    Error,
    Critical,
}

/// Receiver names a notifier uses for each [`RouteTarget`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverSet {
    /// Receiver of the subtree root
    pub root: &'static str,
    pub default: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub critical: &'static str,
}

impl ReceiverSet {
    pub const PAGERDUTY: Self = Self {
        root: RECEIVER_NULL,
        default: RECEIVER_PAGERDUTY,
        warning: RECEIVER_MAKE_IT_WARNING,
        error: RECEIVER_MAKE_IT_ERROR,
        critical: RECEIVER_MAKE_IT_CRITICAL,
    };

    /// GoAlert has no error tier; errors page the high-priority service
    pub const GOALERT: Self = Self {
        root: RECEIVER_GOALERT,
        default: RECEIVER_GOALERT,
        warning: RECEIVER_GOALERT_LOW,
        error: RECEIVER_GOALERT_HIGH,
        critical: RECEIVER_GOALERT_HIGH,
    };

    pub fn resolve(&self, target: RouteTarget) -> &'static str {
        match target {
            RouteTarget::Null => RECEIVER_NULL,
            RouteTarget::Page => self.default,
            RouteTarget::Warning => self.warning,
            RouteTarget::Error => self.error,
            RouteTarget::Critical => self.critical,
        }
    }
}

/// One entry of the sub-route table
#[derive(Debug, Clone, Copy)]
pub struct SubrouteRule {
    pub target: RouteTarget,
    pub match_labels: &'static [(&'static str, &'static str)],
    pub match_re: &'static [(&'static str, &'static str)],
}

impl SubrouteRule {
    const fn new(
        target: RouteTarget,
        match_labels: &'static [(&'static str, &'static str)],
        match_re: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            target,
            match_labels,
            match_re,
        }
    }

    const fn silence(match_labels: &'static [(&'static str, &'static str)]) -> Self {
        Self::new(RouteTarget::Null, match_labels, &[])
    }

    pub fn to_route(&self, receivers: &ReceiverSet) -> Route {
        Route {
            receiver: receivers.resolve(self.target).to_string(),
            match_labels: labels(self.match_labels),
            match_re: labels(self.match_re),
            ..Route::default()
        }
    }
}

use RouteTarget::{Critical, Error, Null, Page, Warning};

/// Fixed sub-route table shared by the PagerDuty and GoAlert subtrees
pub const SUBROUTE_RULES: &[SubrouteRule] = &[
    // terminated master nodes
    SubrouteRule::new(
        Critical,
        &[("alertname", "MachineWithoutValidNode"), ("namespace", "openshift-machine-api")],
        &[("name", MASTER_MACHINE)],
    ),
    SubrouteRule::new(
        Critical,
        &[("alertname", "MachineWithNoRunningPhase"), ("namespace", "openshift-machine-api")],
        &[("name", MASTER_MACHINE)],
    ),
    // anything meant for OCM Agent
    SubrouteRule::silence(&[(MANAGED_NOTIFICATION_LABEL, "true")]),
    SubrouteRule::silence(&[("alertname", "KubeQuotaExceeded")]),
    SubrouteRule::silence(&[("alertname", "KubeQuotaFullyUsed")]),
    SubrouteRule::silence(&[("alertname", "CPUThrottlingHigh")]),
    SubrouteRule::silence(&[("alertname", "NodeFilesystemSpaceFillingUp"), ("severity", "warning")]),
    SubrouteRule::silence(&[("namespace", "openshift-customer-monitoring")]),
    SubrouteRule::silence(&[("namespace", "openshift-operators")]),
    SubrouteRule::silence(&[("namespace", "openshift-storage")]),
    SubrouteRule::silence(&[("namespace", "openshift-compliance")]),
    SubrouteRule::silence(&[("exported_namespace", "openshift-storage")]),
    SubrouteRule::silence(&[("exported_namespace", "openshift-operators")]),
    SubrouteRule::silence(&[("namespace", "openshift-operators-redhat")]),
    SubrouteRule::silence(&[("alertname", "CustomResourceDetected")]),
    SubrouteRule::silence(&[("alertname", "ImagePruningDisabled")]),
    SubrouteRule::silence(&[("severity", "info")]),
    SubrouteRule::silence(&[
        ("alertname", "KubePersistentVolumeFillingUp"),
        ("severity", "warning"),
        ("namespace", LOGGING),
    ]),
    SubrouteRule::new(
        Null,
        &[("alertname", "PodDisruptionBudgetLimit")],
        &[("namespace", NAMESPACE_REGEX_LAYERED_PRODUCTS)],
    ),
    SubrouteRule::new(
        Null,
        &[("alertname", "PodDisruptionBudgetAtLimit")],
        &[("namespace", NAMESPACE_REGEX_LAYERED_PRODUCTS)],
    ),
    SubrouteRule::new(
        Null,
        &[("alertname", "TargetDown")],
        &[("namespace", NAMESPACE_REGEX_LAYERED_PRODUCTS)],
    ),
    SubrouteRule::new(
        Null,
        &[("alertname", "KubeJobFailed"), ("namespace", LOGGING)],
        &[("job_name", "^elasticsearch.*")],
    ),
    // logging: only the SRE-specific alerts page, the rest of the stack is silenced
    SubrouteRule::new(Page, &[("namespace", LOGGING)], &[("alertname", "^.*SRE$")]),
    SubrouteRule::silence(&[("alertname", "FluentDHighErrorRate"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "FluentDVeryHighErrorRate"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "FluentdNodeDown"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "FluentdNodeDown"), ("prometheus", PROMETHEUS_K8S)]),
    SubrouteRule::silence(&[("alertname", "FluentdQueueLengthIncreasing"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "AggregatedLoggingSystemCPUHigh"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "ElasticsearchClusterNotHealthy"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[("alertname", "ElasticsearchDiskSpaceRunningLow"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[
        ("alertname", "ElasticsearchHighFileDescriptorUsage"),
        ("namespace", LOGGING),
    ]),
    SubrouteRule::silence(&[("alertname", "ElasticsearchJVMHeapUseHigh"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[
        ("alertname", "ElasticsearchNodeDiskWatermarkReached"),
        ("namespace", LOGGING),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "ElasticsearchOperatorCSVNotSuccessful"),
        ("namespace", LOGGING),
    ]),
    SubrouteRule::silence(&[("alertname", "ElasticsearchProcessCPUHigh"), ("namespace", LOGGING)]),
    SubrouteRule::silence(&[
        ("alertname", "ElasticsearchWriteRequestsRejectionJumps"),
        ("namespace", LOGGING),
    ]),
    // HAProxyReloadFailSRE pages instead
    SubrouteRule::silence(&[("alertname", "HAProxyReloadFail"), ("severity", "critical")]),
    SubrouteRule::silence(&[("alertname", "PrometheusRuleFailures")]),
    SubrouteRule::silence(&[
        ("alertname", "ClusterOperatorDegraded"),
        ("name", "authentication"),
        ("reason", "IdentityProviderConfig_Error"),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "ClusterOperatorDegraded"),
        ("name", "authentication"),
        ("reason", "OAuthServerConfigObservation_Error"),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "ClusterOperatorDown"),
        ("name", "authentication"),
        ("reason", "IdentityProviderConfig_Error"),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "ClusterOperatorDown"),
        ("name", "authentication"),
        ("reason", "OAuthServerConfigObservation_Error"),
    ]),
    SubrouteRule::silence(&[("alertname", "CannotRetrieveUpdates")]),
    SubrouteRule::silence(&[
        ("alertname", "PrometheusNotIngestingSamples"),
        ("namespace", USER_WORKLOAD_MONITORING),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "FluentdQueueLengthBurst"),
        ("namespace", LOGGING),
        ("severity", "warning"),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "ClusterAutoscalerUnschedulablePods"),
        ("namespace", "openshift-machine-api"),
    ]),
    SubrouteRule::silence(&[("severity", "alert")]),
    SubrouteRule::new(
        Warning,
        &[("alertname", "KubeAPILatencyHigh"), ("severity", "critical")],
        &[],
    ),
    SubrouteRule::new(Page, &[("job", "fluentd"), ("prometheus", PROMETHEUS_K8S)], &[]),
    SubrouteRule::new(
        Page,
        &[("cluster", "elasticsearch"), ("prometheus", PROMETHEUS_K8S)],
        &[],
    ),
    SubrouteRule::new(
        Error,
        &[("alertname", "NodeClockNotSynchronising"), ("prometheus", PROMETHEUS_K8S)],
        &[],
    ),
    // no namespace label on this one, so it needs its own route
    SubrouteRule::new(
        Page,
        &[("alertname", "KubeAPIErrorBudgetBurn"), ("prometheus", PROMETHEUS_K8S)],
        &[],
    ),
    SubrouteRule::silence(&[
        ("alertname", "PrometheusBadConfig"),
        ("namespace", USER_WORKLOAD_MONITORING),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "PrometheusDuplicateTimestamps"),
        ("namespace", USER_WORKLOAD_MONITORING),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "PrometheusTargetSyncFailure"),
        ("namespace", USER_WORKLOAD_MONITORING),
    ]),
    SubrouteRule::silence(&[
        ("alertname", "PrometheusOperatorRejectedResources"),
        ("namespace", USER_WORKLOAD_MONITORING),
    ]),
    SubrouteRule::new(
        Warning,
        &[("alertname", "etcdGRPCRequestsSlow"), ("namespace", "openshift-etcd")],
        &[],
    ),
    SubrouteRule::new(
        Warning,
        &[
            ("alertname", "ExtremelyHighIndividualControlPlaneCPU"),
            ("namespace", "openshift-kube-apiserver"),
        ],
        &[],
    ),
    SubrouteRule::new(
        Warning,
        &[("alertname", "etcdHighNumberOfFailedGRPCRequests"), ("namespace", "openshift-etcd")],
        &[],
    ),
    SubrouteRule::new(
        Warning,
        &[("severity", "critical"), ("namespace", "openshift-deployment-validation-operator")],
        &[],
    ),
    SubrouteRule::silence(&[
        ("alertname", "MultipleDefaultStorageClasses"),
        ("namespace", "openshift-cluster-storage-operator"),
    ]),
    SubrouteRule::new(
        Null,
        &[("alertname", "NodeFilesystemAlmostOutOfSpace"), ("severity", "critical")],
        &[("mountpoint", "/var/lib/ibmc-s3fs.*")],
    ),
];

/// Insights is not available in FedRAMP environments
pub const FEDRAMP_SUBROUTE_RULES: &[SubrouteRule] = &[SubrouteRule::silence(&[
    ("alertname", "ClusterOperatorDown"),
    ("name", "insights"),
])];

/// Paging subtree for one notifier
///
/// Appends, after the fixed table, two routes per namespace regex: one keyed on
/// `exported_namespace`, and one keyed on `namespace` that requires `exported_namespace`
/// to be empty so an alert is never paged twice.
pub fn notifier_subtree(receivers: &ReceiverSet, namespaces: &[String], fedramp: bool) -> Route {
    let mut routes: Vec<Route> = SUBROUTE_RULES
        .iter()
        .map(|rule| rule.to_route(receivers))
        .collect();

    if fedramp {
        routes.extend(FEDRAMP_SUBROUTE_RULES.iter().map(|rule| rule.to_route(receivers)));
    }

    for namespace in namespaces {
        routes.push(Route {
            receiver: receivers.default.to_string(),
            match_labels: labels(&[("prometheus", PROMETHEUS_K8S)]),
            match_re: labels(&[("exported_namespace", namespace.as_str())]),
            ..Route::default()
        });
        routes.push(Route {
            receiver: receivers.default.to_string(),
            match_labels: labels(&[("exported_namespace", ""), ("prometheus", PROMETHEUS_K8S)]),
            match_re: labels(&[("namespace", namespace.as_str())]),
            ..Route::default()
        });
    }

    Route {
        receiver: receivers.root.to_string(),
        group_by: vec!["alertname".to_string(), "severity".to_string()],
        continue_matching: true,
        routes,
        ..Route::default()
    }
}

pub fn pagerduty_route(namespaces: &[String], fedramp: bool) -> Route {
    notifier_subtree(&ReceiverSet::PAGERDUTY, namespaces, fedramp)
}

pub fn goalert_route(namespaces: &[String], fedramp: bool) -> Route {
    notifier_subtree(&ReceiverSet::GOALERT, namespaces, fedramp)
}

/// Always forwards Watchdog to Dead Man's Snitch and keeps evaluating
pub fn watchdog_route() -> Route {
    Route {
        receiver: RECEIVER_WATCHDOG.to_string(),
        match_labels: labels(&[("alertname", "Watchdog")]),
        continue_matching: true,
        repeat_interval: "5m".to_string(),
        ..Route::default()
    }
}

/// GoAlert heartbeat, same shape as the watchdog route
pub fn heartbeat_route() -> Route {
    Route {
        receiver: RECEIVER_GOALERT_HEARTBEAT.to_string(),
        match_labels: labels(&[("alertname", "Watchdog")]),
        continue_matching: true,
        repeat_interval: "5m".to_string(),
        ..Route::default()
    }
}

/// Managed notifications stop here and go to OCM Agent only
pub fn ocm_agent_route() -> Route {
    Route {
        receiver: RECEIVER_OCM_AGENT.to_string(),
        match_labels: labels(&[(MANAGED_NOTIFICATION_LABEL, "true")]),
        continue_matching: false,
        repeat_interval: "10m".to_string(),
        ..Route::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespaces(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_table_starts_with_master_node_rules() {
        let route = pagerduty_route(&[], false);
        assert_eq!(route.routes[0].receiver, RECEIVER_MAKE_IT_CRITICAL);
        assert_eq!(route.routes[0].match_re["name"], MASTER_MACHINE);
        assert_eq!(route.routes[0].match_labels["alertname"], "MachineWithoutValidNode");
        assert_eq!(route.routes[1].match_labels["alertname"], "MachineWithNoRunningPhase");
        assert_eq!(route.routes[2].match_labels[MANAGED_NOTIFICATION_LABEL], "true");
        assert_eq!(route.routes[2].receiver, RECEIVER_NULL);
    }

    #[test]
    fn test_table_ends_with_s3fs_mountpoint_rule() {
        let route = pagerduty_route(&[], false);
        let last = route.routes.last().expect("Should have sub-routes");
        assert_eq!(route.routes.len(), SUBROUTE_RULES.len());
        assert_eq!(last.receiver, RECEIVER_NULL);
        assert_eq!(last.match_re["mountpoint"], "/var/lib/ibmc-s3fs.*");
    }

    #[test]
    fn test_pagerduty_root_shape() {
        let route = pagerduty_route(&[], false);
        assert_eq!(route.receiver, RECEIVER_NULL);
        assert_eq!(route.group_by, vec!["alertname", "severity"]);
        assert!(route.continue_matching);
        assert!(route.repeat_interval.is_empty());
    }

    #[test]
    fn test_goalert_root_uses_goalert_receiver() {
        let route = goalert_route(&[], false);
        assert_eq!(route.receiver, RECEIVER_GOALERT);
        assert!(route.continue_matching);
    }

    #[test]
    fn test_subtrees_only_differ_in_receiver_names() {
        let ns = namespaces(&["^ns-a$"]);
        let pd = pagerduty_route(&ns, true);
        let ga = goalert_route(&ns, true);
        assert_eq!(pd.routes.len(), ga.routes.len());
        for (p, g) in pd.routes.iter().zip(&ga.routes) {
            assert_eq!(p.match_labels, g.match_labels);
            assert_eq!(p.match_re, g.match_re);
            let expected = match p.receiver.as_str() {
                RECEIVER_NULL => RECEIVER_NULL,
                RECEIVER_PAGERDUTY => RECEIVER_GOALERT,
                RECEIVER_MAKE_IT_WARNING => RECEIVER_GOALERT_LOW,
                RECEIVER_MAKE_IT_ERROR | RECEIVER_MAKE_IT_CRITICAL => RECEIVER_GOALERT_HIGH,
                other => panic!("unexpected receiver {other}"),
            };
            assert_eq!(g.receiver, expected);
        }
    }

    #[test]
    fn test_severity_overrides() {
        let route = pagerduty_route(&[], false);
        let find = |alertname: &str| {
            route
                .routes
                .iter()
                .find(|r| r.match_labels.get("alertname").map(String::as_str) == Some(alertname))
                .map(|r| r.receiver.as_str())
        };
        assert_eq!(find("KubeAPILatencyHigh"), Some(RECEIVER_MAKE_IT_WARNING));
        assert_eq!(find("NodeClockNotSynchronising"), Some(RECEIVER_MAKE_IT_ERROR));
        assert_eq!(find("etcdGRPCRequestsSlow"), Some(RECEIVER_MAKE_IT_WARNING));
        assert_eq!(find("KubeAPIErrorBudgetBurn"), Some(RECEIVER_PAGERDUTY));
    }

    #[test]
    fn test_namespace_routes_follow_table() {
        let route = pagerduty_route(&namespaces(&["^ns-a$", "^ns-b$"]), false);
        let tail = &route.routes[SUBROUTE_RULES.len()..];
        assert_eq!(tail.len(), 4);

        assert_eq!(tail[0].receiver, RECEIVER_PAGERDUTY);
        assert_eq!(tail[0].match_re["exported_namespace"], "^ns-a$");
        assert_eq!(tail[0].match_labels["prometheus"], PROMETHEUS_K8S);
        assert!(!tail[0].match_labels.contains_key("exported_namespace"));

        assert_eq!(tail[1].match_re["namespace"], "^ns-a$");
        assert_eq!(tail[1].match_labels["exported_namespace"], "");

        assert_eq!(tail[2].match_re["exported_namespace"], "^ns-b$");
        assert_eq!(tail[3].match_re["namespace"], "^ns-b$");
    }

    #[test]
    fn test_fedramp_insights_silence_precedes_namespace_routes() {
        let route = pagerduty_route(&namespaces(&["^ns-a$"]), true);
        let insights = &route.routes[SUBROUTE_RULES.len()];
        assert_eq!(insights.receiver, RECEIVER_NULL);
        assert_eq!(insights.match_labels["alertname"], "ClusterOperatorDown");
        assert_eq!(insights.match_labels["name"], "insights");
        assert_eq!(route.routes.len(), SUBROUTE_RULES.len() + 1 + 2);

        let plain = pagerduty_route(&namespaces(&["^ns-a$"]), false);
        assert!(!plain
            .routes
            .iter()
            .any(|r| r.match_labels.get("name").map(String::as_str) == Some("insights")));
    }

    #[test]
    fn test_top_level_routes() {
        let watchdog = watchdog_route();
        assert_eq!(watchdog.receiver, RECEIVER_WATCHDOG);
        assert!(watchdog.continue_matching);
        assert_eq!(watchdog.repeat_interval, "5m");

        let ocm = ocm_agent_route();
        assert_eq!(ocm.receiver, RECEIVER_OCM_AGENT);
        assert!(!ocm.continue_matching);
        assert_eq!(ocm.repeat_interval, "10m");
        assert_eq!(ocm.match_labels[MANAGED_NOTIFICATION_LABEL], "true");

        let heartbeat = heartbeat_route();
        assert_eq!(heartbeat.receiver, RECEIVER_GOALERT_HEARTBEAT);
        assert_eq!(heartbeat.match_labels["alertname"], "Watchdog");
    }
}
