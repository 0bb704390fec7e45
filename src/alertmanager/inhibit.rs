//! # Inhibition Rules
//!
//! Fixed inhibition rules rendered into every config, regardless of which notifiers
//! are enabled.

use super::types::{labels, InhibitRule};

struct InhibitSpec {
    equal: &'static [&'static str],
    source_match: &'static [(&'static str, &'static str)],
    target_match_re: &'static [(&'static str, &'static str)],
}

const INHIBIT_RULES: &[InhibitSpec] = &[
    // critical supersedes warning and info
    InhibitSpec {
        equal: &["namespace", "alertname"],
        source_match: &[("severity", "critical")],
        target_match_re: &[("severity", "warning|info")],
    },
    InhibitSpec {
        equal: &["namespace", "alertname"],
        source_match: &[("severity", "warning")],
        target_match_re: &[("severity", "info")],
    },
    // the degraded alert carries more detail than ClusterOperatorDown
    InhibitSpec {
        equal: &["namespace", "name"],
        source_match: &[("alertname", "ClusterOperatorDegraded"), ("severity", "critical")],
        target_match_re: &[("alertname", "ClusterOperatorDown")],
    },
    InhibitSpec {
        equal: &["node", "instance"],
        source_match: &[("alertname", "KubeNodeNotReady")],
        target_match_re: &[("alertname", "KubeNodeUnreachable")],
    },
    InhibitSpec {
        equal: &[],
        source_match: &[("alertname", "KubeNodeUnreachable")],
        target_match_re: &[("alertname", "SDNPodNotReady|TargetDown")],
    },
    InhibitSpec {
        equal: &["instance"],
        source_match: &[("alertname", "KubeNodeNotReady")],
        target_match_re: &[(
            "alertname",
            "KubeDaemonSetRolloutStuck|KubeDaemonSetMisScheduled|KubeDeploymentReplicasMismatch|KubeStatefulSetReplicasMismatch|KubePodNotReady",
        )],
    },
    InhibitSpec {
        equal: &["namespace"],
        source_match: &[("alertname", "KubeDeploymentReplicasMismatch")],
        target_match_re: &[("alertname", "KubePodNotReady|KubePodCrashLooping")],
    },
    // `dummylabel` is never set on either alert, and a label absent from both sides
    // compares equal, so this rule always applies
    InhibitSpec {
        equal: &["dummylabel"],
        source_match: &[("alertname", "ElasticsearchOperatorCSVNotSuccessful")],
        target_match_re: &[("alertname", "ElasticsearchClusterNotHealthy")],
    },
    InhibitSpec {
        equal: &["severity"],
        source_match: &[("alertname", "KubeAPIErrorBudgetBurn")],
        target_match_re: &[("alertname", "api-ErrorBudgetBurn")],
    },
];

/// The inhibition rules, in evaluation order
pub fn inhibit_rules() -> Vec<InhibitRule> {
    INHIBIT_RULES
        .iter()
        .map(|spec| InhibitRule {
            source_match: labels(spec.source_match),
            target_match_re: labels(spec.target_match_re),
            equal: spec.equal.iter().map(|l| (*l).to_string()).collect(),
            ..InhibitRule::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_rules_in_order() {
        let rules = inhibit_rules();
        assert_eq!(rules.len(), 9);
        assert_eq!(rules[0].source_match["severity"], "critical");
        assert_eq!(rules[0].target_match_re["severity"], "warning|info");
        assert_eq!(rules[8].source_match["alertname"], "KubeAPIErrorBudgetBurn");
    }

    #[test]
    fn test_node_unreachable_rule_has_no_equal() {
        let rules = inhibit_rules();
        assert!(rules[4].equal.is_empty());
        let yaml = serde_yaml::to_string(&rules[4]).expect("Should encode rule");
        assert!(!yaml.contains("equal"));
    }

    #[test]
    fn test_elasticsearch_rule_keeps_unmatched_equal_label() {
        let rules = inhibit_rules();
        assert_eq!(rules[7].equal, vec!["dummylabel"]);
        assert_eq!(
            rules[7].target_match_re["alertname"],
            "ElasticsearchClusterNotHealthy"
        );
    }
}
