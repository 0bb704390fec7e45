//! # configure-alertmanager-operator
//!
//! Kubernetes operator that keeps the `alertmanager-main` secret in
//! `openshift-monitoring` in sync with the notifier inputs stored next to it.
//!
//! ## Overview
//!
//! 1. **Watching inputs** - Secrets and ConfigMaps in the operator namespace
//! 2. **Readiness gate** - PagerDuty and GoAlert stay silent until the cluster is ready
//! 3. **Rendering** - Builds the full routing tree, receivers and inhibit rules
//! 4. **Writing** - Replaces or creates `alertmanager-main` with the rendered document
//!
//! Metrics and health probes are served on `METRICS_PORT`.

use anyhow::Result;
use configure_alertmanager_operator::runtime::initialization::initialize;
use configure_alertmanager_operator::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.controller_config,
    )
    .await
}
