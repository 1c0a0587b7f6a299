use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::fetch::{download_node_data, NodeClients};
use crate::nodes::NodeSource;
use crate::report::FailureReport;
use crate::transport::Transport;
use crate::types::{AgentConfig, RetrievalPlan};

/// Prefix for every artifact written by a collection cycle.
pub const STATS_PREFIX: &str = "stats";

/// Collector that binds a probed retrieval plan to the clients it runs with
pub struct NodeMetricsCollector<'a> {
    config: &'a AgentConfig,
    plan: RetrievalPlan,
    node_source: &'a dyn NodeSource,
    node_client: &'a dyn Transport,
    cluster_client: &'a dyn Transport,
}

impl<'a> NodeMetricsCollector<'a> {
    pub fn new(
        config: &'a AgentConfig,
        plan: RetrievalPlan,
        node_source: &'a dyn NodeSource,
        node_client: &'a dyn Transport,
        cluster_client: &'a dyn Transport,
    ) -> Self {
        Self {
            config,
            plan,
            node_source,
            node_client,
            cluster_client,
        }
    }

    pub fn plan(&self) -> &RetrievalPlan {
        &self.plan
    }

    /// Collect one cycle of node metrics into `sample_dir`
    pub async fn retrieve_node_summaries(&self, sample_dir: &Path) -> Result<FailureReport> {
        if !self.plan.collects_node_metrics() {
            info!("node metrics collection is disabled for this run");
            return Ok(FailureReport::new());
        }

        let clients = NodeClients {
            direct: self.node_client,
            proxy: self.cluster_client,
        };
        let report = download_node_data(
            STATS_PREFIX,
            self.config,
            &self.plan,
            self.node_source,
            clients,
            sample_dir,
        )
        .await
        .context("error downloading node metrics")?;

        if report.has_failures() {
            let summary = report.summary();
            warn!(
                "Warning failed to get node metrics for {} nodes ({} unrecovered, {} recovered via proxy, {} missing provider ID)",
                report.len(),
                summary.proxy_failure_count,
                summary.direct_failure_count,
                summary.missing_provider_id_count
            );
            report.log_warnings();
        }

        Ok(report)
    }
}
