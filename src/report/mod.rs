use std::collections::HashMap;
use std::fmt;

use tracing::warn;

/// Why a node's data is missing or suspect for the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFailure {
    /// Collection proceeded, but cluster allocation downstream will be inconsistent.
    MissingProviderId,
    /// Direct fetch failed and the proxy fallback fetched the node.
    DirectConnect(String),
    /// Proxy fetch failed. `direct_error` is set when this was a fallback.
    ProxyConnect {
        error: String,
        direct_error: Option<String>,
    },
}

impl NodeFailure {
    /// Whether the node's metrics are missing for the cycle.
    pub fn is_unrecovered(&self) -> bool {
        matches!(self, NodeFailure::ProxyConnect { .. })
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeFailure::MissingProviderId => f.write_str(
                "Provider ID for node does not exist. If this condition persists it will cause inconsistent cluster allocation",
            ),
            NodeFailure::DirectConnect(e) => write!(f, "direct connect failed (will attempt proxy): {}", e),
            NodeFailure::ProxyConnect { error, .. } => write!(f, "proxy connect failed: {}", error),
        }
    }
}

/// Per-cycle map of node name to the failure recorded for it. Nodes absent
/// from the report were fetched without issue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    failures: HashMap<String, NodeFailure>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `node`, replacing whatever was recorded before.
    pub fn record(&mut self, node: impl Into<String>, failure: NodeFailure) {
        self.failures.insert(node.into(), failure);
    }

    pub fn get(&self, node: &str) -> Option<&NodeFailure> {
        self.failures.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.failures.contains_key(node)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeFailure)> {
        self.failures.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check if the report has any failures to report
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for failure in self.failures.values() {
            match failure {
                NodeFailure::MissingProviderId => summary.missing_provider_id_count += 1,
                NodeFailure::DirectConnect(_) => summary.direct_failure_count += 1,
                NodeFailure::ProxyConnect { .. } => summary.proxy_failure_count += 1,
            }
        }
        summary
    }

    /// Logs every entry at warning level, sorted by node name.
    pub fn log_warnings(&self) {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (node, failure) in entries {
            match failure {
                NodeFailure::ProxyConnect { direct_error: Some(direct), .. } => {
                    warn!(node = %node, direct_error = %direct, "failed to get node metrics: {}", failure)
                }
                _ => warn!(node = %node, "failed to get node metrics: {}", failure),
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub missing_provider_id_count: usize,
    pub direct_failure_count: usize,
    pub proxy_failure_count: usize,
}

impl ReportSummary {
    pub fn total_failures(&self) -> usize {
        self.missing_provider_id_count + self.direct_failure_count + self.proxy_failure_count
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }
}
