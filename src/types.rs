use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub cluster_host_url: String,
    pub bearer_token: String,
    pub ca_cert_path: Option<PathBuf>,
    pub force_kube_proxy: bool,
    pub retrieve_stats_container: bool,
    pub retrieve_node_summaries: bool,
    pub collection_retry_limit: u32,
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    pub probe_timeout: Duration,
    pub fetch_timeout: Duration,
}

/// The kubelet metrics surfaces the agent knows how to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    StatsSummary,
    Container,
    CAdvisor,
}

impl EndpointKind {
    /// Order in which endpoints are fetched for a node.
    pub const FETCH_ORDER: [EndpointKind; 3] = [
        EndpointKind::StatsSummary,
        EndpointKind::CAdvisor,
        EndpointKind::Container,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            EndpointKind::StatsSummary => "/stats/summary",
            EndpointKind::Container => "/stats/container",
            EndpointKind::CAdvisor => "/metrics/cadvisor",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            EndpointKind::StatsSummary => 1,
            EndpointKind::Container => 1 << 1,
            EndpointKind::CAdvisor => 1 << 2,
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Set of endpoints currently known to be reachable over one connection path.
///
/// Membership is the only state: marking an endpoint unavailable removes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointMask(u8);

impl EndpointMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&mut self, kind: EndpointKind, available: bool) {
        if available {
            self.0 |= kind.bit();
        } else {
            self.0 &= !kind.bit();
        }
    }

    pub fn available(&self, kind: EndpointKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = EndpointKind> + '_ {
        EndpointKind::FETCH_ORDER
            .into_iter()
            .filter(move |k| self.available(*k))
    }
}

/// How kubelet metrics are reached for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Direct,
    Proxy,
    Unreachable,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionMode::Direct => f.write_str("direct"),
            ConnectionMode::Proxy => f.write_str("proxy"),
            ConnectionMode::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// Outcome of the session-start connectivity probe. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalPlan {
    pub mode: ConnectionMode,
    pub direct_mask: EndpointMask,
    pub proxy_mask: EndpointMask,
}

impl RetrievalPlan {
    pub fn unreachable() -> Self {
        Self {
            mode: ConnectionMode::Unreachable,
            direct_mask: EndpointMask::new(),
            proxy_mask: EndpointMask::new(),
        }
    }

    pub fn collects_node_metrics(&self) -> bool {
        self.mode != ConnectionMode::Unreachable
    }
}
