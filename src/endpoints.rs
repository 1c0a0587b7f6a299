use crate::types::EndpointKind;

/// Formats the kubelet metrics URLs for one node over one connection path.
pub trait NodeApi: Send + Sync {
    fn stats_summary(&self) -> String;
    fn stats_container(&self) -> String;
    fn cadvisor_metrics(&self) -> String;

    fn url(&self, kind: EndpointKind) -> String {
        match kind {
            EndpointKind::StatsSummary => self.stats_summary(),
            EndpointKind::Container => self.stats_container(),
            EndpointKind::CAdvisor => self.cadvisor_metrics(),
        }
    }
}

/// Kubelet reached on its own port. Served over TLS that is not verified,
/// kubelets commonly present self-signed certificates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectNode {
    ip: String,
    port: i32,
}

impl DirectNode {
    pub fn new(ip: impl Into<String>, port: i32) -> Self {
        Self { ip: ip.into(), port }
    }
}

impl NodeApi for DirectNode {
    fn stats_summary(&self) -> String {
        format!("https://{}:{}/stats/summary", self.ip, self.port)
    }

    fn stats_container(&self) -> String {
        format!("https://{}:{}/stats/container/", self.ip, self.port)
    }

    fn cadvisor_metrics(&self) -> String {
        format!("https://{}:{}/metrics/cadvisor", self.ip, self.port)
    }
}

/// Kubelet reached through the API server node proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyApi {
    cluster_host_url: String,
    node_name: String,
}

impl ProxyApi {
    pub fn new(cluster_host_url: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            cluster_host_url: cluster_host_url.into(),
            node_name: node_name.into(),
        }
    }
}

impl NodeApi for ProxyApi {
    fn stats_summary(&self) -> String {
        format!("{}/api/v1/nodes/{}/proxy/stats/summary", self.cluster_host_url, self.node_name)
    }

    fn stats_container(&self) -> String {
        format!("{}/api/v1/nodes/{}/proxy/stats/container/", self.cluster_host_url, self.node_name)
    }

    fn cadvisor_metrics(&self) -> String {
        format!("{}/api/v1/nodes/{}/proxy/metrics/cadvisor", self.cluster_host_url, self.node_name)
    }
}

/// Artifact names for the data persisted from a node: `{prefix}-{kind}-{node}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName<'a> {
    prefix: &'a str,
    node_name: &'a str,
}

impl<'a> SourceName<'a> {
    pub fn new(prefix: &'a str, node_name: &'a str) -> Self {
        Self { prefix, node_name }
    }

    pub fn summary(&self) -> String {
        format!("{}-summary-{}", self.prefix, self.node_name)
    }

    pub fn container(&self) -> String {
        format!("{}-container-{}", self.prefix, self.node_name)
    }

    pub fn cadvisor_metrics(&self) -> String {
        format!("{}-cadvisor_metrics-{}", self.prefix, self.node_name)
    }

    pub fn artifact(&self, kind: EndpointKind) -> String {
        match kind {
            EndpointKind::StatsSummary => self.summary(),
            EndpointKind::Container => self.container(),
            EndpointKind::CAdvisor => self.cadvisor_metrics(),
        }
    }
}
