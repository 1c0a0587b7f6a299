use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeCondition};
use tracing::{debug, info};

use crate::error::AgentError;
use crate::types::AgentConfig;

pub const FARGATE_LABEL: &str = "eks.amazonaws.com/compute-type";
pub const DEFAULT_KUBELET_PORT: i32 = 10250;

/// Lists every node known to the cluster, ready or not.
#[async_trait]
pub trait NodeLister: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, kube::Error>;
}

/// Source of ready nodes and their kubelet addresses.
#[async_trait]
pub trait NodeSource: Send + Sync {
    async fn ready_nodes(&self) -> Result<Vec<Node>, AgentError>;

    fn node_address(&self, node: &Node) -> Result<(String, i32), AgentError> {
        node_address(node)
    }
}

pub struct ClusterNodeSource<L> {
    lister: L,
}

impl<L: NodeLister> ClusterNodeSource<L> {
    pub fn new(lister: L) -> Self {
        Self { lister }
    }
}

#[async_trait]
impl<L: NodeLister> NodeSource for ClusterNodeSource<L> {
    async fn ready_nodes(&self) -> Result<Vec<Node>, AgentError> {
        let all = self.lister.list_nodes().await.map_err(AgentError::ListNodes)?;
        filter_ready_nodes(all)
    }
}

/// Keeps only nodes whose Ready condition is present and true.
pub fn filter_ready_nodes(all: Vec<Node>) -> Result<Vec<Node>, AgentError> {
    let total = all.len();
    let ready: Vec<Node> = all
        .into_iter()
        .filter(|n| {
            let ready = is_node_ready(n);
            if !ready {
                debug!(
                    "node, {}, is in a notready state. Node Condition: {:?}",
                    node_name(n),
                    ready_condition(n)
                );
            }
            ready
        })
        .collect();

    if ready.is_empty() {
        return Err(AgentError::NoReadyNodes);
    }
    if ready.len() != total {
        info!("some nodes were in a not ready state when retrieving nodes");
    }
    Ok(ready)
}

pub fn is_node_ready(node: &Node) -> bool {
    ready_condition(node)
        .map(|c| c.status == "True")
        .unwrap_or(false)
}

fn ready_condition(node: &Node) -> Option<&NodeCondition> {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
}

/// Internal IP and kubelet port of a node. Only the internal IP is ever used.
pub fn node_address(node: &Node) -> Result<(String, i32), AgentError> {
    let status = node.status.as_ref();
    let ip = status
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addrs| addrs.iter().find(|a| a.type_ == "InternalIP"))
        .map(|a| a.address.clone())
        .ok_or_else(|| AgentError::AddressNotFound {
            node: node_name(node).to_string(),
        })?;

    let port = status
        .and_then(|s| s.daemon_endpoints.as_ref())
        .and_then(|d| d.kubelet_endpoint.as_ref())
        .map(|e| e.port)
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_KUBELET_PORT);

    Ok((ip, port))
}

pub fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("")
}

pub fn provider_id(node: &Node) -> &str {
    node.spec
        .as_ref()
        .and_then(|s| s.provider_id.as_deref())
        .unwrap_or("")
}

/// Fargate nodes expose no kubelet and can only be reached through the proxy.
pub fn is_fargate_node(node: &Node) -> bool {
    let fargate = node
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(FARGATE_LABEL))
        .map(|v| v == "fargate")
        .unwrap_or(false);
    if fargate {
        debug!("Fargate node found: {}", node_name(node));
    }
    fargate
}

/// Whether the session may fetch from kubelets directly.
///
/// Clusters may mix Fargate and regular nodes; a single Fargate node disables
/// direct connection for the whole cluster.
pub fn allow_direct_connect(config: &AgentConfig, nodes: &[Node]) -> bool {
    if config.force_kube_proxy {
        info!("FORCE_KUBE_PROXY is set, direct node connection disabled");
        return false;
    }
    if nodes.iter().any(is_fargate_node) {
        info!("Fargate node found in cluster, direct node connection disabled");
        return false;
    }
    true
}
