use std::path::Path;

use k8s_openapi::api::core::v1::Node;
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, warn};

use crate::endpoints::{DirectNode, NodeApi, ProxyApi, SourceName};
use crate::error::{AgentError, TransportError};
use crate::nodes::{is_fargate_node, node_name, provider_id, NodeSource};
use crate::report::{FailureReport, NodeFailure};
use crate::retry::{retry_on_conflict, Backoff};
use crate::transport::Transport;
use crate::types::{AgentConfig, ConnectionMode, EndpointKind, EndpointMask, RetrievalPlan};

/// Body sent to `/stats/container/`: every subcontainer, latest sample only.
#[derive(Debug, Serialize)]
struct CadvisorStatsRequest {
    #[serde(rename = "containerName", skip_serializing_if = "String::is_empty")]
    container_name: String,
    num_stats: u32,
    subcontainers: bool,
}

pub fn build_containers_request() -> Result<Vec<u8>, AgentError> {
    let request = CadvisorStatsRequest {
        container_name: String::new(),
        num_stats: 1,
        subcontainers: true,
    };
    Ok(serde_json::to_vec(&request)?)
}

/// The clients used for each connection path.
#[derive(Clone, Copy)]
pub struct NodeClients<'a> {
    pub direct: &'a dyn Transport,
    pub proxy: &'a dyn Transport,
}

/// Everything needed to fetch and persist one node's data for a cycle.
pub struct NodeFetchData<'a> {
    pub node_name: &'a str,
    pub prefix: &'a str,
    pub work_dir: &'a Path,
    pub cluster_host_url: &'a str,
    pub containers_request: &'a [u8],
}

impl NodeFetchData<'_> {
    fn source(&self) -> SourceName<'_> {
        SourceName::new(self.prefix, self.node_name)
    }
}

/// Runs one collection cycle over every ready node.
///
/// Only a failure to list nodes is returned as an error. Per-node problems are
/// collected into the returned report and never stop the remaining nodes.
pub async fn download_node_data(
    prefix: &str,
    config: &AgentConfig,
    plan: &RetrievalPlan,
    node_source: &dyn NodeSource,
    clients: NodeClients<'_>,
    work_dir: &Path,
) -> Result<FailureReport, AgentError> {
    let nodes = retry_on_conflict(Backoff::default(), || node_source.ready_nodes()).await?;
    let containers_request = build_containers_request()?;

    let mut report = FailureReport::new();
    for node in &nodes {
        let name = node_name(node);
        let nd = NodeFetchData {
            node_name: name,
            prefix,
            work_dir,
            cluster_host_url: &config.cluster_host_url,
            containers_request: &containers_request,
        };
        if let Some(failure) = fetch_node(node, &nd, plan, node_source, clients).await {
            report.record(name, failure);
        }
    }

    Ok(report)
}

/// Fetches a single node, falling back from direct to proxy for this cycle only.
///
/// Returns the last failure recorded for the node: a missing provider ID is
/// replaced by a direct failure, which is replaced by a proxy failure.
async fn fetch_node(
    node: &Node,
    nd: &NodeFetchData<'_>,
    plan: &RetrievalPlan,
    node_source: &dyn NodeSource,
    clients: NodeClients<'_>,
) -> Option<NodeFailure> {
    let mut failure = provider_id(node).is_empty().then_some(NodeFailure::MissingProviderId);

    let mut direct_error = None;
    // the plan never selects direct when fargate nodes exist, but a fargate
    // node may have joined since the probe ran
    if plan.mode == ConnectionMode::Direct && !is_fargate_node(node) {
        match direct_node_fetch(node_source, node, nd, clients.direct, &plan.direct_mask).await {
            Ok(()) => return failure,
            Err(e) => {
                let direct = NodeFailure::DirectConnect(e.to_string());
                warn!(node = %nd.node_name, "{}", direct);
                discard_partial_artifacts(nd, clients.direct, &plan.direct_mask).await;
                direct_error = Some(e.to_string());
                failure = Some(direct);
            }
        }
    }

    if plan.proxy_mask.is_empty() {
        return Some(NodeFailure::ProxyConnect {
            error: "no kubelet endpoints are available through the API server proxy".to_string(),
            direct_error,
        });
    }

    match proxy_node_fetch(nd, clients.proxy, &plan.proxy_mask).await {
        Ok(()) => failure,
        Err(e) => Some(NodeFailure::ProxyConnect {
            error: e.to_string(),
            direct_error,
        }),
    }
}

async fn direct_node_fetch(
    node_source: &dyn NodeSource,
    node: &Node,
    nd: &NodeFetchData<'_>,
    client: &dyn Transport,
    mask: &EndpointMask,
) -> Result<(), AgentError> {
    let (ip, port) = node_source.node_address(node)?;
    let api = DirectNode::new(ip, port);
    retrieve_node_data(nd, client, mask, &api).await?;
    Ok(())
}

async fn proxy_node_fetch(
    nd: &NodeFetchData<'_>,
    client: &dyn Transport,
    mask: &EndpointMask,
) -> Result<(), TransportError> {
    let api = ProxyApi::new(nd.cluster_host_url, nd.node_name);
    retrieve_node_data(nd, client, mask, &api).await
}

/// Fetches every endpoint in `mask` for one node, stopping at the first error.
pub async fn retrieve_node_data(
    nd: &NodeFetchData<'_>,
    client: &dyn Transport,
    mask: &EndpointMask,
    api: &dyn NodeApi,
) -> Result<(), TransportError> {
    let source = nd.source();
    for kind in mask.iter() {
        debug!("Fetching data from {} endpoint", kind);
        let (method, body) = match kind {
            EndpointKind::Container => (Method::POST, Some(nd.containers_request)),
            EndpointKind::StatsSummary | EndpointKind::CAdvisor => (Method::GET, None),
        };
        client
            .fetch(method, &source.artifact(kind), nd.work_dir, &api.url(kind), body)
            .await?;
    }
    Ok(())
}

/// Drops whatever a failed direct pass managed to write, so a node's
/// artifacts for the cycle all come from a single connection path.
async fn discard_partial_artifacts(nd: &NodeFetchData<'_>, client: &dyn Transport, mask: &EndpointMask) {
    let source = nd.source();
    for kind in mask.iter() {
        if let Err(e) = client.remove_artifact(&source.artifact(kind), nd.work_dir).await {
            warn!(node = %nd.node_name, "failed to discard partial artifact: {}", e);
        }
    }
}
