use reqwest::Method;
use tracing::{info, warn};

use crate::endpoints::{DirectNode, NodeApi, ProxyApi};
use crate::error::AgentError;
use crate::nodes::{allow_direct_connect, node_name, NodeSource};
use crate::transport::Transport;
use crate::types::{AgentConfig, ConnectionMode, EndpointKind, EndpointMask, RetrievalPlan};

/// Decides once per session how kubelet metrics will be reached.
///
/// Probes the first ready node directly when allowed, falling back to the API
/// server proxy. The proxy endpoints are probed in direct mode too, since a
/// node whose direct fetch fails is retried through the proxy. Returns `AgentError::NodesUnreachable` when neither path
/// exposes a usable set of endpoints, in which case node metrics collection
/// should be disabled for the run.
pub async fn ensure_node_source(
    config: &AgentConfig,
    node_source: &dyn NodeSource,
    node_client: &dyn Transport,
    cluster_client: &dyn Transport,
) -> Result<RetrievalPlan, AgentError> {
    let nodes = node_source.ready_nodes().await?;
    let first = nodes.first().ok_or(AgentError::NoReadyNodes)?;
    let (ip, port) = node_source.node_address(first)?;

    let mut direct_mask = EndpointMask::new();
    let mut proxy_mask = EndpointMask::new();

    let proxy = ProxyApi::new(config.cluster_host_url.as_str(), node_name(first));

    if allow_direct_connect(config, &nodes) {
        let direct = DirectNode::new(ip, port);
        if test_node_conn(config, node_client, &mut direct_mask, &direct).await? {
            info!("kubelet metrics will be retrieved directly from nodes");
            // per-node fallback in direct mode needs to know what the proxy serves
            if let Err(e) = test_node_conn(config, cluster_client, &mut proxy_mask, &proxy).await {
                warn!("unable to probe proxy endpoints, direct failures will not fall back: {}", e);
                proxy_mask = EndpointMask::new();
            }
            return Ok(RetrievalPlan {
                mode: ConnectionMode::Direct,
                direct_mask,
                proxy_mask,
            });
        }
        info!("direct node connection unavailable, testing connection via kube-proxy");
    }

    if test_node_conn(config, cluster_client, &mut proxy_mask, &proxy).await? {
        info!("kubelet metrics will be retrieved via the API server proxy");
        return Ok(RetrievalPlan {
            mode: ConnectionMode::Proxy,
            direct_mask,
            proxy_mask,
        });
    }

    warn!("kubelet metrics are unreachable directly and via proxy");
    Err(AgentError::NodesUnreachable)
}

/// Records which endpoints answer on `api` into `mask`.
///
/// Succeeds only when the summary endpoint is available together with at
/// least one of cadvisor or container stats.
pub async fn test_node_conn(
    config: &AgentConfig,
    client: &dyn Transport,
    mask: &mut EndpointMask,
    api: &dyn NodeApi,
) -> Result<bool, AgentError> {
    let ns = client.test_connection(&api.stats_summary(), Method::GET).await?;
    info!("Availability of the /stats/summary endpoint is: {}", ns);
    mask.set_available(EndpointKind::StatsSummary, ns);

    let cm = client.test_connection(&api.cadvisor_metrics(), Method::GET).await?;
    info!("Availability of the /metrics/cadvisor endpoint is: {}", cm);
    mask.set_available(EndpointKind::CAdvisor, cm);

    let mut cs = false;
    if config.retrieve_stats_container {
        cs = client.test_connection(&api.stats_container(), Method::POST).await?;
        info!("Availability of the /stats/container endpoint is: {}", cs);
        mask.set_available(EndpointKind::Container, cs);
    }

    Ok(probe_succeeded(ns, cm, cs))
}

pub fn probe_succeeded(summary: bool, cadvisor: bool, container: bool) -> bool {
    summary && (cadvisor || container)
}
