//! Builders and fakes shared by unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    DaemonEndpoint, Node, NodeAddress, NodeCondition, NodeDaemonEndpoints, NodeSpec, NodeStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use reqwest::Method;

use crate::error::{AgentError, TransportError};
use crate::nodes::{filter_ready_nodes, NodeSource};
use crate::transport::Transport;
use crate::types::AgentConfig;

pub fn test_config() -> AgentConfig {
    AgentConfig {
        cluster_host_url: "https://api.test:6443".to_string(),
        bearer_token: "token".to_string(),
        ca_cert_path: None,
        force_kube_proxy: false,
        retrieve_stats_container: true,
        retrieve_node_summaries: true,
        collection_retry_limit: 0,
        output_dir: PathBuf::from("/tmp/node-metrics-test"),
        poll_interval: Duration::from_secs(60),
        probe_timeout: Duration::from_secs(1),
        fetch_timeout: Duration::from_secs(1),
    }
}

pub fn node(name: &str) -> NodeBuilder {
    NodeBuilder::new(name)
}

/// Builds a ready node with an internal IP, kubelet port and provider ID.
pub struct NodeBuilder {
    name: String,
    ready: Option<String>,
    ip: Option<String>,
    port: Option<i32>,
    provider_id: Option<String>,
    labels: BTreeMap<String, String>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ready: Some("True".to_string()),
            ip: Some("10.0.0.1".to_string()),
            port: Some(10250),
            provider_id: Some(format!("aws:///us-east-1a/i-{}", name)),
            labels: BTreeMap::new(),
        }
    }

    pub fn ready(mut self, status: &str) -> Self {
        self.ready = Some(status.to_string());
        self
    }

    pub fn not_ready(self) -> Self {
        self.ready("False")
    }

    pub fn no_conditions(mut self) -> Self {
        self.ready = None;
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.ip = Some(ip.to_string());
        self
    }

    pub fn no_addresses(mut self) -> Self {
        self.ip = None;
        self
    }

    pub fn port(mut self, port: i32) -> Self {
        self.port = Some(port);
        self
    }

    pub fn no_port(mut self) -> Self {
        self.port = None;
        self
    }

    pub fn provider(mut self, id: &str) -> Self {
        self.provider_id = Some(id.to_string());
        self
    }

    pub fn no_spec(mut self) -> Self {
        self.provider_id = None;
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn fargate(self) -> Self {
        self.label(crate::nodes::FARGATE_LABEL, "fargate")
    }

    pub fn build(self) -> Node {
        let conditions = self.ready.map(|status| {
            vec![
                NodeCondition {
                    type_: "MemoryPressure".to_string(),
                    status: "False".to_string(),
                    ..Default::default()
                },
                NodeCondition {
                    type_: "Ready".to_string(),
                    status,
                    ..Default::default()
                },
            ]
        });
        let addresses = self.ip.map(|ip| {
            vec![
                NodeAddress {
                    type_: "Hostname".to_string(),
                    address: self.name.clone(),
                },
                NodeAddress {
                    type_: "InternalIP".to_string(),
                    address: ip,
                },
            ]
        });
        let daemon_endpoints = self.port.map(|port| NodeDaemonEndpoints {
            kubelet_endpoint: Some(DaemonEndpoint { port }),
        });

        Node {
            metadata: ObjectMeta {
                name: Some(self.name),
                labels: (!self.labels.is_empty()).then_some(self.labels),
                ..Default::default()
            },
            spec: self.provider_id.map(|id| NodeSpec {
                provider_id: Some(id),
                ..Default::default()
            }),
            status: Some(NodeStatus {
                conditions,
                addresses,
                daemon_endpoints,
                ..Default::default()
            }),
        }
    }
}

pub struct FakeNodeSource {
    nodes: Vec<Node>,
    address_calls: AtomicUsize,
}

impl FakeNodeSource {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            address_calls: AtomicUsize::new(0),
        }
    }

    pub fn address_calls(&self) -> usize {
        self.address_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeSource for FakeNodeSource {
    async fn ready_nodes(&self) -> Result<Vec<Node>, AgentError> {
        filter_ready_nodes(self.nodes.clone())
    }

    fn node_address(&self, node: &Node) -> Result<(String, i32), AgentError> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        crate::nodes::node_address(node)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub method: Method,
    pub artifact: String,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

/// Records every request. Fetches succeed unless the URL matches a
/// `fail_fetch` pattern; probes report reachable only for `reachable` patterns.
#[derive(Default)]
pub struct FakeTransport {
    fetch_failures: Vec<String>,
    reachable: Vec<String>,
    probe_errors: Vec<String>,
    fetched: Mutex<Vec<FetchCall>>,
    probed: Mutex<Vec<(Method, String)>>,
    removed: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_fetch(mut self, pattern: &str) -> Self {
        self.fetch_failures.push(pattern.to_string());
        self
    }

    pub fn reachable(mut self, pattern: &str) -> Self {
        self.reachable.push(pattern.to_string());
        self
    }

    pub fn probe_error(mut self, pattern: &str) -> Self {
        self.probe_errors.push(pattern.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<FetchCall> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn probed(&self) -> Vec<(Method, String)> {
        self.probed.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }
}

fn matches_any(patterns: &[String], url: &str) -> bool {
    patterns.iter().any(|p| url.contains(p.as_str()))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(
        &self,
        method: Method,
        artifact: &str,
        _out_dir: &Path,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, TransportError> {
        self.fetched.lock().unwrap().push(FetchCall {
            method,
            artifact: artifact.to_string(),
            url: url.to_string(),
            body: body.map(|b| b.to_vec()),
        });
        if matches_any(&self.fetch_failures, url) {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: 500,
            });
        }
        Ok(b"{}".to_vec())
    }

    async fn test_connection(&self, url: &str, method: Method) -> Result<bool, TransportError> {
        self.probed.lock().unwrap().push((method, url.to_string()));
        if matches_any(&self.probe_errors, url) {
            return Err(TransportError::Io {
                path: PathBuf::from(url),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        }
        Ok(matches_any(&self.reachable, url))
    }

    async fn remove_artifact(&self, artifact: &str, _out_dir: &Path) -> Result<(), TransportError> {
        self.removed.lock().unwrap().push(artifact.to_string());
        Ok(())
    }
}
