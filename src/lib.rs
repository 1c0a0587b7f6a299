// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod nodes;
pub mod kubernetes;
pub mod retry;
pub mod endpoints;
pub mod transport;
pub mod probe;
pub mod fetch;
pub mod report;
pub mod collector;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used items
pub use types::{AgentConfig, ConnectionMode, EndpointKind, EndpointMask, RetrievalPlan};
pub use error::{AgentError, TransportError};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use nodes::{allow_direct_connect, filter_ready_nodes, is_fargate_node, node_address, ClusterNodeSource, NodeLister, NodeSource};
pub use endpoints::{DirectNode, NodeApi, ProxyApi, SourceName};
pub use transport::{HttpTransport, Transport};
pub use probe::{ensure_node_source, test_node_conn};
pub use fetch::{build_containers_request, download_node_data, retrieve_node_data, NodeClients, NodeFetchData};
pub use report::{FailureReport, NodeFailure, ReportSummary};
pub use collector::NodeMetricsCollector;
