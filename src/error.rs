use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("there were 0 nodes in a ready state")]
    NoReadyNodes,

    #[error("could not find internal IP address for node {node}")]
    AddressNotFound { node: String },

    #[error("failed to list nodes: {0}")]
    ListNodes(#[source] kube::Error),

    #[error("unable to retrieve node metrics. Please verify RBAC roles")]
    NodesUnreachable,

    #[error("error building container stats request: {0}")]
    ContainersRequest(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AgentError {
    /// True for API server write conflicts, the only listing error worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AgentError::ListNodes(kube::Error::Api(resp)) if resp.code == http::StatusCode::CONFLICT.as_u16()
        )
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("failed to read CA bundle {path}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
