use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Method};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::types::AgentConfig;

/// HTTP access to kubelet metrics endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url` and persists the body as `artifact` under `out_dir`.
    async fn fetch(
        &self,
        method: Method,
        artifact: &str,
        out_dir: &Path,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, TransportError>;

    /// Reachability check. A non-success status is `Ok(false)`; only a
    /// failure to complete the request is an error.
    async fn test_connection(&self, url: &str, method: Method) -> Result<bool, TransportError>;

    /// Removes a previously persisted artifact. Missing artifacts are ignored.
    async fn remove_artifact(&self, artifact: &str, out_dir: &Path) -> Result<(), TransportError> {
        let path = out_dir.join(artifact);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TransportError::Io { path, source }),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    bearer_token: String,
    retry_limit: u32,
}

impl HttpTransport {
    /// Client for talking to kubelets directly. Certificates are not verified.
    pub fn node(config: &AgentConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.probe_timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(TransportError::ClientBuild)?;
        Ok(Self::with_client(client, config))
    }

    /// Client for the API server, with normal certificate verification.
    pub fn cluster(config: &AgentConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().timeout(config.fetch_timeout);
        if let Some(path) = &config.ca_cert_path {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }
        let client = builder.build().map_err(TransportError::ClientBuild)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &AgentConfig) -> Self {
        Self {
            client,
            bearer_token: config.bearer_token.clone(),
            retry_limit: config.collection_retry_limit,
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<reqwest::Response, TransportError> {
        let mut req = self
            .client
            .request(method, url)
            .bearer_auth(&self.bearer_token);
        if let Some(body) = body {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }
        req.send().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })
    }

    async fn fetch_bytes(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, TransportError> {
        let resp = self.send(method, url, body).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        method: Method,
        artifact: &str,
        out_dir: &Path,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, TransportError> {
        let mut attempt = 0;
        let bytes = loop {
            match self.fetch_bytes(method.clone(), url, body).await {
                Ok(bytes) => break bytes,
                Err(e @ TransportError::Request { .. }) if attempt < self.retry_limit => {
                    attempt += 1;
                    warn!("request to {} failed, retrying ({}/{}): {}", url, attempt, self.retry_limit, e);
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        };

        let path: PathBuf = out_dir.join(artifact);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| TransportError::Io { path: path.clone(), source })?;
        debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(bytes)
    }

    async fn test_connection(&self, url: &str, method: Method) -> Result<bool, TransportError> {
        let resp = self.send(method, url, None).await?;
        let status = resp.status();
        if !status.is_success() {
            debug!("{} responded with {}", url, status);
        }
        Ok(status.is_success())
    }
}

fn load_certificate(path: &Path) -> Result<Certificate, TransportError> {
    let pem = std::fs::read(path).map_err(|source| TransportError::CaBundle {
        path: path.to_path_buf(),
        source,
    })?;
    Certificate::from_pem(&pem).map_err(TransportError::ClientBuild)
}
