use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::AgentConfig;

pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/node-metrics";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<AgentConfig> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<AgentConfig> {
    let cluster_host_url = match env.get_var("CLUSTER_HOST_URL").filter(|s| !s.trim().is_empty()) {
        Some(url) => url.trim().trim_end_matches('/').to_string(),
        None => {
            let host = env.get_var("KUBERNETES_SERVICE_HOST");
            let port = env.get_var("KUBERNETES_SERVICE_PORT");
            match (host, port) {
                (Some(h), Some(p)) => format!("https://{}:{}", h, p),
                _ => {
                    return Err(anyhow!(
                        "CLUSTER_HOST_URL must be set when not running in-cluster (KUBERNETES_SERVICE_HOST/PORT)"
                    ))
                }
            }
        }
    };

    let bearer_token = match env.get_var("BEARER_TOKEN").filter(|s| !s.is_empty()) {
        Some(token) => token,
        None => {
            let path = env
                .get_var("BEARER_TOKEN_PATH")
                .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string());
            std::fs::read_to_string(&path)
                .with_context(|| format!("BEARER_TOKEN not set and token file {} is unreadable", path))?
                .trim()
                .to_string()
        }
    };

    let ca_cert_path = env
        .get_var("CA_CERT_PATH")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let force_kube_proxy = env.get_var("FORCE_KUBE_PROXY")
        .map(|v| parse_bool(&v))
        .unwrap_or(false);

    let retrieve_stats_container = env.get_var("RETRIEVE_STATS_CONTAINER")
        .map(|v| parse_bool(&v))
        .unwrap_or(true);

    let retrieve_node_summaries = env.get_var("RETRIEVE_NODE_SUMMARIES")
        .map(|v| parse_bool(&v))
        .unwrap_or(true);

    let collection_retry_limit: u32 = env.get_var("COLLECTION_RETRY_LIMIT")
        .unwrap_or_else(|| "1".to_string())
        .parse()
        .unwrap_or(1);

    let output_dir = env.get_var("OUTPUT_DIR")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let poll_interval: u64 = env.get_var("POLL_INTERVAL_SECONDS")
        .unwrap_or_else(|| "180".to_string())
        .parse()
        .context("Invalid POLL_INTERVAL_SECONDS")?;
    if poll_interval == 0 {
        return Err(anyhow!("POLL_INTERVAL_SECONDS must be greater than zero"));
    }

    let probe_timeout: u64 = env.get_var("PROBE_TIMEOUT_SECONDS")
        .unwrap_or_else(|| "30".to_string())
        .parse()
        .unwrap_or(30);

    let fetch_timeout: u64 = env.get_var("FETCH_TIMEOUT_SECONDS")
        .unwrap_or_else(|| "60".to_string())
        .parse()
        .unwrap_or(60);

    Ok(AgentConfig {
        cluster_host_url,
        bearer_token,
        ca_cert_path,
        force_kube_proxy,
        retrieve_stats_container,
        retrieve_node_summaries,
        collection_retry_limit,
        output_dir,
        poll_interval: Duration::from_secs(poll_interval),
        probe_timeout: Duration::from_secs(probe_timeout),
        fetch_timeout: Duration::from_secs(fetch_timeout),
    })
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "True")
}
