use anyhow::{Context, Result};
use kube::Client;
use tracing::{error, info, warn};

use node_metrics_agent::collector::NodeMetricsCollector;
use node_metrics_agent::config::load_config;
use node_metrics_agent::kubernetes::cluster_node_source;
use node_metrics_agent::probe::ensure_node_source;
use node_metrics_agent::transport::HttpTransport;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!("cluster = {}", cfg.cluster_host_url);

    if !cfg.retrieve_node_summaries {
        info!("RETRIEVE_NODE_SUMMARIES is disabled, nothing to collect");
        return Ok(());
    }

    let client = Client::try_default().await?;
    let node_source = cluster_node_source(&client);
    let node_client = HttpTransport::node(&cfg)?;
    let cluster_client = HttpTransport::cluster(&cfg)?;

    // Decide once how kubelets are reached; a failure here disables node
    // metrics for the rest of the run
    let plan = match ensure_node_source(&cfg, &node_source, &node_client, &cluster_client).await {
        Ok(plan) => plan,
        Err(e) => {
            error!("node metrics collection disabled: {}", e);
            return Ok(());
        }
    };
    info!(
        mode = %plan.mode,
        direct_mask = ?plan.direct_mask,
        proxy_mask = ?plan.proxy_mask,
        "node metrics retrieval method selected"
    );

    let collector = NodeMetricsCollector::new(&cfg, plan, &node_source, &node_client, &cluster_client);
    tokio::fs::create_dir_all(&cfg.output_dir)
        .await
        .with_context(|| format!("failed to create {}", cfg.output_dir.display()))?;

    let mut ticker = tokio::time::interval(cfg.poll_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample_dir = cfg
                    .output_dir
                    .join(format!("sample-{}", chrono::Utc::now().format("%Y%m%d%H%M%S")));
                if let Err(e) = tokio::fs::create_dir_all(&sample_dir).await {
                    error!("failed to create sample directory {}: {}", sample_dir.display(), e);
                    continue;
                }

                match collector.retrieve_node_summaries(&sample_dir).await {
                    Ok(report) => {
                        let summary = report.summary();
                        info!(
                            "Collection cycle complete: {} node issues found in {}",
                            summary.total_failures(),
                            sample_dir.display()
                        );
                    }
                    Err(e) => warn!("{:#}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
