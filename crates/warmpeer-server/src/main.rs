//! Warmpeer - keeps connections open to the DHT providers of a content id

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use warmpeer_core::ContentId;
use warmpeer_server::{
    config::{parse_addrs, DiscoveryConfig, NetworkConfig},
    discovery::DiscoveryController,
    network::Libp2pMeshNode,
    observability::{init_metrics, init_tracing, tracing::LogFormat, TracingConfig},
    version,
};

#[derive(Parser)]
#[command(name = "warmpeer")]
#[command(version = version::full_version())]
#[command(about = "Discovers DHT providers of a content id and keeps them connected")]
struct Cli {
    /// Content id whose providers are kept connected
    #[arg(long, env = "WARMPEER_CONTENT_ID")]
    content_id: Option<ContentId>,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "WARMPEER_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Circuit relay multiaddr (repeatable)
    #[arg(long = "relay")]
    relays: Vec<String>,

    /// Bootstrap peer multiaddr (repeatable); replaces the default list
    #[arg(long = "bootstrap")]
    bootstrap: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::from_env();
    if let Some(format) = cli.log_format.as_deref() {
        tracing_config.log_format = LogFormat::parse(format);
    }
    init_tracing(tracing_config).map_err(|e| anyhow::anyhow!(e))?;

    info!(version = %version::full_version(), "Starting warmpeer");
    debug!(build = %version::build_info(), "Build info");

    if let Some(addr) = cli.metrics_addr {
        let state = init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!(address = %state.listen_addr, "Metrics endpoint listening");
    }

    let mut network_config = NetworkConfig::from_env();
    if !cli.relays.is_empty() {
        network_config.relay_addrs = parse_addrs(cli.relays.iter().map(String::as_str));
    }
    if !cli.bootstrap.is_empty() {
        network_config.bootstrap_peers = parse_addrs(cli.bootstrap.iter().map(String::as_str));
    }

    let mut discovery_config = DiscoveryConfig::from_env();
    if let Some(content_id) = cli.content_id {
        discovery_config.content_id = content_id;
    }

    let node = match Libp2pMeshNode::start(&network_config) {
        Ok(node) => Arc::new(node),
        Err(e) => {
            error!(error = %e, "Failed to start mesh node");
            return Err(e);
        }
    };

    let mut controller = DiscoveryController::new(node, discovery_config);

    tokio::select! {
        _ = controller.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
    }

    let stats = controller.shutdown().await;
    info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        "Warmpeer stopped"
    );

    Ok(())
}
