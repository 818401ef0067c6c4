use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use prequal_proxy::balancer::backend::Backend;
use prequal_proxy::balancer::registry::Registry;
use prequal_proxy::balancer::stats::Stats;
use prequal_proxy::balancer::{self, Selector};
use prequal_proxy::config::{load_config, ProxyConfig};
use prequal_proxy::lifecycle::{self, Shutdown};
use prequal_proxy::observability::{self, MetricsSink, PrometheusSink};
use prequal_proxy::probe::Prober;
use prequal_proxy::proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(
    name = "prequal-proxy",
    about = "HTTP reverse-proxy load balancer using the Prequal selection algorithm"
)]
struct Args {
    /// Port for the frontend listener. Overrides the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_tracing("prequal_proxy=info,tower_http=warn");

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::info!(
        port = config.port,
        algorithm = ?config.algorithm,
        backends = config.servers.len(),
        selection_choices = config.selection_choices,
        q_rif = config.q_rif,
        "configuration loaded"
    );

    if config.metrics_enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
        observability::init_metrics(addr)?;
    }

    let registry = Arc::new(Registry::new());
    for server in &config.servers {
        registry.add(Backend::new(&server.id, &server.address))?;
    }

    let stats = Arc::new(Stats::default());
    let sink: Arc<dyn MetricsSink> = Arc::new(PrometheusSink);
    let selector: Arc<dyn Selector> = balancer::selector_from_config(&config);

    let shutdown = Shutdown::new();

    let prober = Arc::new(Prober::new(registry.clone(), sink.clone(), &config)?);
    tokio::spawn(prober.run(shutdown.subscribe()));

    lifecycle::spawn_drain_watchdog(&shutdown, config.shutdown_grace());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            lifecycle::wait_for_signal().await;
            shutdown.trigger();
        }
    });

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;
    let server = HttpServer::new(&config, registry, selector, stats, sink);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
