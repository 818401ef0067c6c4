//! Demo origin server for load-balancing experiments.
//!
//! Simulates a backend under tunable CPU contention: responses take longer as
//! `CPU_LOAD` rises, and the health endpoint reports the server's own
//! inflight count so probes can pick it up.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use rand::Rng;

#[derive(Parser, Debug)]
#[command(name = "demo-backend", about = "Origin server with tunable simulated load")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 8081)]
    port: u16,

    #[arg(long, env = "SERVER_ID", default_value = "unknown")]
    server_id: String,

    /// Simulated CPU contention, 0-100. Adds latency to every response.
    #[arg(long, env = "CPU_LOAD", default_value_t = 0)]
    cpu_load: u32,
}

#[derive(Clone)]
struct BackendState {
    server_id: String,
    cpu_load: u32,
    inflight: Arc<AtomicI32>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let state = BackendState {
        server_id: args.server_id.clone(),
        cpu_load: args.cpu_load,
        inflight: Arc::new(AtomicI32::new(0)),
    };

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    tracing::info!(
        address = %addr,
        server_id = %args.server_id,
        cpu_load = args.cpu_load,
        "demo backend listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn handle_root(State(state): State<BackendState>) -> impl IntoResponse {
    let start = Instant::now();
    state.inflight.fetch_add(1, Ordering::Relaxed);

    simulated_work(state.cpu_load).await;
    let elapsed = start.elapsed();

    state.inflight.fetch_sub(1, Ordering::Relaxed);

    (
        [
            ("content-type", "text/html".to_string()),
            ("x-served-by", state.server_id.clone()),
        ],
        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>Backend Server</title></head>\n<body>\n\
             <h1>Backend Server: {}</h1>\n\
             <p>Request processed in {:?}</p>\n\
             <p>CPU Load: {}% (simulated antagonist contention)</p>\n\
             </body>\n</html>",
            state.server_id, elapsed, state.cpu_load
        ),
    )
}

async fn handle_health(State(state): State<BackendState>) -> impl IntoResponse {
    simulated_work(state.cpu_load).await;

    (
        [
            ("content-type", "application/json".to_string()),
            (
                "x-requests-in-flight",
                state.inflight.load(Ordering::Relaxed).to_string(),
            ),
        ],
        format!(
            r#"{{"status":"healthy","server_id":"{}"}}"#,
            state.server_id
        ),
    )
}

/// Sleep in proportion to the simulated contention, with a little jitter.
async fn simulated_work(cpu_load: u32) {
    if cpu_load == 0 {
        return;
    }

    let base = Duration::from_millis(10);
    let additional = Duration::from_millis((f64::from(cpu_load) / 100.0 * 30.0) as u64);
    let variance = Duration::from_millis(rand::thread_rng().gen_range(0..5));
    tokio::time::sleep(base + additional + variance).await;
}
