//! HTTP server and frontend request handler.
//!
//! # Responsibilities
//! - Build the axum router and middleware stack
//! - Sequence each request: count → select → forward → record
//! - Serve the balancer's own health endpoint
//! - Drain gracefully on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::balancer::backend::RifGuard;
use crate::balancer::registry::Registry;
use crate::balancer::stats::Stats;
use crate::balancer::Selector;
use crate::config::ProxyConfig;
use crate::observability::MetricsSink;
use crate::proxy::forward::{forward, ProxyClient};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub selector: Arc<dyn Selector>,
    pub stats: Arc<Stats>,
    pub sink: Arc<dyn MetricsSink>,
    pub client: ProxyClient,
}

/// Frontend HTTP server for the balancer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(
        config: &ProxyConfig,
        registry: Arc<Registry>,
        selector: Arc<dyn Selector>,
        stats: Arc<Stats>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            registry,
            selector,
            stats,
            sink,
            client,
        };

        Self {
            router: Self::build_router(config, state),
        }
    }

    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/health", get(handle_health))
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(config.request_timeout()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve on `listener` until the shutdown signal, then stop accepting and
    /// drain inflight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "proxy listening");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("proxy stopped");
        Ok(())
    }
}

async fn handle_health() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"status":"healthy"}"#,
    )
}

/// Main proxy handler: select a backend and forward the request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    state.stats.inc_total();

    let pool = state.registry.snapshot();
    let Some(backend) = state.selector.select(&pool) else {
        warn!("no available servers");
        state.stats.inc_failed();
        return (StatusCode::SERVICE_UNAVAILABLE, "No available servers").into_response();
    };

    debug!(backend = %backend.id, path = %request.uri().path(), "forwarding request");

    let start = Instant::now();
    let guard = RifGuard::acquire(backend.clone(), state.sink.clone());
    let response = match forward(&state.client, guard, peer, request).await {
        Ok(response) => response,
        Err(error) => {
            error!(backend = %backend.id, %error, "forward failed");
            state.stats.inc_failed();
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
    };

    state.sink.observe_request_duration(start.elapsed().as_secs_f64());
    // A completed dispatch, independent of the upstream status code.
    state.stats.inc_successful();
    response
}
