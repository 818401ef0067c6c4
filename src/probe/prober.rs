//! Periodic health and load probing of backends.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::balancer::backend::Backend;
use crate::balancer::registry::Registry;
use crate::config::ProxyConfig;
use crate::observability::MetricsSink;

/// Optional backend-reported inflight count on probe responses.
pub const RIF_HEADER: &str = "x-requests-in-flight";

/// Immutable outcome of one probe, applied to the registry independently.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub backend_id: String,
    /// Probe completion time, unix millis.
    pub timestamp_ms: u64,
    /// Round-trip time; `None` when the probe failed, so the backend keeps
    /// its last observed latency.
    pub latency_ms: Option<i64>,
    pub healthy: bool,
    /// Parsed `X-Requests-In-Flight` response header. Informational only.
    pub rif_reported: Option<i32>,
}

/// Keeps backend signals fresh via periodic HTTP GETs to the health path.
pub struct Prober {
    registry: Arc<Registry>,
    sink: Arc<dyn MetricsSink>,
    client: reqwest::Client,
    interval: Duration,
    health_check_path: String,
}

impl Prober {
    pub fn new(
        registry: Arc<Registry>,
        sink: Arc<dyn MetricsSink>,
        config: &ProxyConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()?;

        Ok(Self {
            registry,
            sink,
            client,
            interval: config.probe_interval(),
            health_check_path: config.health_check_path.clone(),
        })
    }

    /// Run probe cycles until shutdown. The first cycle fires immediately so
    /// optimistic initial health gets corrected fast.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.probe_cycle(),
                _ = shutdown.recv() => {
                    debug!("probe loop stopping");
                    break;
                }
            }
        }
    }

    /// Dispatch one probe task per backend. Tasks do not block one another;
    /// each applies its own result.
    fn probe_cycle(self: &Arc<Self>) {
        for backend in self.registry.snapshot() {
            let prober = Arc::clone(self);
            tokio::spawn(async move {
                let result = prober.probe_backend(&backend).await;
                if prober.registry.apply_probe(&result) {
                    prober
                        .sink
                        .set_backend_health(&result.backend_id, result.healthy);
                } else {
                    debug!(backend = %result.backend_id, "discarded stale probe result");
                }
            });
        }
    }

    async fn probe_backend(&self, backend: &Backend) -> ProbeResult {
        let url = format!("http://{}{}", backend.address, self.health_check_path);

        let start = Instant::now();
        match self.client.get(&url).send().await {
            Ok(response) => {
                let latency_ms = start.elapsed().as_millis() as i64;
                let healthy = response.status() == reqwest::StatusCode::OK;

                // A missing or malformed header is not an error.
                let rif_reported = response
                    .headers()
                    .get(RIF_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<i32>().ok());

                if let Some(rif) = rif_reported {
                    debug!(backend = %backend.id, rif, "backend reported requests in flight");
                }
                if !healthy {
                    warn!(
                        backend = %backend.id,
                        status = %response.status(),
                        "probe returned non-200"
                    );
                }

                ProbeResult {
                    backend_id: backend.id.clone(),
                    timestamp_ms: unix_millis(),
                    latency_ms: Some(latency_ms),
                    healthy,
                    rif_reported,
                }
            }
            Err(error) => {
                warn!(backend = %backend.id, %error, "probe request failed");
                ProbeResult {
                    backend_id: backend.id.clone(),
                    timestamp_ms: unix_millis(),
                    latency_ms: None,
                    healthy: false,
                    rif_reported: None,
                }
            }
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
