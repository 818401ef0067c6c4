//! Metrics collection and exposition.

use std::net::SocketAddr;

use metrics::{gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Sink for the balancer's operational metrics.
///
/// The request path, the RIF guards, and the prober record through this
/// trait; the exposition endpoint is wired up separately in [`init_metrics`].
/// Implementations must be safe under concurrent calls.
pub trait MetricsSink: Send + Sync {
    /// Record one request's wall-clock duration, in seconds.
    fn observe_request_duration(&self, seconds: f64);

    /// Track requests currently inside the balancer.
    fn inc_active(&self);
    fn dec_active(&self);

    /// Publish a backend's probed health (1 = healthy, 0 = unhealthy).
    fn set_backend_health(&self, id: &str, healthy: bool);

    /// Publish a backend's current requests-in-flight.
    fn set_backend_rif(&self, id: &str, rif: i32);
}

/// Records through the `metrics` macros; a no-op until a recorder is
/// installed.
#[derive(Debug, Default, Clone)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn observe_request_duration(&self, seconds: f64) {
        histogram!("request_duration_seconds").record(seconds);
    }

    fn inc_active(&self) {
        gauge!("active_requests").increment(1.0);
    }

    fn dec_active(&self) {
        gauge!("active_requests").decrement(1.0);
    }

    fn set_backend_health(&self, id: &str, healthy: bool) {
        let value = if healthy { 1.0 } else { 0.0 };
        gauge!("server_health", "server_id" => id.to_string()).set(value);
    }

    fn set_backend_rif(&self, id: &str, rif: i32) {
        gauge!("server_rif", "server_id" => id.to_string()).set(rif as f64);
    }
}

/// Install the Prometheus recorder and its exposition listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "metrics exposition listening");
    Ok(())
}
