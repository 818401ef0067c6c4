//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// TCP port for the frontend listener.
    pub port: u16,

    /// Deadline for reading a client request, seconds.
    pub read_timeout_secs: u64,

    /// Deadline for writing the response, seconds.
    pub write_timeout_secs: u64,

    /// Time between probe cycles, milliseconds.
    pub probe_interval_ms: u64,

    /// Per-probe deadline, milliseconds.
    pub probe_timeout_ms: u64,

    /// URL path probed on each backend.
    pub health_check_path: String,

    /// Subset size for random candidate selection. Must be at least 1.
    pub selection_choices: usize,

    /// Quantile in [0, 1] splitting sampled candidates into cold and hot
    /// by requests-in-flight.
    pub q_rif: f64,

    /// Selection strategy.
    pub algorithm: Algorithm,

    /// Enable the Prometheus exposition listener.
    pub metrics_enabled: bool,

    /// Port for the Prometheus exposition listener.
    pub metrics_port: u16,

    /// How long inflight requests may drain after a shutdown signal, seconds.
    pub shutdown_grace_secs: u64,

    /// Backend servers registered at startup.
    pub servers: Vec<ServerConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            probe_interval_ms: 1_000,
            probe_timeout_ms: 2_000,
            health_check_path: "/health".to_string(),
            selection_choices: 2,
            q_rif: 0.84,
            algorithm: Algorithm::Prequal,
            metrics_enabled: true,
            metrics_port: 9090,
            shutdown_grace_secs: 10,
            servers: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Deadline for one full client exchange. The read and write budgets are
    /// enforced together as a single request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs + self.write_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Selection strategy switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Prequal,
    RoundRobin,
}

/// One backend server definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Unique backend identifier.
    pub id: String,

    /// Backend address, host:port.
    pub address: String,

    /// Reserved for weighted strategies; not used by selection.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config: ProxyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.probe_interval_ms, 1_000);
        assert_eq!(config.probe_timeout_ms, 2_000);
        assert_eq!(config.health_check_path, "/health");
        assert_eq!(config.selection_choices, 2);
        assert_eq!(config.q_rif, 0.84);
        assert_eq!(config.algorithm, Algorithm::Prequal);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn parses_full_config() {
        let config: ProxyConfig = serde_json::from_str(
            r#"{
                "port": 9000,
                "probe_interval_ms": 250,
                "algorithm": "roundrobin",
                "q_rif": 0.5,
                "servers": [
                    {"id": "b1", "address": "10.0.0.1:80"},
                    {"id": "b2", "address": "10.0.0.2:80", "weight": 3}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.algorithm, Algorithm::RoundRobin);
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].weight, 1);
        assert_eq!(config.servers[1].weight, 3);
    }
}
