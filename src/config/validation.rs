//! Configuration validation logic.

use std::collections::HashSet;

use crate::config::schema::ProxyConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate a ProxyConfig for semantic correctness.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.selection_choices < 1 {
        errors.push(ValidationError(
            "selection_choices must be at least 1".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.q_rif) {
        errors.push(ValidationError(format!(
            "q_rif must be within [0, 1], got {}",
            config.q_rif
        )));
    }

    if config.probe_interval_ms == 0 {
        errors.push(ValidationError("probe_interval_ms must be > 0".to_string()));
    }
    if config.probe_timeout_ms == 0 {
        errors.push(ValidationError("probe_timeout_ms must be > 0".to_string()));
    }

    if !config.health_check_path.starts_with('/') {
        errors.push(ValidationError(format!(
            "health_check_path must start with '/', got '{}'",
            config.health_check_path
        )));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for server in &config.servers {
        if server.address.is_empty() {
            errors.push(ValidationError(format!(
                "server '{}' has an empty address",
                server.id
            )));
        }
        if !seen.insert(server.id.as_str()) {
            errors.push(ValidationError(format!(
                "duplicate server id '{}'",
                server.id
            )));
        }
    }

    if config.metrics_enabled && config.metrics_port == config.port {
        errors.push(ValidationError(format!(
            "metrics_port {} collides with the listener port",
            config.metrics_port
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;

    fn server(id: &str, address: &str) -> ServerConfig {
        ServerConfig {
            id: id.into(),
            address: address.into(),
            weight: 1,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn rejects_zero_choices() {
        let mut config = ProxyConfig::default();
        config.selection_choices = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].0.contains("selection_choices"));
    }

    #[test]
    fn rejects_out_of_range_quantile() {
        let mut config = ProxyConfig::default();
        config.q_rif = 1.5;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].0.contains("q_rif"));
    }

    #[test]
    fn rejects_duplicate_server_ids() {
        let mut config = ProxyConfig::default();
        config.servers.push(server("b1", "10.0.0.1:80"));
        config.servers.push(server("b1", "10.0.0.2:80"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].0.contains("duplicate server id 'b1'"));
    }

    #[test]
    fn rejects_metrics_port_collision() {
        let mut config = ProxyConfig::default();
        config.metrics_port = config.port;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].0.contains("metrics_port"));
    }
}
