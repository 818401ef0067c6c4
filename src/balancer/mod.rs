//! Load-balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → registry.rs (snapshot of the pool)
//!     → Selection strategy:
//!         - prequal.rs (sample k, RIF quantile split, cold/hot pick)
//!         - round_robin.rs (rotate through healthy backends)
//!     → backend.rs (RIF guard around the forward)
//!     → stats.rs (request counters)
//! ```
//!
//! # Design Decisions
//! - Strategies are trait objects so the handler never names one
//! - RIF is a lock-free counter; selection reads it without locking
//! - Unhealthy backends are filtered after sampling, not before

pub mod backend;
pub mod prequal;
pub mod registry;
pub mod round_robin;
pub mod stats;

use std::sync::Arc;

use crate::balancer::backend::Backend;
use crate::config::{Algorithm, ProxyConfig};

/// Selection strategy over a pool snapshot.
pub trait Selector: Send + Sync {
    /// Pick one backend for a request, or `None` when no healthy candidate
    /// was found.
    fn select(&self, pool: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}

/// Build the configured selection strategy.
pub fn selector_from_config(config: &ProxyConfig) -> Arc<dyn Selector> {
    match config.algorithm {
        Algorithm::Prequal => Arc::new(prequal::Prequal::new(config.selection_choices, config.q_rif)),
        Algorithm::RoundRobin => Arc::new(round_robin::RoundRobin::new()),
    }
}
