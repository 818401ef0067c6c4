//! Backend registry.
//!
//! # Responsibilities
//! - Own the pool of backends, in stable order
//! - Hand out snapshots whose handles share the live signal fields
//! - Apply probe results to per-backend signals

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::balancer::backend::Backend;
use crate::probe::ProbeResult;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate backend id: {0}")]
    DuplicateBackend(String),
}

/// The pool of registered backends.
///
/// The list itself is guarded by a reader-writer lock, write-locked only for
/// `add`. Signal fields on each backend are individually atomic, so snapshot
/// readers observe live values without holding the lock.
#[derive(Debug, Default)]
pub struct Registry {
    backends: RwLock<Vec<Arc<Backend>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend. Ids must be unique within the pool.
    pub fn add(&self, backend: Backend) -> Result<Arc<Backend>, RegistryError> {
        let mut pool = self.backends.write().expect("backend pool lock poisoned");
        if pool.iter().any(|b| b.id == backend.id) {
            return Err(RegistryError::DuplicateBackend(backend.id));
        }
        let backend = Arc::new(backend);
        pool.push(backend.clone());
        Ok(backend)
    }

    /// A consistent view of the pool. The returned handles share the mutable
    /// signal fields with the registry.
    pub fn snapshot(&self) -> Vec<Arc<Backend>> {
        self.backends.read().expect("backend pool lock poisoned").clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Backend>> {
        self.backends
            .read()
            .expect("backend pool lock poisoned")
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.read().expect("backend pool lock poisoned").is_empty()
    }

    /// Apply a probe result to the backend's signal fields.
    ///
    /// Returns `false` when the result was discarded: unknown backend, or a
    /// slow probe from an older cycle landing after a newer one already
    /// applied. Signal stores happen before the `last_probe_ms` publication,
    /// so readers that observe the new probe time observe its signals.
    pub fn apply_probe(&self, result: &ProbeResult) -> bool {
        let Some(backend) = self.get(&result.backend_id) else {
            return false;
        };

        let _write = backend.probe_write.lock().expect("probe write lock poisoned");
        if backend.last_probe_ms() > result.timestamp_ms {
            return false;
        }

        backend.set_healthy(result.healthy);
        if let Some(latency_ms) = result.latency_ms {
            backend.set_latency_ms(latency_ms);
        }
        backend.set_last_probe_ms(result.timestamp_ms);
        true
    }
}
