//! Backend handle and requests-in-flight accounting.
//!
//! # Responsibilities
//! - Represent a single origin server and its live load signals
//! - Track requests-in-flight (RIF) with a lock-free counter
//! - Pair every RIF increment with exactly one decrement via RAII

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::observability::MetricsSink;

/// A single origin server with its live load signals.
///
/// Signal fields are individually atomic: a reader may observe values from
/// different moments across fields, but never a torn value of any one field.
#[derive(Debug)]
pub struct Backend {
    /// Stable identifier, unique within the pool.
    pub id: String,
    /// host:port for origin HTTP requests.
    pub address: String,
    /// Last observed probe outcome.
    healthy: AtomicBool,
    /// Requests currently in flight through this balancer.
    rif: AtomicI32,
    /// Last successful probe round-trip, in milliseconds.
    latency_ms: AtomicI64,
    /// Completion time of the most recent applied probe, unix millis.
    /// Zero means the backend has never been probed.
    last_probe_ms: AtomicU64,
    /// Serializes probe-path signal writes. The forward path never takes it.
    pub(crate) probe_write: Mutex<()>,
}

impl Backend {
    /// Create a new backend, optimistically healthy until the first probe.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            healthy: AtomicBool::new(true),
            rif: AtomicI32::new(0),
            latency_ms: AtomicI64::new(0),
            last_probe_ms: AtomicU64::new(0),
            probe_write: Mutex::new(()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    /// Current requests-in-flight.
    pub fn rif(&self) -> i32 {
        self.rif.load(Ordering::Relaxed)
    }

    fn inc_rif(&self) {
        self.rif.fetch_add(1, Ordering::Relaxed);
    }

    fn dec_rif(&self) {
        self.rif.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn latency_ms(&self) -> i64 {
        self.latency_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn set_latency_ms(&self, latency_ms: i64) {
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
    }

    /// Completion time of the most recent applied probe, unix millis.
    ///
    /// The acquire load pairs with the release store in the probe path, so a
    /// reader that observes a given probe time also observes that probe's
    /// health and latency.
    pub fn last_probe_ms(&self) -> u64 {
        self.last_probe_ms.load(Ordering::Acquire)
    }

    pub(crate) fn set_last_probe_ms(&self, timestamp_ms: u64) {
        self.last_probe_ms.store(timestamp_ms, Ordering::Release);
    }
}

/// RAII guard for RIF accounting around one forwarded request.
///
/// Increments the backend's RIF (and the active-request gauge) on acquire and
/// reverses both exactly once on drop, on every exit path including panics.
pub struct RifGuard {
    backend: Arc<Backend>,
    sink: Arc<dyn MetricsSink>,
}

impl RifGuard {
    pub fn acquire(backend: Arc<Backend>, sink: Arc<dyn MetricsSink>) -> Self {
        backend.inc_rif();
        sink.inc_active();
        Self { backend, sink }
    }
}

impl Deref for RifGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for RifGuard {
    fn drop(&mut self) {
        self.backend.dec_rif();
        self.sink.dec_active();
        self.sink.set_backend_rif(&self.backend.id, self.backend.rif());
    }
}
