//! Balancer-level request counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals for the frontend handler.
///
/// `successful` counts dispatches that reached a backend, independent of the
/// upstream status code; `failed` counts requests that never produced an
/// origin response (no backend available, or the forward itself failed).
#[derive(Debug, Default)]
pub struct Stats {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
}

impl Stats {
    pub fn inc_total(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_successful(&self) {
        self.successful.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn successful(&self) -> u64 {
        self.successful.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
