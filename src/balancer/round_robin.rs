//! Round-robin selection.
//!
//! Rotates through the healthy backends with an atomic counter; no locks.
//! Kept behind the `algorithm` config switch as the simple alternative to
//! Prequal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::balancer::backend::Backend;
use crate::balancer::Selector;

#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn select(&self, pool: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let healthy: Vec<&Arc<Backend>> = pool.iter().filter(|b| b.is_healthy()).collect();
        if healthy.is_empty() {
            return None;
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % healthy.len();
        Some(healthy[index].clone())
    }
}
