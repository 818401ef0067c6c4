//! Prequal selection.
//!
//! Samples `choices` candidates uniformly at random **with replacement**,
//! splits the healthy ones into cold and hot by a quantile of their RIF, then
//! picks the cold backend with the lowest probe latency, falling back to the
//! hot backend with the lowest RIF. Cold backends have spare capacity, so the
//! cheap latency signal is enough to rank them; only a uniformly hot sample
//! needs the load signal itself.

use std::sync::Arc;

use rand::{thread_rng, Rng};

use crate::balancer::backend::Backend;
use crate::balancer::Selector;

/// Bound on resampling when a draw finds no healthy candidate.
const MAX_SAMPLE_ATTEMPTS: usize = 16;

pub struct Prequal {
    choices: usize,
    q_rif: f64,
}

impl Prequal {
    pub fn new(choices: usize, q_rif: f64) -> Self {
        Self { choices, q_rif }
    }

    /// Evaluate one sampled candidate set.
    fn pick(&self, candidates: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let healthy: Vec<Arc<Backend>> = candidates
            .iter()
            .filter(|b| b.is_healthy())
            .cloned()
            .collect();
        if healthy.is_empty() {
            return None;
        }

        let threshold = rif_threshold(&healthy, self.q_rif);

        let mut cold = Vec::new();
        let mut hot = Vec::new();
        for backend in healthy {
            if backend.rif() > threshold {
                hot.push(backend);
            } else {
                cold.push(backend);
            }
        }

        if !cold.is_empty() {
            return lowest_latency(&cold);
        }
        lowest_rif(&hot)
    }
}

impl Selector for Prequal {
    fn select(&self, pool: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if pool.is_empty() {
            return None;
        }

        let mut rng = thread_rng();
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let candidates: Vec<Arc<Backend>> = (0..self.choices)
                .map(|_| pool[rng.gen_range(0..pool.len())].clone())
                .collect();

            if let Some(choice) = self.pick(&candidates) {
                return Some(choice);
            }

            // The draw can come up all-unhealthy; resample while the pool
            // still holds a healthy backend instead of failing the request.
            if !pool.iter().any(|b| b.is_healthy()) {
                return None;
            }
        }

        None
    }
}

/// The q-quantile of the candidates' RIF values: sorted ascending, index
/// `floor((n - 1) * q)`, clamped to the valid range.
fn rif_threshold(candidates: &[Arc<Backend>], q_rif: f64) -> i32 {
    let mut rif_values: Vec<i32> = candidates.iter().map(|b| b.rif()).collect();
    rif_values.sort_unstable();

    let mut index = ((rif_values.len() - 1) as f64 * q_rif) as usize;
    if index >= rif_values.len() {
        index = rif_values.len() - 1;
    }

    rif_values[index]
}

/// Lowest probe latency; ties keep the first candidate in sampled order.
fn lowest_latency(candidates: &[Arc<Backend>]) -> Option<Arc<Backend>> {
    let mut best = candidates.first()?.clone();
    let mut min_latency = best.latency_ms();

    for backend in &candidates[1..] {
        let latency = backend.latency_ms();
        if latency < min_latency {
            min_latency = latency;
            best = backend.clone();
        }
    }

    Some(best)
}

/// Lowest RIF; ties keep the first candidate in sampled order.
fn lowest_rif(candidates: &[Arc<Backend>]) -> Option<Arc<Backend>> {
    let mut best = candidates.first()?.clone();
    let mut min_rif = best.rif();

    for backend in &candidates[1..] {
        let rif = backend.rif();
        if rif < min_rif {
            min_rif = rif;
            best = backend.clone();
        }
    }

    Some(best)
}
