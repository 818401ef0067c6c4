//! Active probing subsystem.
//!
//! # Data Flow
//! ```text
//! Interval tick
//!     → prober.rs: snapshot the pool
//!     → one concurrent probe task per backend (own deadline)
//!     → ProbeResult applied to the registry independently
//!     → backend health published to the metrics sink
//! ```
//!
//! # Design Decisions
//! - One shared HTTP client with the probe timeout built in
//! - A failed probe marks the backend unhealthy but keeps its last latency
//! - Cycles are fixed cadence; no backoff, no cross-backend blocking

pub mod prober;

pub use prober::{ProbeResult, Prober};
