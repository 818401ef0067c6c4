//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Frontend handler / RIF guards / prober
//!     → MetricsSink trait (metrics.rs)
//!     → metrics recorder → Prometheus exposition listener
//!
//! All subsystems
//!     → tracing macros → subscriber (logging.rs)
//! ```
//!
//! # Design Decisions
//! - The core depends only on the `MetricsSink` trait, not on the exporter
//! - Exposition runs on its own listener, off the request path
//! - Log filter is environment-overridable (`RUST_LOG`)

pub mod logging;
pub mod metrics;

pub use logging::init_tracing;
pub use metrics::{init_metrics, MetricsSink, PrometheusSink};
