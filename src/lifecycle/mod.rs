//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! SIGINT/SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains inflight forwards
//!     → probe loop halts
//!     → drain watchdog forces exit after the grace deadline
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{spawn_drain_watchdog, Shutdown};
pub use signals::wait_for_signal;
