//! HTTP proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (axum router, request id, trace, timeout)
//!     → selection strategy picks a backend
//!     → forward.rs (RIF guard, URI rewrite, header hygiene)
//!     → shared hyper client → origin
//!     → origin response streamed back to the client
//! ```

pub mod forward;
pub mod server;

pub use server::{AppState, HttpServer};
