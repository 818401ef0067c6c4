//! Shutdown coordination.

use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (the server's accept loop, the probe loop) each hold a
/// subscription and wind down when the signal fires.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Bound the drain phase: once shutdown triggers, inflight requests get
/// `grace` to finish before the process is forced down.
pub fn spawn_drain_watchdog(shutdown: &Shutdown, grace: Duration) {
    let mut rx = shutdown.subscribe();
    tokio::spawn(async move {
        if rx.recv().await.is_ok() {
            tokio::time::sleep(grace).await;
            tracing::warn!(grace_secs = grace.as_secs(), "drain deadline exceeded, forcing exit");
            std::process::exit(0);
        }
    });
}
