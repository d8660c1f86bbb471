//! Device connectivity flag and the health probe that drives it

use super::http::HttpTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Shared "are we online" flag. Starts online.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStatus {
    pub fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Set the flag, returning true if it changed
    pub fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::SeqCst) != online
    }
}

/// Poll the health endpoint until `cancel` fires, reporting every change of
/// connectivity on `changes`.
///
/// Only a failure to reach the network at all marks the device offline. A
/// server that is slow, refusing, or erroring is still reachable.
pub async fn run_health_probe(
    transport: Arc<HttpTransport>,
    status: NetworkStatus,
    interval: Duration,
    timeout: Duration,
    changes: mpsc::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let online = match transport.health(timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, kind = ?e.kind, "Health probe failed");
                !e.kind.is_network_down()
            }
        };

        if status.set_online(online) {
            tracing::info!(online, "Connectivity changed");
            if changes.send(online).await.is_err() {
                break;
            }
        }
    }
}
