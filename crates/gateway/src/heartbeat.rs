use std::sync::Arc;
use std::time::Duration;

use proto::GatewayEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::session::SessionState;

/// Periodic heartbeat for one connection.
///
/// The first beat goes out one full interval after spawning. Dropping the
/// monitor stops it.
pub struct HeartbeatMonitor {
    interval: Duration,
    handle: JoinHandle<()>,
}

impl HeartbeatMonitor {
    /// Starts beating every `interval` with the session's last sequence.
    /// `interval` must be non-zero.
    pub fn spawn(
        interval: Duration,
        session: Arc<SessionState>,
        outbound: mpsc::Sender<GatewayEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let sequence = session.sequence();
                if outbound.send(GatewayEvent::heartbeat(sequence)).await.is_err() {
                    debug!("Outbound queue closed, heartbeat stopped");
                    break;
                }
                trace!(?sequence, "Heartbeat queued");
            }
        });
        debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");
        Self { interval, handle }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
