use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::CrestResult;
use crate::metrics::WindowHandle;
use crate::shutdown::ShutdownSender;

use super::SampleBatch;

/// Matches the upstream worker report cadence.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(3);

/// Worker-side report loop.
///
/// Drains the worker's local window every `report_interval` and hands the
/// contents to the report channel; the successful send is the acknowledgment,
/// and the local buffer was already cleared by the drain. On shutdown the
/// remaining window is flushed once more so tail samples are not lost.
pub struct FleetReporter {
    handle: JoinHandle<()>,
}

impl FleetReporter {
    #[must_use]
    pub fn spawn(
        worker_id: String,
        window: WindowHandle,
        report_tx: mpsc::UnboundedSender<SampleBatch>,
        report_interval: Duration,
        shutdown_tx: &ShutdownSender,
    ) -> Self {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(report_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        if !ship(&worker_id, &window, &report_tx).await {
                            return;
                        }
                    }
                }
            }
            let _tail_flush = ship(&worker_id, &window, &report_tx).await;
        });
        Self { handle }
    }

    /// Waits for the report loop to finish, including its final flush.
    ///
    /// # Errors
    ///
    /// Returns the join error if the report task panicked.
    pub async fn join(self) -> CrestResult<()> {
        Ok(self.handle.await?)
    }
}

/// Returns `false` when the reporter should stop.
async fn ship(
    worker_id: &str,
    window: &WindowHandle,
    report_tx: &mpsc::UnboundedSender<SampleBatch>,
) -> bool {
    let drained = match window.drain().await {
        Ok(drained) => drained,
        Err(err) => {
            debug!("Stopping fleet reporter: {}", err);
            return false;
        }
    };
    if drained.is_empty() {
        return true;
    }
    let batch = SampleBatch {
        worker_id: worker_id.to_owned(),
        samples: drained.samples,
        requests: drained.requests,
        failures: drained.failures,
    };
    if report_tx.send(batch).is_err() {
        warn!("Report channel closed; dropping a sample batch.");
        return false;
    }
    true
}
