use std::collections::BTreeMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::distributed::SampleBatch;
use crate::error::{CrestResult, MetricsError};

use super::window::{SampleWindow, percentile_of_sorted};
use super::{DrainedWindow, RequestSample, StatsSnapshot};

enum AggregatorMessage {
    Record(RequestSample),
    Ingest(SampleBatch),
    Snapshot {
        percent: f64,
        reply: oneshot::Sender<StatsSnapshot>,
    },
    Reset {
        reply: oneshot::Sender<()>,
    },
    Drain {
        reply: oneshot::Sender<DrainedWindow>,
    },
    Close,
}

/// Task-owned latency sample aggregator.
///
/// The window, the per-worker sub-windows, and the windowed request/failure
/// counters live on a dedicated task; writers hold cloneable [`SampleSink`]s
/// whose `record` never blocks, and the controller drives the task with
/// ordered commands. Every message travels over one unbounded channel, so a
/// reset cannot drop a concurrently arriving observation (it lands in a
/// well-defined window) and a snapshot never observes a half-merged fleet.
pub struct SampleAggregator {
    window: WindowHandle,
    handle: JoinHandle<()>,
}

impl SampleAggregator {
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(aggregate(rx));
        Self {
            window: WindowHandle { tx },
            handle,
        }
    }

    /// Cloneable, non-blocking telemetry ingress for the load engine.
    #[must_use]
    pub fn sink(&self) -> SampleSink {
        SampleSink {
            tx: self.window.tx.clone(),
        }
    }

    /// Cloneable command handle for fleet ingestion and worker-side draining.
    #[must_use]
    pub fn window(&self) -> WindowHandle {
        self.window.clone()
    }

    /// Merges all sub-windows and reads the windowed statistics at `percent`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] after [`SampleAggregator::close`].
    pub async fn snapshot(&self, percent: f64) -> Result<StatsSnapshot, MetricsError> {
        self.window.snapshot(percent).await
    }

    /// Clears the window, every known sub-window, and the counters.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] after [`SampleAggregator::close`].
    pub async fn reset(&self) -> Result<(), MetricsError> {
        self.window.reset().await
    }

    /// Takes the local window contents and counters as a shippable batch.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] after [`SampleAggregator::close`].
    pub async fn drain(&self) -> Result<DrainedWindow, MetricsError> {
        self.window.drain().await
    }

    /// Stops the aggregator task and joins it. Sink records sent after this
    /// point are dropped.
    ///
    /// # Errors
    ///
    /// Returns the join error if the aggregator task panicked.
    pub async fn close(self) -> CrestResult<()> {
        if self.window.tx.send(AggregatorMessage::Close).is_err() {
            // Task already gone; joining below reports why.
        }
        Ok(self.handle.await?)
    }
}

/// Telemetry ingress handle held by delivery paths, one per worker or
/// connection. `record` is an unbounded send and never blocks on the
/// controller's state.
#[derive(Clone)]
pub struct SampleSink {
    tx: mpsc::UnboundedSender<AggregatorMessage>,
}

impl SampleSink {
    pub fn record(&self, sample: RequestSample) {
        if self.tx.send(AggregatorMessage::Record(sample)).is_err() {
            tracing::debug!("Dropping sample recorded after aggregator close.");
        }
    }
}

/// Cloneable command handle to the aggregator task.
#[derive(Clone)]
pub struct WindowHandle {
    tx: mpsc::UnboundedSender<AggregatorMessage>,
}

impl WindowHandle {
    /// Merges a fleet batch into the worker's sub-window.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] when the aggregator is gone.
    pub fn ingest(&self, batch: SampleBatch) -> Result<(), MetricsError> {
        self.tx
            .send(AggregatorMessage::Ingest(batch))
            .map_err(|_send_err| MetricsError::CollectorClosed)
    }

    /// See [`SampleAggregator::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] when the aggregator is gone.
    pub async fn snapshot(&self, percent: f64) -> Result<StatsSnapshot, MetricsError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AggregatorMessage::Snapshot { percent, reply })
            .map_err(|_send_err| MetricsError::CollectorClosed)?;
        response.await.map_err(|_recv_err| MetricsError::CollectorClosed)
    }

    /// See [`SampleAggregator::reset`].
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] when the aggregator is gone.
    pub async fn reset(&self) -> Result<(), MetricsError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AggregatorMessage::Reset { reply })
            .map_err(|_send_err| MetricsError::CollectorClosed)?;
        response.await.map_err(|_recv_err| MetricsError::CollectorClosed)
    }

    /// See [`SampleAggregator::drain`].
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::CollectorClosed`] when the aggregator is gone.
    pub async fn drain(&self) -> Result<DrainedWindow, MetricsError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(AggregatorMessage::Drain { reply })
            .map_err(|_send_err| MetricsError::CollectorClosed)?;
        response.await.map_err(|_recv_err| MetricsError::CollectorClosed)
    }
}

#[derive(Default)]
struct WindowState {
    local: SampleWindow,
    workers: BTreeMap<String, SampleWindow>,
    requests: u64,
    failures: u64,
}

impl WindowState {
    fn record(&mut self, sample: &RequestSample) {
        self.requests = self.requests.saturating_add(1);
        if sample.success {
            // Only successful responses contribute a latency observation.
            self.local.record(sample.latency_ms);
        } else {
            self.failures = self.failures.saturating_add(1);
        }
    }

    fn ingest(&mut self, batch: SampleBatch) {
        self.requests = self.requests.saturating_add(batch.requests);
        self.failures = self.failures.saturating_add(batch.failures);
        self.workers
            .entry(batch.worker_id)
            .or_default()
            .extend(batch.samples);
    }

    fn snapshot(&self, percent: f64) -> StatsSnapshot {
        let mut merged: Vec<f64> = self.local.samples().to_vec();
        for window in self.workers.values() {
            merged.extend_from_slice(window.samples());
        }
        merged.sort_by(f64::total_cmp);
        StatsSnapshot {
            percent,
            percentile_ms: percentile_of_sorted(&merged, percent),
            requests: self.requests,
            failures: self.failures,
            samples: u64::try_from(merged.len()).unwrap_or(u64::MAX),
        }
    }

    fn reset(&mut self) {
        self.local.reset();
        for window in self.workers.values_mut() {
            window.reset();
        }
        self.requests = 0;
        self.failures = 0;
    }

    fn drain(&mut self) -> DrainedWindow {
        let drained = DrainedWindow {
            samples: self.local.take(),
            requests: self.requests,
            failures: self.failures,
        };
        self.requests = 0;
        self.failures = 0;
        drained
    }
}

async fn aggregate(mut rx: mpsc::UnboundedReceiver<AggregatorMessage>) {
    let mut state = WindowState::default();
    while let Some(message) = rx.recv().await {
        match message {
            AggregatorMessage::Record(sample) => state.record(&sample),
            AggregatorMessage::Ingest(batch) => state.ingest(batch),
            AggregatorMessage::Snapshot { percent, reply } => {
                if reply.send(state.snapshot(percent)).is_err() {
                    tracing::debug!("Snapshot requester went away before the reply.");
                }
            }
            AggregatorMessage::Reset { reply } => {
                state.reset();
                drop(reply.send(()));
            }
            AggregatorMessage::Drain { reply } => {
                if reply.send(state.drain()).is_err() {
                    tracing::debug!("Drain requester went away before the reply.");
                }
            }
            AggregatorMessage::Close => break,
        }
    }
}
