//! Fleet report channel: worker-side batching and the newline-JSON wire codec.
mod reporter;
pub mod wire;


use serde::{Deserialize, Serialize};

pub use reporter::{DEFAULT_REPORT_INTERVAL, FleetReporter};

/// One worker's shipped window: the latency samples it accumulated since its
/// last report plus the windowed request/failure counters. The worker clears
/// its local buffer the moment the batch is handed to the report channel, so
/// no observation is ever double-counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBatch {
    pub worker_id: String,
    pub samples: Vec<f64>,
    pub requests: u64,
    pub failures: u64,
}
