//! Latency sample aggregation and windowed statistics.
mod aggregator;
mod types;
mod window;


pub use aggregator::{SampleAggregator, SampleSink, WindowHandle};
pub use types::{DrainedWindow, RequestSample, StatsSnapshot};
pub use window::SampleWindow;
