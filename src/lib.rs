//! Adaptive concurrency search for load-generation fleets.
//!
//! Given a runner that holds a fleet of simulated clients at a commanded
//! concurrency and a stream of per-request telemetry, the
//! [`search::CapacitySearch`] controller discovers the highest concurrency a
//! target sustains while a configured tail-latency percentile and failure
//! ratio stay within budget. The crate is the control plane only: the load
//! engine, its hatch mechanism, and the transport between fleet workers are
//! supplied by the embedder through the [`runner::ClientRunner`] trait, the
//! [`metrics::SampleSink`] telemetry ingress, and the [`distributed`] report
//! channel.
pub mod config;
pub mod distributed;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod runner;
pub mod search;
pub mod shutdown;
