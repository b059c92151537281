use serde::Serialize;

use super::SearchOutcome;

/// Which health check tripped on a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheck {
    /// The windowed failure ratio exceeded the budget.
    FailureRatio,
    /// The windowed tail-latency percentile reached the limit.
    TailLatency,
    /// The settle window saw no requests at nonzero concurrency.
    NoTraffic,
}

/// One classified search step, emitted for observers and kept in the report.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub step: u64,
    pub concurrency: u64,
    pub stride: u64,
    pub lower_bound: u64,
    pub upper_bound: Option<u64>,
    pub passed: bool,
    pub failed_check: Option<HealthCheck>,
    pub percentile_ms: f64,
    pub failure_ratio: f64,
    pub requests: u64,
}

/// Observational progress events; they carry no control semantics back into
/// the loop and the observer may disappear at any time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    Step(StepRecord),
    Finished(SearchOutcome),
}
