use serde::{Deserialize, Serialize};

/// One completed request reported by the load engine at request completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSample {
    pub kind: String,
    pub name: String,
    pub latency_ms: f64,
    pub success: bool,
}

impl RequestSample {
    #[must_use]
    pub const fn success(kind: String, name: String, latency_ms: f64) -> Self {
        Self {
            kind,
            name,
            latency_ms,
            success: true,
        }
    }

    #[must_use]
    pub const fn failure(kind: String, name: String, latency_ms: f64) -> Self {
        Self {
            kind,
            name,
            latency_ms,
            success: false,
        }
    }
}

/// Windowed statistics read by the controller at decision time.
///
/// All counters cover the interval since the last window reset; the
/// percentile is the interpolated order statistic of the merged window at
/// `percent`. An empty window reports a percentile of `0` — use
/// [`StatsSnapshot::requests`] to tell "no data yet" apart from a real zero
/// latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub percent: f64,
    pub percentile_ms: f64,
    pub requests: u64,
    pub failures: u64,
    pub samples: u64,
}

impl StatsSnapshot {
    #[must_use]
    pub const fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f64 / self.requests as f64
        }
    }
}

/// Contents taken out of a worker's local window, ready to ship.
#[derive(Debug, Clone, Default)]
pub struct DrainedWindow {
    pub samples: Vec<f64>,
    pub requests: u64,
    pub failures: u64,
}

impl DrainedWindow {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.requests == 0
    }
}
