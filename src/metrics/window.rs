/// Append-only, resettable window of latency observations in milliseconds.
///
/// Scoped to the interval between two consecutive controller steps; the
/// controller resets it at the start of every step.
#[derive(Debug, Clone, Default)]
pub struct SampleWindow {
    samples: Vec<f64>,
}

impl SampleWindow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency_ms: f64) {
        self.samples.push(latency_ms);
    }

    pub fn extend(&mut self, samples: Vec<f64>) {
        self.samples.extend(samples);
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Takes the window contents, leaving it empty.
    pub fn take(&mut self) -> Vec<f64> {
        std::mem::take(&mut self.samples)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Interpolated order statistic of the window at `percent` in `[0, 1]`.
    ///
    /// Sorts a copy of the window and evaluates `k = (n - 1) * percent`: when
    /// `k` lands on an index that value is returned, otherwise the floor and
    /// ceiling neighbors are blended by the fractional distance. An empty
    /// window yields `0`.
    #[must_use]
    pub fn percentile(&self, percent: f64) -> f64 {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);
        percentile_of_sorted(&sorted, percent)
    }
}

/// Interpolated order statistic over an already sorted slice.
pub(crate) fn percentile_of_sorted(sorted: &[f64], percent: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let rank = last as f64 * percent.clamp(0.0, 1.0);
    let floor = rank.floor();
    let ceiling = rank.ceil();
    let lower = sorted.get(floor as usize).copied().unwrap_or(0.0);
    if floor == ceiling {
        return lower;
    }
    let upper = sorted.get(ceiling as usize).copied().unwrap_or(lower);
    lower * (ceiling - rank) + upper * (rank - floor)
}
