use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Validated run configuration consumed by the search controller.
///
/// Produced by an embedding CLI/UI layer, either directly or by resolving a
/// [`ConfigFile`]; [`SearchConfig::validate`] range-checks every field before
/// the control loop starts.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Initial concurrency the search starts from.
    pub start_count: u64,
    /// Hard ceiling on the commanded concurrency.
    pub max_concurrency: u64,
    /// First step size of the slow-start phase.
    pub initial_stride: u64,
    /// Target order statistic, e.g. `0.95`.
    pub percentile: f64,
    /// Tail-latency budget in milliseconds.
    pub latency_limit_ms: f64,
    /// Error budget as a fraction of windowed requests.
    pub acceptable_failure_ratio: f64,
    /// Minimum meaningful stride; the search stops refining below it.
    pub precision: u64,
    /// Dwell after reaching a new concurrency before sampling.
    pub settle_time: Duration,
    /// Optional hold at zero concurrency after a failed step, to let a
    /// congested target recover before re-measuring.
    pub cooldown_time: Option<Duration>,
    /// Clients per second handed to the runner's hatch mechanism.
    pub ramp_rate: f64,
    /// Sanity bound on the runner's adjusting phase.
    pub adjust_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_count: 0,
            max_concurrency: 1000,
            initial_stride: 100,
            percentile: 0.95,
            latency_limit_ms: 2000.0,
            acceptable_failure_ratio: 0.05,
            precision: 200,
            settle_time: Duration::from_secs(15),
            cooldown_time: None,
            ramp_rate: 100.0,
            adjust_timeout: Duration::from_secs(300),
        }
    }
}

impl SearchConfig {
    /// Range-checks the configuration before the control loop starts.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] describing an out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.precision == 0 {
            return Err(ConfigError::PrecisionZero);
        }
        if self.initial_stride == 0 {
            return Err(ConfigError::StrideZero);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::CeilingZero);
        }
        if self.max_concurrency < self.start_count {
            return Err(ConfigError::CeilingBelowStart {
                start: self.start_count,
                max: self.max_concurrency,
            });
        }
        if !(0.0..=1.0).contains(&self.percentile) {
            return Err(ConfigError::PercentileOutOfRange {
                value: self.percentile,
            });
        }
        if !(0.0..=1.0).contains(&self.acceptable_failure_ratio) {
            return Err(ConfigError::FailureRatioOutOfRange {
                value: self.acceptable_failure_ratio,
            });
        }
        if self.latency_limit_ms <= 0.0 {
            return Err(ConfigError::LatencyLimitNotPositive {
                value: self.latency_limit_ms,
            });
        }
        if self.ramp_rate <= 0.0 {
            return Err(ConfigError::RampRateNotPositive {
                value: self.ramp_rate,
            });
        }
        if self.settle_time.is_zero() {
            return Err(ConfigError::SettleTimeZero);
        }
        if self.cooldown_time.is_some_and(|cooldown| cooldown.is_zero()) {
            return Err(ConfigError::CooldownZero);
        }
        if self.adjust_timeout.is_zero() {
            return Err(ConfigError::AdjustTimeoutZero);
        }
        Ok(())
    }
}

/// Configuration file contents; every field is optional and resolves onto the
/// [`SearchConfig`] defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub start_count: Option<u64>,
    pub max_concurrency: Option<u64>,
    pub initial_stride: Option<u64>,
    pub percentile: Option<f64>,
    pub latency_limit_ms: Option<f64>,
    pub acceptable_failure_ratio: Option<f64>,
    pub precision: Option<u64>,
    pub settle_time: Option<DurationValue>,
    pub cooldown_time: Option<DurationValue>,
    pub ramp_rate: Option<f64>,
    pub adjust_timeout: Option<DurationValue>,
}

impl ConfigFile {
    /// Resolves the file onto the defaults and validates the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed durations or out-of-range
    /// fields.
    pub fn resolve(self) -> Result<SearchConfig, ConfigError> {
        let defaults = SearchConfig::default();
        let settle_time = self
            .settle_time
            .map(|value| value.to_duration())
            .transpose()?
            .unwrap_or(defaults.settle_time);
        let cooldown_time = self
            .cooldown_time
            .map(|value| value.to_duration())
            .transpose()?
            .or(defaults.cooldown_time);
        let adjust_timeout = self
            .adjust_timeout
            .map(|value| value.to_duration())
            .transpose()?
            .unwrap_or(defaults.adjust_timeout);
        let config = SearchConfig {
            start_count: self.start_count.unwrap_or(defaults.start_count),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            initial_stride: self.initial_stride.unwrap_or(defaults.initial_stride),
            percentile: self.percentile.unwrap_or(defaults.percentile),
            latency_limit_ms: self.latency_limit_ms.unwrap_or(defaults.latency_limit_ms),
            acceptable_failure_ratio: self
                .acceptable_failure_ratio
                .unwrap_or(defaults.acceptable_failure_ratio),
            precision: self.precision.unwrap_or(defaults.precision),
            settle_time,
            cooldown_time,
            ramp_rate: self.ramp_rate.unwrap_or(defaults.ramp_rate),
            adjust_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Duration accepted either as bare seconds or as a `"500ms"`-style string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ConfigError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }
}
