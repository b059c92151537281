use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Config precision must be >= 1.")]
    PrecisionZero,
    #[error("Config initial_stride must be >= 1.")]
    StrideZero,
    #[error("Config max_concurrency must be >= 1.")]
    CeilingZero,
    #[error("Config max_concurrency ({max}) must be >= start_count ({start}).")]
    CeilingBelowStart { start: u64, max: u64 },
    #[error("Config percentile must be within [0, 1], got {value}.")]
    PercentileOutOfRange { value: f64 },
    #[error("Config acceptable_failure_ratio must be within [0, 1], got {value}.")]
    FailureRatioOutOfRange { value: f64 },
    #[error("Config latency_limit_ms must be > 0, got {value}.")]
    LatencyLimitNotPositive { value: f64 },
    #[error("Config ramp_rate must be > 0, got {value}.")]
    RampRateNotPositive { value: f64 },
    #[error("Config settle_time must be > 0.")]
    SettleTimeZero,
    #[error("Config cooldown_time must be > 0.")]
    CooldownZero,
    #[error("Config adjust_timeout must be > 0.")]
    AdjustTimeoutZero,
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
