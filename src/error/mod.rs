mod app;
mod config;
mod fleet;
mod metrics;
mod runner;
mod search;

#[cfg(test)]
mod test_support;

pub use app::{CrestError, CrestResult};
pub use config::ConfigError;
pub use fleet::FleetError;
pub use metrics::MetricsError;
pub use runner::RunnerError;
pub use search::SearchError;
