use thiserror::Error;

use super::{ConfigError, FleetError, MetricsError, RunnerError, SearchError};

#[derive(Debug, Error)]
pub enum CrestError {
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
    #[error("Fleet error: {0}")]
    Fleet(#[from] FleetError),
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

pub type CrestResult<T> = Result<T, CrestError>;

impl CrestError {
    #[must_use]
    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn runner<E>(error: E) -> Self
    where
        E: Into<RunnerError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn metrics<E>(error: E) -> Self
    where
        E: Into<MetricsError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn fleet<E>(error: E) -> Self
    where
        E: Into<FleetError>,
    {
        error.into().into()
    }

    #[must_use]
    pub fn search<E>(error: E) -> Self
    where
        E: Into<SearchError>,
    {
        error.into().into()
    }
}
