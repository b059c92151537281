use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Sample collector channel closed.")]
    CollectorClosed,
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
