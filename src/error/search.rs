use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search cancelled by shutdown signal.")]
    Cancelled,
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
