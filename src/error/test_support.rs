use super::{ConfigError, FleetError, MetricsError, RunnerError, SearchError};

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for MetricsError {
    fn from(message: &'static str) -> Self {
        MetricsError::TestExpectation { message }
    }
}

impl From<String> for MetricsError {
    fn from(value: String) -> Self {
        MetricsError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for FleetError {
    fn from(message: &'static str) -> Self {
        FleetError::TestExpectation { message }
    }
}

impl From<String> for FleetError {
    fn from(value: String) -> Self {
        FleetError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for RunnerError {
    fn from(message: &'static str) -> Self {
        RunnerError::TestExpectation { message }
    }
}

impl From<String> for RunnerError {
    fn from(value: String) -> Self {
        RunnerError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for SearchError {
    fn from(message: &'static str) -> Self {
        SearchError::TestExpectation { message }
    }
}

impl From<String> for SearchError {
    fn from(value: String) -> Self {
        SearchError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}
