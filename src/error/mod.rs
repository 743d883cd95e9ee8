//! Error definitions
//!
//! Assertions never fail through this type; they report through a
//! [`Reporter`](crate::report::Reporter). These errors come from the
//! supporting pieces that can genuinely fail.

use thiserror::Error;

/// Main error type for testkit-reactive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An expectation was not fulfilled in time
    #[error("Expectation not fulfilled after {0:?}")]
    Timeout(std::time::Duration),

    /// One or more recorded assertions failed
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),
}

impl Error {
    /// Create an assertion failed error.
    #[must_use]
    pub fn assertion_failed(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_display() {
        let err = Error::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Expectation not fulfilled after 250ms");
    }

    #[test]
    fn test_assertion_failed_display() {
        let err = Error::assertion_failed("2 does not equal 1");
        assert_eq!(err.to_string(), "Assertion failed: 2 does not equal 1");
    }
}
