//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `pushsub` application.
//!
//! It centralizes the crate-wide error type and logging setup so every other
//! module reports failures and diagnostics the same way.

pub mod error;
pub mod logging;

pub use error::{Error, Result};

#[cfg(test)]
mod tests {
    use super::error::Error;
    use super::logging;

    #[test]
    fn logging_init_can_be_repeated() {
        logging::init("info");
        assert!(!logging::init("debug"));
    }

    #[test]
    fn parse_level_names() {
        use tracing::Level;
        assert_eq!(logging::parse_level("ERROR"), Level::ERROR);
        assert_eq!(logging::parse_level("warning"), Level::WARN);
        assert_eq!(logging::parse_level(" debug "), Level::DEBUG);
        assert_eq!(logging::parse_level("trace"), Level::TRACE);
        assert_eq!(logging::parse_level("nonsense"), Level::INFO);
    }

    #[test]
    fn unknown_topic_error_names_the_topic() {
        let err = Error::UnknownTopic("orders".to_string());
        assert_eq!(err.to_string(), "unknown topic: orders");
    }

    #[test]
    fn backpressure_error_is_distinguishable() {
        let err = Error::Backpressure {
            topic: "orders".to_string(),
        };
        assert!(err.is_backpressure());
        assert!(!Error::UnknownTopic("orders".to_string()).is_backpressure());
    }
}
