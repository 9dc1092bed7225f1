//! Common types and utilities shared across Veracity crates.
//!
//! This crate defines the shared error taxonomy and observability helpers
//! used throughout the Veracity workspace. It stays dependency‑light so the
//! HTTP, config and analysis crates can all depend on it.
//!
//! # Overview
//!
//! - [`VeracityError`] and [`Result`]: every way an analysis can fail
//! - [`observability`]: Centralised tracing/logging initialisation
//!
//! # Examples
//!
//! Every failure collapses to one generic message for the end user, except
//! cancellation which stays silent:
//!
//! ```rust
//! use veracity_common::{VeracityError, GENERIC_FAILURE_MESSAGE};
//!
//! let err = VeracityError::MalformedResponse("confidence out of range".into());
//! assert_eq!(err.user_message(), Some(GENERIC_FAILURE_MESSAGE));
//! assert_eq!(VeracityError::Cancelled.user_message(), None);
//! ```

pub mod observability;

/// Boxed cause carried by [`VeracityError::Provider`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What the presentation layer shows for any failed analysis.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while analyzing the message. Please try again.";

/// Error types used across the Veracity system.
#[derive(thiserror::Error, Debug)]
pub enum VeracityError {
    /// Credential or settings were missing or invalid. Blocks all analysis.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport or provider-side failure.
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The provider replied with data that breaks the result contract.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The caller aborted the analysis.
    #[error("Analysis cancelled")]
    Cancelled,

    /// The message was empty after trimming; nothing was sent.
    #[error("Nothing to analyze: message is empty")]
    EmptyInput,
}

impl VeracityError {
    /// Provider failure without an underlying error value.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Provider failure wrapping the error that caused it.
    pub fn provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Provider {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Text to show the end user, or `None` when nothing should be shown.
    ///
    /// Provider and malformed-response failures are indistinguishable here:
    /// both mean "analysis failed, try again".
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Cancelled | Self::EmptyInput => None,
            Self::Configuration(_) | Self::Provider { .. } | Self::MalformedResponse(_) => {
                Some(GENERIC_FAILURE_MESSAGE)
            }
        }
    }
}

/// Convenient alias for results that use [`VeracityError`].
pub type Result<T> = std::result::Result<T, VeracityError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn provider_error_keeps_its_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = VeracityError::provider_with_source("request failed", io);

        assert_eq!(err.to_string(), "Provider error: request failed");
        let cause = err.source().expect("cause is attached");
        assert_eq!(cause.to_string(), "reset by peer");
    }

    #[test]
    fn provider_and_malformed_look_the_same_to_users() {
        let a = VeracityError::provider("503");
        let b = VeracityError::MalformedResponse("verdict".into());
        assert_eq!(a.user_message(), b.user_message());
        assert!(!a.is_cancelled());
    }

    #[test]
    fn cancellation_is_silent() {
        assert!(VeracityError::Cancelled.is_cancelled());
        assert!(VeracityError::Cancelled.user_message().is_none());
    }
}
