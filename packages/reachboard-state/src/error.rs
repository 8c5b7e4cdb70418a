//! Structured error types for the state layer.
//!
//! # The Error Boundary Rule
//!
//! > **No `anyhow::Error` ever reaches a [`DomainState`](crate::DomainState).**
//!
//! - `anyhow` is internal transport at the provider seam
//! - [`FetchFailure`] classifies what went wrong with one fetch
//! - Only the rendered message string is stored and shown to consumers
//!
//! The same rule holds for the auth gate: [`AuthError`] is converted to a
//! plain message before it is dispatched as an [`AuthEvent`](crate::AuthEvent).

use std::time::Duration;

use thiserror::Error;

use crate::models::Domain;

// =============================================================================
// Payload Validation
// =============================================================================

/// A domain payload failed to decode or validate at the provider boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    /// The JSON did not match the domain's schema.
    #[error("{0}")]
    Shape(String),

    /// A numeric field was NaN or infinite.
    #[error("{field} is not a finite number")]
    NonFinite { field: String },

    /// A count (reach, audience size) was negative.
    #[error("{field} must not be negative (got {value})")]
    Negative { field: String, value: f64 },

    /// A percentage was outside `0..=100`.
    #[error("{field} must be between 0 and 100 (got {value})")]
    PercentageOutOfRange { field: String, value: f64 },

    /// A trend period label is not a calendar month.
    #[error("unknown month '{0}'")]
    UnknownMonth(String),

    /// Trend periods are not strictly chronological.
    #[error("trend periods out of order: '{previous}' is followed by '{next}'")]
    OutOfOrder { previous: String, next: String },
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Shape(err.to_string())
    }
}

// =============================================================================
// Fetch Failures
// =============================================================================

/// Why a single domain fetch did not produce data.
///
/// `FetchFailure` is orchestrator-internal. Its [`message`](Self::message) is
/// the only thing that is dispatched into the store.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The remote data provider rejected the request.
    #[error("{message}")]
    Provider { domain: Domain, message: String },

    /// The provider answered with a payload that failed validation.
    #[error("invalid {domain} payload: {source}")]
    Malformed {
        domain: Domain,
        #[source]
        source: PayloadError,
    },

    /// The provider did not answer within the configured timeout.
    #[error("{domain} request timed out after {}ms", .after.as_millis())]
    TimedOut { domain: Domain, after: Duration },
}

impl FetchFailure {
    /// Convert a provider error into a failure, keeping only its message.
    ///
    /// Uses the outermost context of the error chain. An empty message falls
    /// back to a generic per-domain text.
    pub fn from_provider(domain: Domain, err: &anyhow::Error) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            return Self::fallback(domain);
        }
        FetchFailure::Provider { domain, message }
    }

    /// Generic provider failure, used when nothing better is known.
    pub fn fallback(domain: Domain) -> Self {
        FetchFailure::Provider {
            domain,
            message: format!("Failed to fetch {} data", domain.label().to_lowercase()),
        }
    }

    /// The human-readable message stored as the domain's `error`.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The domain this failure belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            FetchFailure::Provider { domain, .. }
            | FetchFailure::Malformed { domain, .. }
            | FetchFailure::TimedOut { domain, .. } => *domain,
        }
    }
}

// =============================================================================
// Auth Failures
// =============================================================================

/// Login or session-check failure reported by an [`AuthProvider`](crate::AuthProvider).
///
/// Network and authorization failures are deliberately not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = anyhow!("network unreachable");
        let failure = FetchFailure::from_provider(Domain::AudienceMetrics, &err);
        assert_eq!(failure.message(), "network unreachable");
        assert_eq!(failure.domain(), Domain::AudienceMetrics);
    }

    #[test]
    fn test_provider_message_uses_outer_context() {
        let err = anyhow!("connection reset").context("upstream unavailable");
        let failure = FetchFailure::from_provider(Domain::Summary, &err);
        assert_eq!(failure.message(), "upstream unavailable");
    }

    #[test]
    fn test_empty_provider_message_falls_back() {
        let err = anyhow!("");
        let failure = FetchFailure::from_provider(Domain::ChannelMetrics, &err);
        assert_eq!(failure.message(), "Failed to fetch channel data");
        assert_eq!(
            FetchFailure::fallback(Domain::Summary).message(),
            "Failed to fetch dashboard data"
        );
    }

    #[test]
    fn test_malformed_message_names_domain() {
        let failure = FetchFailure::Malformed {
            domain: Domain::ContentMetrics,
            source: PayloadError::NonFinite {
                field: "engagement".into(),
            },
        };
        assert_eq!(
            failure.message(),
            "invalid content payload: engagement is not a finite number"
        );
    }

    #[test]
    fn test_timeout_message() {
        let failure = FetchFailure::TimedOut {
            domain: Domain::TrendSeries,
            after: Duration::from_millis(1500),
        };
        assert_eq!(failure.message(), "trends request timed out after 1500ms");
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(
            AuthError::Rejected("session expired".into()).to_string(),
            "session expired"
        );
    }
}
