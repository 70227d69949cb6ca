//! Payment provider errors.

use thiserror::Error;

/// Errors returned by payment provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its deadline.
    #[error("Provider call timed out")]
    Timeout,

    /// Provider answered with a failure.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status returned.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// Provider answered with a body we could not interpret.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Client is misconfigured (bad base URL, missing key).
    #[error("Provider configuration error: {0}")]
    Configuration(String),
}

impl ProviderError {
    /// True when the call may have taken effect on the provider side.
    ///
    /// A timeout or transport error after the request left leaves the
    /// outcome unknown, and so does a 5xx from the provider or a gateway in
    /// front of it. A 4xx rejection does not.
    #[must_use]
    pub const fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::Network(_)
                | Self::MalformedResponse(_)
                | Self::Api { status: 500.., .. }
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if err.is_builder() {
            Self::Configuration(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
