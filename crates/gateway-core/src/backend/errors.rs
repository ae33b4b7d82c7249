//! Backend call failures.

use thiserror::Error;

/// Failures of a single backend invocation, or of the resilience layers
/// wrapped around it.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Per-call response deadline elapsed.
    #[error("backend call timed out")]
    Timeout,

    /// TCP/TLS level failure before a response arrived.
    #[error("backend connection failed: {0}")]
    ConnectionFailed(String),

    /// The backend answered outside 2xx. The body is truncated for
    /// logging; it is not parsed.
    #[error("backend returned HTTP {status}")]
    HttpStatus { status: u16, body: String },

    /// No outbound slot became available within the acquire deadline.
    #[error("outbound connection pool exhausted")]
    PoolExhausted,

    /// The response body exceeded the in-memory bound.
    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The circuit for this route is open; the call was never made.
    #[error("circuit open for {route}")]
    CircuitOpen { route: String },

    /// The response bytes were not valid UTF-8.
    #[error("backend response was not valid utf-8")]
    InvalidEncoding,
}

impl BackendError {
    /// Whether a retry against the same route could plausibly succeed.
    ///
    /// HTTP-200 business errors never reach this type, so they are
    /// structurally unretryable. Pool exhaustion and an open circuit
    /// are local backpressure signals; retrying would amplify them.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::PoolExhausted
            | Self::BodyTooLarge { .. }
            | Self::CircuitOpen { .. }
            | Self::InvalidEncoding => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::ConnectionFailed(err.to_string())
        }
    }
}
