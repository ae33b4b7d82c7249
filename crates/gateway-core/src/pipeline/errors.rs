//! Gateway-level error taxonomy and its single HTTP mapping.
//!
//! Every failure class is mapped to a transport status exactly once,
//! here. SOAP-level business and system errors are not errors at this
//! layer; they travel back as HTTP 200 envelopes.

use crate::{
    backend::BackendError, metrics::RequestOutcome, routing::RoutingError, soap::SoapError,
};
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request failed the inbound contract: bad JSON, missing fields.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The translation routes only speak JSON and XML.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// No strategy produced a backend route.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// The request could not be rendered into the wire format.
    #[error("conversion failed: {0}")]
    Conversion(#[from] SoapError),

    /// The backend call failed at the transport level.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The overall per-request deadline elapsed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// Anything unexpected. The message is logged, never sent.
    #[error("internal error")]
    Internal(String),
}

impl GatewayError {
    /// Transport status for this failure.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Routing(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Backend(_) | Self::DeadlineExceeded => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind for the error body and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnsupportedContentType(_) => "unsupported_media_type",
            Self::Routing(_) => "routing_error",
            Self::Conversion(_) => "conversion_error",
            Self::Backend(BackendError::CircuitOpen { .. }) => "circuit_open",
            Self::Backend(BackendError::Timeout) | Self::DeadlineExceeded => "gateway_timeout",
            Self::Backend(_) => "backend_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Label value recorded for this failure.
    #[must_use]
    pub fn outcome(&self) -> RequestOutcome {
        match self {
            Self::Validation(_) | Self::UnsupportedContentType(_) => {
                RequestOutcome::ValidationError
            }
            Self::Routing(_) => RequestOutcome::RoutingError,
            Self::Conversion(_) => RequestOutcome::ConversionError,
            Self::Backend(BackendError::CircuitOpen { .. }) => RequestOutcome::CircuitOpen,
            Self::Backend(BackendError::Timeout) | Self::DeadlineExceeded => {
                RequestOutcome::Timeout
            }
            Self::Backend(_) => RequestOutcome::BackendError,
            Self::Internal(_) => RequestOutcome::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(GatewayError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            GatewayError::UnsupportedContentType("image/png".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            GatewayError::Routing(RoutingError::NoRoute { app_name: "X".into() }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Conversion(SoapError::Body("bad".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(GatewayError::Backend(BackendError::Timeout).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            GatewayError::Backend(BackendError::CircuitOpen { route: "r".into() }).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(GatewayError::DeadlineExceeded.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            GatewayError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn circuit_open_has_a_distinct_kind() {
        let err = GatewayError::Backend(BackendError::CircuitOpen { route: "r".into() });
        assert_eq!(err.kind(), "circuit_open");
        assert_eq!(err.outcome(), RequestOutcome::CircuitOpen);
    }

    #[test]
    fn internal_message_is_not_displayed() {
        let err = GatewayError::Internal("secret details".to_string());
        assert_eq!(err.to_string(), "internal error");
    }
}
