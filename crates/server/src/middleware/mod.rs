//! Server middleware.

pub mod correlation_id;

pub use correlation_id::{create_request_id_layers, UuidRequestIdGenerator, X_REQUEST_ID};
