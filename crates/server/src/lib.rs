//! HTTP server for the SOAP translation gateway.

pub mod middleware;
pub mod router;
