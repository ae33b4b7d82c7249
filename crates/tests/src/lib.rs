//! Integration tests for the SOAP translation gateway.
//!
//! This crate contains:
//!
//! - `mock_backend`: reusable mockito-based SOAP backend builders
//! - `pipeline_scenarios`: end-to-end pipeline tests against mock
//!   backends, covering routing, business-error passthrough, retry
//!   exhaustion, and circuit breaking
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No external services are required; every backend is a mockito server
//! started by the test itself.

pub mod mock_backend;

#[cfg(test)]
mod pipeline_scenarios;
