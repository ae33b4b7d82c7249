//! # Gateway Core
//!
//! Core library for the SOAP translation gateway: a JSON front door for
//! legacy SOAP backends.
//!
//! This crate provides the foundational components for:
//!
//! - **[`model`]**: The inbound JSON request shape and the normalized
//!   response envelope returned to callers.
//!
//! - **[`soap`]**: Envelope construction (templated with a marshalling
//!   fallback) and total response parsing.
//!
//! - **[`routing`]**: Priority-ordered endpoint strategies mapping a
//!   request descriptor to a backend URL.
//!
//! - **[`backend`]**: Bounded HTTP invocation with per-route circuit
//!   breakers and transient-failure retry.
//!
//! - **[`pipeline`]**: The six-stage request pipeline and the single
//!   place where failures become HTTP responses.
//!
//! - **[`metrics`]**: Prometheus metrics collection.
//!
//! - **[`config`]**: Layered file/environment configuration.
//!
//! ## Request Flow
//!
//! ```text
//! Client JSON Request
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Validation │ ─── Invalid ──► 400 / 415
//! └──────┬──────┘
//!        │ Valid
//!        ▼
//! ┌──────────────────┐
//! │ EndpointResolver │ ─── No route ──► 400
//! │ (stub/ord/crm)   │
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ JSON → SOAP     │ ─── Fails ──► 422
//! │ (blocking pool) │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  RouteCaller    │ ─── Open circuit / exhausted retries ──► 502
//! │ breaker + retry │
//! └────────┬────────┘
//!          │ 2xx
//!          ▼
//! ┌─────────────────┐
//! │ SOAP → Envelope │  (total: parse failure becomes a system error)
//! └────────┬────────┘
//!          │
//!          ▼
//!   200 with ResponseEnvelope (JSON, or SOAP-XML for text/xml callers)
//! ```

pub mod backend;
pub mod config;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod routing;
pub mod soap;
