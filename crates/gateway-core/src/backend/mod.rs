//! Backend invocation and resilience.
//!
//! [`BackendInvoker`] owns the HTTP pool and per-call bounds,
//! [`CircuitBreaker`] guards a single route, [`RetryPolicy`] retries
//! transient failures, and [`RouteCaller`] composes the three.

pub mod breaker;
pub mod caller;
pub mod errors;
pub mod invoker;
pub mod retry;

pub use breaker::{BreakerState, CircuitBreaker};
pub use caller::RouteCaller;
pub use errors::BackendError;
pub use invoker::BackendInvoker;
pub use retry::RetryPolicy;
