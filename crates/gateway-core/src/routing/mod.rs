//! Endpoint resolution.
//!
//! Strategies are consulted in ascending priority order; the first one
//! to return a route wins. A strategy can decline (`Ok(None)`) without
//! stopping the chain, and a strategy failure is logged and skipped so
//! one misbehaving rule cannot take down routing for everyone else.

pub mod crm;
pub mod ord;
pub mod stub;

pub use crm::CrmEndpointStrategy;
pub use ord::OrdEndpointStrategy;
pub use stub::StubEndpointStrategy;

use crate::model::ServiceRequestInfo;
use axum::http::HeaderMap;
use thiserror::Error;

/// Routing failures surfaced to the pipeline.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no endpoint strategy matched appName {app_name:?}")]
    NoRoute { app_name: String },

    #[error("endpoint strategy {strategy} failed: {reason}")]
    Strategy {
        strategy: &'static str,
        reason: String,
    },
}

/// A resolved backend target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Absolute URL of the backend endpoint.
    pub url: String,
    /// Name of the strategy that produced the route, for logs and
    /// per-route metrics.
    pub strategy: &'static str,
}

/// One routing rule.
///
/// `resolve` must be deterministic for a given request; the resolver
/// relies on that when retrying a call against the same route.
pub trait EndpointStrategy: Send + Sync {
    /// Stable name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Chain position; lower runs first.
    fn priority(&self) -> u8;

    /// Whether this rule applies to the application name at all.
    ///
    /// Distinct from declining: a strategy may support an appName yet
    /// still return `Ok(None)` from [`resolve`](Self::resolve) to defer
    /// to a more specific rule.
    fn supports(&self, app_name: &str) -> bool;

    /// Returns the route for this request, `Ok(None)` to decline.
    fn resolve(
        &self,
        info: &ServiceRequestInfo,
        headers: &HeaderMap,
    ) -> Result<Option<String>, RoutingError>;
}

/// Ordered strategy chain.
pub struct EndpointStrategyResolver {
    strategies: Vec<Box<dyn EndpointStrategy>>,
}

impl EndpointStrategyResolver {
    /// Builds the resolver, sorting strategies by priority once.
    #[must_use]
    pub fn new(mut strategies: Vec<Box<dyn EndpointStrategy>>) -> Self {
        strategies.sort_by_key(|s| s.priority());
        Self { strategies }
    }

    /// Resolves the backend route for a request.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::NoRoute`] when every strategy declines
    /// or fails.
    pub fn resolve(
        &self,
        info: &ServiceRequestInfo,
        headers: &HeaderMap,
    ) -> Result<Route, RoutingError> {
        for strategy in &self.strategies {
            if !strategy.supports(&info.app_name) {
                continue;
            }
            match strategy.resolve(info, headers) {
                Ok(Some(url)) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        url = %url,
                        app_name = %info.app_name,
                        "route resolved"
                    );
                    return Ok(Route { url, strategy: strategy.name() });
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %err,
                        "endpoint strategy failed, skipping"
                    );
                }
            }
        }
        Err(RoutingError::NoRoute { app_name: info.app_name.clone() })
    }
}
