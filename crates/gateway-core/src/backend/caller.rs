//! Resilient backend calling: breaker, retry, and invocation composed.

use super::{
    breaker::CircuitBreaker, errors::BackendError, invoker::BackendInvoker, retry::RetryPolicy,
};
use crate::{
    config::{BreakerConfig, ClientConfig, RetryConfig},
    metrics::MetricsCollector,
    routing::Route,
};
use dashmap::DashMap;
use reqwest::header::HeaderName;
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Instant,
};

/// Calls backend routes through a per-route circuit breaker and a
/// shared retry policy.
///
/// Breakers are created lazily on first use of a route, so only routes
/// that actually see traffic carry breaker state. Each retry attempt
/// passes through the breaker individually; in half-open that makes
/// every attempt a trial call.
pub struct RouteCaller {
    invoker: BackendInvoker,
    retry: RetryPolicy,
    breaker_config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    metrics: Arc<MetricsCollector>,
}

impl RouteCaller {
    /// # Errors
    ///
    /// Returns the client builder error if the HTTP pool cannot be
    /// constructed.
    pub fn new(
        client: &ClientConfig,
        retry: &RetryConfig,
        breaker: &BreakerConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            invoker: BackendInvoker::new(client)?,
            retry: RetryPolicy::new(retry),
            breaker_config: breaker.clone(),
            breakers: DashMap::new(),
            metrics,
        })
    }

    fn breaker_for(&self, url: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(&self.breaker_config)))
            .clone()
    }

    /// Sends the envelope to the resolved route and returns the raw
    /// reply document.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CircuitOpen`] without touching the
    /// network when the route's circuit rejects the call, or the final
    /// attempt's error once retries are exhausted.
    pub async fn call(
        &self,
        route: &Route,
        envelope: String,
        extra_headers: &[(HeaderName, String)],
    ) -> Result<String, BackendError> {
        let breaker = self.breaker_for(&route.url);
        let attempts = AtomicU32::new(0);

        let result = self
            .retry
            .run(&route.url, || {
                let breaker = Arc::clone(&breaker);
                let envelope = envelope.clone();
                let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                async move {
                    if !breaker.try_acquire() {
                        self.metrics.record_breaker_state(&route.url, breaker.state());
                        return Err(BackendError::CircuitOpen { route: route.url.clone() });
                    }
                    if attempt > 1 {
                        self.metrics.record_retry(&route.url, attempt);
                    }

                    let started = Instant::now();
                    let outcome =
                        self.invoker.invoke(&route.url, envelope, extra_headers).await;
                    let elapsed = started.elapsed();

                    let counts_against_breaker =
                        !matches!(outcome, Err(BackendError::PoolExhausted));
                    if counts_against_breaker {
                        breaker.record(outcome.is_ok(), elapsed);
                    }
                    self.metrics.record_backend_call(
                        &route.url,
                        outcome.is_ok(),
                        elapsed.as_millis() as u64,
                    );
                    self.metrics.record_breaker_state(&route.url, breaker.state());
                    outcome
                }
            })
            .await;

        if matches!(result, Err(BackendError::PoolExhausted)) {
            self.metrics.record_pool_exhausted(&route.url);
        }
        result
    }

    /// Breaker state for a route, if one has been created.
    #[must_use]
    pub fn breaker_state(&self, url: &str) -> Option<super::BreakerState> {
        self.breakers.get(url).map(|b| b.state())
    }
}
