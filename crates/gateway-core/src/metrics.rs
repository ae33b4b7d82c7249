//! Prometheus metrics for the translation pipeline.
//!
//! All recorders are lock-free counter/histogram updates. Route URLs
//! are interned so the hot path does not allocate label strings per
//! request; the intern pool is a bounded leak, one entry per configured
//! backend endpoint.

use crate::backend::BreakerState;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{borrow::Cow, sync::OnceLock};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

static ROUTE_POOL: OnceLock<dashmap::DashMap<String, &'static str>> = OnceLock::new();

#[inline]
fn route_to_static(route: &str) -> Cow<'static, str> {
    let pool = ROUTE_POOL.get_or_init(dashmap::DashMap::new);

    if let Some(interned) = pool.get(route) {
        return Cow::Borrowed(*interned);
    }

    let owned = route.to_string();
    let leaked: &'static str = Box::leak(owned.clone().into_boxed_str());
    pool.insert(owned, leaked);
    Cow::Borrowed(leaked)
}

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "failed to install Prometheus recorder, using detached fallback");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Outcome kinds of one gateway request, as exposed in labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    BusinessError,
    SystemError,
    ValidationError,
    RoutingError,
    ConversionError,
    BackendError,
    CircuitOpen,
    Timeout,
    Internal,
}

impl RequestOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::BusinessError => "business_error",
            Self::SystemError => "system_error",
            Self::ValidationError => "validation_error",
            Self::RoutingError => "routing_error",
            Self::ConversionError => "conversion_error",
            Self::BackendError => "backend_error",
            Self::CircuitOpen => "circuit_open",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }
}

pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    /// Renders the Prometheus exposition text.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }

    /// Records a request entering the pipeline, before any stage runs.
    pub fn record_request_started(&self) {
        counter!("gateway_requests_started_total").increment(1);
    }

    /// Records one JSON/XML conversion stage.
    ///
    /// `direction` is `"to_soap"` for outbound envelope building or
    /// `"from_soap"` for reply parsing.
    pub fn record_conversion(&self, direction: &'static str, duration_ms: u64) {
        #[allow(clippy::cast_precision_loss)]
        histogram!("gateway_conversion_duration_seconds", "direction" => direction)
            .record(duration_ms as f64 / 1000.0);
    }

    /// Records one completed gateway request.
    pub fn record_request(&self, route: &str, outcome: RequestOutcome, latency_ms: u64) {
        let route = route_to_static(route);
        counter!("gateway_requests_total", "route" => route.clone(), "outcome" => outcome.as_str())
            .increment(1);
        #[allow(clippy::cast_precision_loss)]
        histogram!("gateway_request_duration_seconds", "route" => route)
            .record(latency_ms as f64 / 1000.0);
    }

    /// Records one backend HTTP call attempt.
    pub fn record_backend_call(&self, route: &str, success: bool, latency_ms: u64) {
        let route = route_to_static(route);
        #[allow(clippy::cast_precision_loss)]
        histogram!("gateway_backend_duration_seconds", "route" => route.clone())
            .record(latency_ms as f64 / 1000.0);
        if success {
            counter!("gateway_backend_success_total", "route" => route).increment(1);
        } else {
            counter!("gateway_backend_error_total", "route" => route).increment(1);
        }
    }

    /// Records a retry of a transient backend failure.
    pub fn record_retry(&self, route: &str, attempt: u32) {
        let route = route_to_static(route);
        counter!("gateway_backend_retries_total", "route" => route, "attempt" => attempt.to_string())
            .increment(1);
    }

    /// Records a circuit state change as a gauge per route.
    pub fn record_breaker_state(&self, route: &str, state: BreakerState) {
        let value = match state {
            BreakerState::Closed => 0.0,
            BreakerState::HalfOpen => 0.5,
            BreakerState::Open => 1.0,
        };
        let route = route_to_static(route);
        gauge!("gateway_circuit_state", "route" => route).set(value);
    }

    /// Records a request rejected because the outbound pool was full.
    pub fn record_pool_exhausted(&self, route: &str) {
        let route = route_to_static(route);
        counter!("gateway_pool_exhausted_total", "route" => route).increment(1);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn interning_is_stable() {
        let a = route_to_static("http://host/esb");
        let b = route_to_static("http://host/esb");
        assert_eq!(a, b);
    }

    #[test]
    #[serial]
    fn recorders_do_not_panic() {
        let collector = MetricsCollector::new();
        collector.record_request_started();
        collector.record_request("http://host/esb", RequestOutcome::Success, 12);
        collector.record_backend_call("http://host/esb", false, 80);
        collector.record_retry("http://host/esb", 2);
        collector.record_breaker_state("http://host/esb", BreakerState::Open);
        collector.record_pool_exhausted("http://host/esb");
        collector.record_conversion("to_soap", 3);
        let _ = collector.render();
    }

    #[test]
    #[serial]
    fn lifecycle_events_appear_in_exposition() {
        let collector = MetricsCollector::new();
        collector.record_request_started();
        collector.record_conversion("from_soap", 2);
        let rendered = collector.render();
        assert!(rendered.contains("gateway_requests_started_total"));
        assert!(rendered.contains("gateway_conversion_duration_seconds"));
    }
}
