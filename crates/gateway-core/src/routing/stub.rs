//! Performance-stub routing override.

use super::{EndpointStrategy, RoutingError};
use crate::model::ServiceRequestInfo;
use crate::soap::header::inbound;
use axum::http::HeaderMap;

/// Routes traffic to the stub backend when the inbound company code
/// starts with `B`. Runs ahead of the domain strategies so load-test
/// traffic never reaches a real backend.
pub struct StubEndpointStrategy {
    endpoint: String,
}

impl StubEndpointStrategy {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

impl EndpointStrategy for StubEndpointStrategy {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn priority(&self) -> u8 {
        1
    }

    // The override applies to any domain; the company-code header is
    // the decline condition.
    fn supports(&self, _app_name: &str) -> bool {
        true
    }

    fn resolve(
        &self,
        _info: &ServiceRequestInfo,
        headers: &HeaderMap,
    ) -> Result<Option<String>, RoutingError> {
        let cmpn_cd = headers
            .get(inbound::CMPN_CD)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if cmpn_cd.starts_with('B') {
            Ok(Some(self.endpoint.clone()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn info() -> ServiceRequestInfo {
        ServiceRequestInfo {
            app_name: "ORD1".to_string(),
            svc_name: "order".to_string(),
            fn_name: "create".to_string(),
            oder_id: String::new(),
            options: HashMap::new(),
        }
    }

    #[test]
    fn company_code_b_prefix_selects_stub() {
        let strategy = StubEndpointStrategy::new("http://stub");
        let mut headers = HeaderMap::new();
        headers.insert(inbound::CMPN_CD, "B123".parse().unwrap());
        assert_eq!(strategy.resolve(&info(), &headers).unwrap(), Some("http://stub".to_string()));
    }

    #[test]
    fn other_company_codes_decline() {
        let strategy = StubEndpointStrategy::new("http://stub");
        let mut headers = HeaderMap::new();
        headers.insert(inbound::CMPN_CD, "A123".parse().unwrap());
        assert_eq!(strategy.resolve(&info(), &headers).unwrap(), None);
        assert_eq!(strategy.resolve(&info(), &HeaderMap::new()).unwrap(), None);
    }
}
