//! Order-domain routing.

use super::{EndpointStrategy, RoutingError};
use crate::model::ServiceRequestInfo;
use axum::http::HeaderMap;

/// Function name that addresses a domain's direct application path.
pub(crate) const DIRECT_FN_NAME: &str = "service";

/// Routes order-domain application names. The literal function name
/// `service` goes straight to the domain application (PO); everything
/// else goes through the enterprise service bus.
pub struct OrdEndpointStrategy {
    domain_group: Vec<String>,
    po_endpoint: String,
    esb_endpoint: String,
}

impl OrdEndpointStrategy {
    #[must_use]
    pub fn new(
        domain_group: Vec<String>,
        po_endpoint: impl Into<String>,
        esb_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            domain_group,
            po_endpoint: po_endpoint.into(),
            esb_endpoint: esb_endpoint.into(),
        }
    }
}

impl EndpointStrategy for OrdEndpointStrategy {
    fn name(&self) -> &'static str {
        "ord"
    }

    fn priority(&self) -> u8 {
        3
    }

    fn supports(&self, app_name: &str) -> bool {
        self.domain_group.iter().any(|app| app == app_name)
    }

    fn resolve(
        &self,
        info: &ServiceRequestInfo,
        _headers: &HeaderMap,
    ) -> Result<Option<String>, RoutingError> {
        if !self.supports(&info.app_name) {
            return Ok(None);
        }
        let endpoint = if info.fn_name == DIRECT_FN_NAME {
            &self.po_endpoint
        } else {
            &self.esb_endpoint
        };
        Ok(Some(endpoint.clone()))
    }
}
