//! JSON to SOAP conversion facade.

use super::{
    body::{self, BizHeader},
    header::HeaderBuilder,
    parser::SoapResponseParser,
    template::SoapTemplateEngine,
    SoapError,
};
use crate::model::{ResponseEnvelope, ServiceRequestInfo};
use axum::http::HeaderMap;
use serde_json::Value;

/// Converts between the JSON request shape and the SOAP wire format.
///
/// Owns the header builder and template engine; cheap to clone behind an
/// `Arc` at the pipeline level.
#[derive(Debug)]
pub struct SoapConverter {
    header_builder: HeaderBuilder,
    template: SoapTemplateEngine,
    parser: SoapResponseParser,
}

impl SoapConverter {
    #[must_use]
    pub fn new(node_ip: impl Into<String>) -> Self {
        Self {
            header_builder: HeaderBuilder::new(node_ip),
            template: SoapTemplateEngine::new(),
            parser: SoapResponseParser::new(),
        }
    }

    /// Builds the full outbound envelope from a request descriptor,
    /// inbound headers, and the opaque payload.
    ///
    /// # Errors
    ///
    /// Returns [`SoapError`] if the payload cannot be serialized or
    /// both render paths fail.
    pub fn to_soap(
        &self,
        info: &ServiceRequestInfo,
        headers: &HeaderMap,
        data: &Value,
    ) -> Result<String, SoapError> {
        let common = self.header_builder.build(info, headers);
        let biz = BizHeader {
            order_id: info.oder_id.clone(),
            cb_svc_name: info.svc_name.clone(),
            cb_fn_name: info.fn_name.clone(),
        };
        let body_xml = body::service_request_xml(&biz, data)?;
        self.template.render(&common, &body_xml)
    }

    /// Interprets a raw reply document. Total; see
    /// [`SoapResponseParser::parse`].
    #[must_use]
    pub fn from_soap(&self, raw: &str) -> ResponseEnvelope {
        self.parser.parse(raw)
    }
}
