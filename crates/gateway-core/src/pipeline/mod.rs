//! The request pipeline: validate, resolve, convert, invoke, interpret,
//! emit.
//!
//! `handle` is total. Whatever goes wrong inside, the caller gets a
//! well-formed response; the one thing that never propagates out of
//! this module is a panic-shaped 500 from the transport layer.
//! CPU-bound XML conversion runs on the blocking pool so it cannot
//! stall the reactor under load.

pub mod errors;

pub use errors::GatewayError;

use crate::{
    backend::RouteCaller,
    config::AppConfig,
    metrics::{MetricsCollector, RequestOutcome},
    model::{RequestEnvelope, ResponseEnvelope, ResponseType, ServiceRequestInfo},
    routing::{
        CrmEndpointStrategy, EndpointStrategy, EndpointStrategyResolver, OrdEndpointStrategy,
        Route, StubEndpointStrategy,
    },
    soap::{header::inbound, marshal, SoapConverter},
};
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use chrono::Local;
use reqwest::header::HeaderName;
use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_XML: &str = "text/xml";

/// Emitted verbatim when the reply envelope itself cannot be serialized.
const FALLBACK_JSON_BODY: &str = r#"{"responseType":"S","responseCode":"KOL_SYS_ERR","responseTitle":"response serialization failed","responseBasc":"","responseDtal":"","responseSystem":"KOL","data":null}"#;
const FALLBACK_XML_BODY: &str = "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\"><soapenv:Header><commonHeader><responseType>S</responseType><responseCode>KOL_SYS_ERR</responseCode><responseTitle>response serialization failed</responseTitle><responseBasc></responseBasc><responseDtal></responseDtal><responseSystem>KOL</responseSystem></commonHeader></soapenv:Header><soapenv:Body></soapenv:Body></soapenv:Envelope>";

/// What the caller asked the reply to look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyFormat {
    Json,
    Xml,
}

impl ReplyFormat {
    fn content_type(self) -> &'static str {
        match self {
            Self::Json => CONTENT_TYPE_JSON,
            Self::Xml => CONTENT_TYPE_XML,
        }
    }
}

/// Final response handed to the transport layer.
#[derive(Debug)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// The translation pipeline shared by all gateway routes.
pub struct RequestPipeline {
    converter: Arc<SoapConverter>,
    resolver: EndpointStrategyResolver,
    caller: RouteCaller,
    metrics: Arc<MetricsCollector>,
    request_timeout: Duration,
}

impl RequestPipeline {
    /// Wires the pipeline from configuration.
    ///
    /// # Errors
    ///
    /// Returns the client builder error if the outbound HTTP pool
    /// cannot be constructed.
    pub fn new(config: &AppConfig, metrics: Arc<MetricsCollector>) -> Result<Self, reqwest::Error> {
        let endpoints = &config.endpoints;
        let strategies: Vec<Box<dyn EndpointStrategy>> = vec![
            Box::new(StubEndpointStrategy::new(endpoints.stub.clone())),
            Box::new(OrdEndpointStrategy::new(
                endpoints.ord_domain_group.clone(),
                endpoints.ord_po.clone(),
                endpoints.ord_esb.clone(),
            )),
            Box::new(CrmEndpointStrategy::new(
                endpoints.crm_domain_group.clone(),
                endpoints.crm_po.clone(),
                endpoints.crm_esb.clone(),
            )),
        ];

        Ok(Self {
            converter: Arc::new(SoapConverter::new(config.gateway.node_ip.clone())),
            resolver: EndpointStrategyResolver::new(strategies),
            caller: RouteCaller::new(
                &config.client,
                &config.retry,
                &config.breaker,
                Arc::clone(&metrics),
            )?,
            metrics,
            request_timeout: config.gateway.request_timeout(),
        })
    }

    /// Runs one request through every stage. Total; never returns a
    /// transport-level error.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> GatewayResponse {
        let started = Instant::now();
        self.metrics.record_request_started();

        let reply = match reply_format(headers) {
            Ok(reply) => reply,
            Err(err) => {
                self.metrics.record_request("unresolved", err.outcome(), elapsed_ms(started));
                return error_response(&err);
            }
        };

        match self.process(headers, body).await {
            Ok((route, envelope)) => {
                let outcome = match envelope.response_type {
                    ResponseType::I => RequestOutcome::Success,
                    ResponseType::E => RequestOutcome::BusinessError,
                    ResponseType::S => RequestOutcome::SystemError,
                };
                self.metrics.record_request(&route.url, outcome, elapsed_ms(started));
                emit(&envelope, reply)
            }
            Err((route, err)) => {
                let route_label = route.as_deref().unwrap_or("unresolved");
                tracing::error!(
                    route = route_label,
                    error = %err,
                    kind = err.kind(),
                    "request failed"
                );
                self.metrics.record_request(route_label, err.outcome(), elapsed_ms(started));
                error_response(&err)
            }
        }
    }

    /// Stages validate through convert-in. The route URL travels with
    /// failures so metrics can attribute them.
    async fn process(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<(Route, ResponseEnvelope), (Option<String>, GatewayError)> {
        let (info, data) = validate(body).map_err(|e| (None, e))?;

        let route = self
            .resolver
            .resolve(&info, headers)
            .map_err(|e| (None, GatewayError::from(e)))?;
        let url = route.url.clone();
        let fail = |e: GatewayError| (Some(url.clone()), e);

        let extra_headers = stub_headers(&route, headers);

        let converter = Arc::clone(&self.converter);
        let headers_for_convert = headers.clone();
        let convert_started = Instant::now();
        let converted = tokio::task::spawn_blocking(move || {
            converter.to_soap(&info, &headers_for_convert, &data)
        })
        .await;
        self.metrics.record_conversion("to_soap", elapsed_ms(convert_started));
        let envelope = converted
            .map_err(|e| fail(GatewayError::Internal(format!("conversion task failed: {e}"))))?
            .map_err(|e| fail(GatewayError::Conversion(e)))?;

        let raw = tokio::time::timeout(
            self.request_timeout,
            self.caller.call(&route, envelope, &extra_headers),
        )
        .await
        .map_err(|_| fail(GatewayError::DeadlineExceeded))?
        .map_err(|e| fail(GatewayError::Backend(e)))?;

        let converter = Arc::clone(&self.converter);
        let parse_started = Instant::now();
        let parsed = tokio::task::spawn_blocking(move || converter.from_soap(&raw)).await;
        self.metrics.record_conversion("from_soap", elapsed_ms(parse_started));
        let response = parsed
            .map_err(|e| fail(GatewayError::Internal(format!("parse task failed: {e}"))))?;

        Ok((route, response))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Validates the inbound JSON shape and the required routing fields.
fn validate(body: &[u8]) -> Result<(ServiceRequestInfo, serde_json::Value), GatewayError> {
    let envelope: RequestEnvelope = serde_json::from_slice(body)
        .map_err(|e| GatewayError::Validation(format!("malformed request body: {e}")))?;

    let info = envelope
        .svc_request_info
        .ok_or_else(|| GatewayError::Validation("svcRequestInfoDTO is required".to_string()))?;

    for (field, value) in [
        ("appName", &info.app_name),
        ("svcName", &info.svc_name),
        ("fnName", &info.fn_name),
    ] {
        if value.trim().is_empty() {
            return Err(GatewayError::Validation(format!("{field} must not be empty")));
        }
    }

    Ok((info, envelope.data))
}

/// Negotiates the reply format from the request content type. The body
/// is the JSON request shape either way; `text/xml` callers get the
/// SOAP-shaped rendition of the reply. A missing content type is read
/// as JSON.
fn reply_format(headers: &HeaderMap) -> Result<ReplyFormat, GatewayError> {
    let Some(raw) = headers.get(CONTENT_TYPE) else {
        return Ok(ReplyFormat::Json);
    };
    let value = raw
        .to_str()
        .map_err(|_| GatewayError::UnsupportedContentType("non-ascii".to_string()))?;
    let media_type = value.split(';').next().unwrap_or_default().trim();

    if media_type.eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
        Ok(ReplyFormat::Json)
    } else if media_type.eq_ignore_ascii_case(CONTENT_TYPE_XML) {
        Ok(ReplyFormat::Xml)
    } else {
        Err(GatewayError::UnsupportedContentType(media_type.to_string()))
    }
}

/// Stub traffic carries the company-code header through so the stub can
/// segment load-test populations.
fn stub_headers(route: &Route, headers: &HeaderMap) -> Vec<(HeaderName, String)> {
    if route.strategy != "stub" {
        return Vec::new();
    }
    headers
        .get(inbound::CMPN_CD)
        .and_then(|v| v.to_str().ok())
        .map(|v| vec![(HeaderName::from_static("kol-cmpn-cd"), v.to_string())])
        .unwrap_or_default()
}

/// Stage 6: render the envelope in the caller's format. Serialization
/// failure falls back to a fixed minimal body rather than an error.
fn emit(envelope: &ResponseEnvelope, reply: ReplyFormat) -> GatewayResponse {
    let body = match reply {
        ReplyFormat::Json => serde_json::to_vec(envelope).unwrap_or_else(|e| {
            tracing::error!(error = %e, "response serialization failed, using fallback body");
            FALLBACK_JSON_BODY.as_bytes().to_vec()
        }),
        ReplyFormat::Xml => match marshal::response_to_xml(envelope) {
            Ok(xml) => xml.into_bytes(),
            Err(e) => {
                tracing::error!(error = %e, "response serialization failed, using fallback body");
                FALLBACK_XML_BODY.as_bytes().to_vec()
            }
        },
    };
    GatewayResponse {
        status: StatusCode::OK,
        content_type: reply.content_type(),
        body,
    }
}

/// Gateway-level failures are always JSON, whatever the caller sent.
fn error_response(err: &GatewayError) -> GatewayResponse {
    let payload = json!({
        "error": err.kind(),
        "message": err.to_string(),
        "timestamp": Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    });
    let body = serde_json::to_vec(&payload)
        .unwrap_or_else(|_| FALLBACK_JSON_BODY.as_bytes().to_vec());
    GatewayResponse { status: err.status(), content_type: CONTENT_TYPE_JSON, body }
}
