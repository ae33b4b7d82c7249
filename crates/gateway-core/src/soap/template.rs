//! Precompiled SOAP envelope templating.
//!
//! The envelope shape never changes at runtime, so the template is
//! compiled once into an alternating sequence of literal text and field
//! slots and rendered by walking that sequence into a preallocated
//! string. This avoids per-request object traversal and re-parsing of
//! the template text; the measured win over the marshalling path in the
//! predecessor system was roughly 60%.

use super::{header::CommonHeader, marshal, SoapError};
use dashmap::DashMap;
use quick_xml::escape::escape;
use std::sync::Arc;

/// The 20 common-header fields in wire order, paired with their accessors.
///
/// This order is part of the downstream contract; do not reorder.
pub(crate) const FIELDS: [(&str, fn(&CommonHeader) -> &str); 20] = [
    ("appName", |h| &h.app_name),
    ("svcName", |h| &h.svc_name),
    ("fnName", |h| &h.fn_name),
    ("globalNo", |h| &h.global_no),
    ("chnlType", |h| &h.chnl_type),
    ("trFlag", |h| &h.tr_flag),
    ("trDate", |h| &h.tr_date),
    ("trTime", |h| &h.tr_time),
    ("clntIp", |h| &h.clnt_ip),
    ("userId", |h| &h.user_id),
    ("realUserId", |h| &h.real_user_id),
    ("orgId", |h| &h.org_id),
    ("srcId", |h| &h.src_id),
    ("cmpnCd", |h| &h.cmpn_cd),
    ("lgDateTime", |h| &h.lg_date_time),
    ("lockType", |h| &h.lock_type),
    ("lockId", |h| &h.lock_id),
    ("lockTimeSt", |h| &h.lock_time_st),
    ("tokenId", |h| &h.token_id),
    ("businessKey", |h| &h.business_key),
];

const ENVELOPE_OPEN: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\n\
    <soapenv:Header>\n\
        <commonHeader>\n";

const HEADER_CLOSE_BODY_OPEN: &str = "        </commonHeader>\n\
    </soapenv:Header>\n\
    <soapenv:Body>\n\
        ";

const BODY_CLOSE: &str = "\n    </soapenv:Body>\n</soapenv:Envelope>";

/// One piece of a compiled template: literal text, a header-field slot,
/// or the body slot.
#[derive(Debug, Clone)]
enum Segment {
    Literal(&'static str),
    Owned(String),
    Field(usize),
    Body,
}

/// A compiled envelope template: literals interleaved with slots.
#[derive(Debug)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    fn compile() -> Self {
        let mut segments = Vec::with_capacity(FIELDS.len() * 3 + 4);
        segments.push(Segment::Literal(ENVELOPE_OPEN));
        for (idx, (name, _)) in FIELDS.iter().enumerate() {
            segments.push(Segment::Owned(format!("            <{name}>")));
            segments.push(Segment::Field(idx));
            segments.push(Segment::Owned(format!("</{name}>\n")));
        }
        segments.push(Segment::Literal(HEADER_CLOSE_BODY_OPEN));
        segments.push(Segment::Body);
        segments.push(Segment::Literal(BODY_CLOSE));
        Self { segments }
    }

    fn render(&self, header: &CommonHeader, body_xml: &str) -> Result<String, SoapError> {
        let mut out = String::with_capacity(1024 + body_xml.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Owned(text) => out.push_str(text),
                Segment::Field(idx) => {
                    let accessor = FIELDS
                        .get(*idx)
                        .map(|(_, accessor)| accessor)
                        .ok_or_else(|| SoapError::Template(format!("bad field slot {idx}")))?;
                    out.push_str(&escape(accessor(header)));
                }
                Segment::Body => out.push_str(body_xml),
            }
        }
        Ok(out)
    }
}

const DEFAULT_TEMPLATE_KEY: &str = "soap-envelope";

/// Renders common header + body XML into the full envelope string.
///
/// The compiled template is cached for the process lifetime; the cache
/// is populated lazily and only emptied by an explicit administrative
/// [`clear_cache`](Self::clear_cache). If the template path fails, the
/// engine falls back to the structured marshaller in [`marshal`], which
/// produces a structurally equivalent envelope.
#[derive(Debug)]
pub struct SoapTemplateEngine {
    cache: DashMap<&'static str, Arc<CompiledTemplate>>,
}

impl Default for SoapTemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SoapTemplateEngine {
    #[must_use]
    pub fn new() -> Self {
        Self { cache: DashMap::new() }
    }

    /// Renders via the template path, falling back to the marshaller.
    ///
    /// # Errors
    ///
    /// Returns [`SoapError`] only when both paths fail.
    pub fn render(&self, header: &CommonHeader, body_xml: &str) -> Result<String, SoapError> {
        let started = std::time::Instant::now();
        match self.render_template(header, body_xml) {
            Ok(envelope) => {
                record_render("template", started.elapsed());
                Ok(envelope)
            }
            Err(err) => {
                tracing::warn!(error = %err, "template render failed, using marshal fallback");
                let envelope = marshal::envelope_to_xml(header, body_xml)?;
                record_render("marshal", started.elapsed());
                Ok(envelope)
            }
        }
    }

    /// The primary templated path, exposed for equivalence testing.
    ///
    /// # Errors
    ///
    /// Returns [`SoapError::Template`] if the compiled template is
    /// internally inconsistent.
    pub fn render_template(
        &self,
        header: &CommonHeader,
        body_xml: &str,
    ) -> Result<String, SoapError> {
        let template = self
            .cache
            .entry(DEFAULT_TEMPLATE_KEY)
            .or_insert_with(|| Arc::new(CompiledTemplate::compile()))
            .clone();
        template.render(header, body_xml)
    }

    /// Number of compiled templates currently cached.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Administrative cache clear; never invoked during normal operation.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("soap template cache cleared");
    }
}

fn record_render(path: &'static str, elapsed: std::time::Duration) {
    metrics::counter!("gateway_envelope_renders_total", "path" => path).increment(1);
    metrics::histogram!("gateway_envelope_render_seconds", "path" => path)
        .record(elapsed.as_secs_f64());
}
