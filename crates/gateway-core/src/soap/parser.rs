//! Inbound SOAP parsing.
//!
//! The reply body varies per backend service, so the whole document is
//! lowered into a generic JSON tree first and the fixed parts of the
//! schema are picked out of that tree. Parsing is total: any failure
//! collapses into a synthetic system-error envelope rather than an
//! `Err`, because by this point the backend call has already succeeded
//! at the transport level.

use super::{
    SoapError, BODY, COMMON_HEADER, DEFAULT_SYSTEM_ERROR_CODE, DEFAULT_SYSTEM_ERROR_SYSTEM,
    HEADER, RESPONSE_BASC, RESPONSE_CODE, RESPONSE_DTAL, RESPONSE_SYSTEM, RESPONSE_TITLE,
    RESPONSE_TYPE,
};
use crate::model::{ResponseEnvelope, ResponseType};
use quick_xml::{events::Event, Reader};
use serde_json::{Map, Value};

/// Lowers an XML document into a JSON tree.
///
/// The root element's children become the top-level object. Element
/// names are reduced to their local part, repeated siblings collapse
/// into an array, text-only elements become strings with surrounding
/// whitespace trimmed.
///
/// # Errors
///
/// Returns [`SoapError`] if the document is not well-formed XML.
pub fn xml_to_tree(xml: &str) -> Result<Value, SoapError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(_) => return read_children(&mut reader),
            Event::Empty(_) => return Ok(Value::Object(Map::new())),
            Event::Eof => {
                return Err(SoapError::Malformed("document has no root element".to_string()))
            }
            _ => {}
        }
    }
}

/// Reads children of the current element up to its end tag.
fn read_children(reader: &mut Reader<&[u8]>) -> Result<Value, SoapError> {
    let mut children: Map<String, Value> = Map::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                let value = read_children(reader)?;
                insert_child(&mut children, name, value);
            }
            Event::Empty(e) => {
                let name = local_name(e.local_name().as_ref());
                insert_child(&mut children, name, Value::String(String::new()));
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => text.push_str(&String::from_utf8_lossy(&t)),
            Event::End(_) => break,
            Event::Eof => {
                return Err(SoapError::Malformed("unexpected end of document".to_string()))
            }
            _ => {}
        }
    }

    if children.is_empty() {
        Ok(Value::String(text.trim().to_string()))
    } else {
        Ok(Value::Object(children))
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        None => {
            map.insert(name, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Interprets reply envelopes into the normalized response shape.
#[derive(Debug, Clone, Default)]
pub struct SoapResponseParser;

impl SoapResponseParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parses a raw reply document. Never fails: malformed documents
    /// become a synthetic system error carrying the parse failure as
    /// the title.
    ///
    /// An absent or unrecognized `responseType` is read as success.
    /// That default is load-bearing: several backend services omit the
    /// field entirely on their happy path, so it cannot be tightened
    /// without breaking them.
    #[must_use]
    pub fn parse(&self, raw: &str) -> ResponseEnvelope {
        match self.try_parse(raw) {
            Ok(envelope) => envelope,
            Err(err) => ResponseEnvelope::system_error(
                DEFAULT_SYSTEM_ERROR_CODE,
                err.to_string(),
                "",
                "",
                DEFAULT_SYSTEM_ERROR_SYSTEM,
            ),
        }
    }

    fn try_parse(&self, raw: &str) -> Result<ResponseEnvelope, SoapError> {
        let tree = xml_to_tree(raw)?;
        let common = tree
            .get(HEADER)
            .and_then(|h| h.get(COMMON_HEADER))
            .cloned()
            .unwrap_or(Value::Null);

        let response_type =
            ResponseType::from_code_or_default(field_str(&common, RESPONSE_TYPE));

        match response_type {
            ResponseType::I => {
                // The payload is the whole Body subtree, whatever the
                // backend named its root element.
                let data = tree.get(BODY).cloned().unwrap_or(Value::Null);
                Ok(ResponseEnvelope::success(data))
            }
            ResponseType::E => Ok(ResponseEnvelope::business_error(
                field_str(&common, RESPONSE_CODE),
                field_str(&common, RESPONSE_TITLE),
                field_str(&common, RESPONSE_BASC),
                field_str(&common, RESPONSE_DTAL),
                field_str(&common, RESPONSE_SYSTEM),
            )),
            ResponseType::S => Ok(ResponseEnvelope::system_error(
                field_str(&common, RESPONSE_CODE),
                field_str(&common, RESPONSE_TITLE),
                field_str(&common, RESPONSE_BASC),
                field_str(&common, RESPONSE_DTAL),
                field_str(&common, RESPONSE_SYSTEM),
            )),
        }
    }
}

fn field_str<'a>(node: &'a Value, key: &str) -> &'a str {
    node.get(key).and_then(Value::as_str).unwrap_or_default()
}
