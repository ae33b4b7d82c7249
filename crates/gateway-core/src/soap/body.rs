//! Body serialization: merged request payload to XML.
//!
//! The outbound body is `service_request` containing a small business
//! header followed by the request's opaque JSON payload converted field
//! by field into XML. Arrays repeat the element name per item, matching
//! the legacy converter's behavior.

use super::{SoapError, BIZ_HEADER, SERVICE_REQUEST};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde_json::Value;

/// Per-call header embedded at the head of the body.
#[derive(Debug, Clone, Default)]
pub struct BizHeader {
    pub order_id: String,
    pub cb_svc_name: String,
    pub cb_fn_name: String,
}

/// Serializes the business header plus payload under `service_request`.
///
/// # Errors
///
/// Returns [`SoapError::Body`] if `data` is neither an object nor null,
/// or [`SoapError::Xml`] on a write failure.
pub fn service_request_xml(biz: &BizHeader, data: &Value) -> Result<String, SoapError> {
    let fields = match data {
        Value::Object(map) => Some(map),
        Value::Null => None,
        other => {
            return Err(SoapError::Body(format!(
                "request data must be a JSON object, got {}",
                json_kind(other)
            )))
        }
    };

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new(SERVICE_REQUEST)))?;

    writer.write_event(Event::Start(BytesStart::new(BIZ_HEADER)))?;
    write_text_element(&mut writer, "orderId", &biz.order_id)?;
    write_text_element(&mut writer, "cbSvcName", &biz.cb_svc_name)?;
    write_text_element(&mut writer, "cbFnName", &biz.cb_fn_name)?;
    writer.write_event(Event::End(BytesEnd::new(BIZ_HEADER)))?;

    if let Some(fields) = fields {
        for (name, value) in fields {
            write_json_field(&mut writer, name, value)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(SERVICE_REQUEST)))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Serializes a reply payload as the `soapenv:Body` content for XML
/// emission. The payload is the backend's whole body subtree, so its
/// top-level keys become the body's child elements directly.
///
/// # Errors
///
/// Returns [`SoapError`] on a write failure.
pub fn response_body_xml(data: &Value) -> Result<String, SoapError> {
    let mut writer = Writer::new(Vec::new());
    match data {
        Value::Object(fields) => {
            for (name, value) in fields {
                write_json_field(&mut writer, name, value)?;
            }
        }
        Value::Null => {}
        other => {
            writer.write_event(Event::Text(BytesText::new(&scalar_text(other))))?;
        }
    }
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Writes one JSON field as XML: objects nest, arrays repeat the element
/// name per item, scalars become text content, null becomes an empty
/// element.
pub(crate) fn write_json_field(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), SoapError> {
    match value {
        Value::Null => {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
        }
        Value::Array(items) => {
            for item in items {
                write_json_field(writer, name, item)?;
            }
        }
        Value::Object(fields) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for (child_name, child) in fields {
                write_json_field(writer, child_name, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        scalar => write_text_element(writer, name, &scalar_text(scalar))?,
    }
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), SoapError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
