//! Structured envelope marshalling.
//!
//! Event-by-event rendering used as the fallback path when template
//! rendering fails, and for reply envelopes on the XML emit path. Slower
//! than the template renderer but structurally equivalent by
//! construction.

use super::{
    body, template::FIELDS, SoapError, COMMON_HEADER, RESPONSE_BASC, RESPONSE_CODE, RESPONSE_DTAL,
    RESPONSE_SYSTEM, RESPONSE_TITLE, RESPONSE_TYPE, SOAP_ENV_NAMESPACE,
};
use crate::model::ResponseEnvelope;
use crate::soap::header::CommonHeader;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

const ENVELOPE_TAG: &str = "soapenv:Envelope";
const HEADER_TAG: &str = "soapenv:Header";
const BODY_TAG: &str = "soapenv:Body";

/// Renders a full request envelope around an already-serialized body.
///
/// `body_xml` must be well-formed XML; it is injected verbatim.
///
/// # Errors
///
/// Returns [`SoapError`] on a write failure.
pub fn envelope_to_xml(header: &CommonHeader, body_xml: &str) -> Result<String, SoapError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new(ENVELOPE_TAG);
    envelope.push_attribute(("xmlns:soapenv", SOAP_ENV_NAMESPACE));
    writer.write_event(Event::Start(envelope))?;

    writer.write_event(Event::Start(BytesStart::new(HEADER_TAG)))?;
    writer.write_event(Event::Start(BytesStart::new(COMMON_HEADER)))?;
    for (name, accessor) in &FIELDS {
        write_text_element(&mut writer, name, accessor(header))?;
    }
    writer.write_event(Event::End(BytesEnd::new(COMMON_HEADER)))?;
    writer.write_event(Event::End(BytesEnd::new(HEADER_TAG)))?;

    writer.write_event(Event::Start(BytesStart::new(BODY_TAG)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(body_xml)))?;
    writer.write_event(Event::End(BytesEnd::new(BODY_TAG)))?;

    writer.write_event(Event::End(BytesEnd::new(ENVELOPE_TAG)))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Renders a reply envelope for XML-speaking callers.
///
/// The common header carries the response disposition fields; the body
/// holds the payload subtree as-is, empty when there is none.
///
/// # Errors
///
/// Returns [`SoapError`] on a write failure.
pub fn response_to_xml(env: &ResponseEnvelope) -> Result<String, SoapError> {
    let body_xml =
        body::response_body_xml(env.data.as_ref().unwrap_or(&serde_json::Value::Null))?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new(ENVELOPE_TAG);
    envelope.push_attribute(("xmlns:soapenv", SOAP_ENV_NAMESPACE));
    writer.write_event(Event::Start(envelope))?;

    writer.write_event(Event::Start(BytesStart::new(HEADER_TAG)))?;
    writer.write_event(Event::Start(BytesStart::new(COMMON_HEADER)))?;
    write_text_element(&mut writer, RESPONSE_TYPE, env.response_type.as_str())?;
    write_text_element(&mut writer, RESPONSE_CODE, &env.response_code)?;
    write_text_element(&mut writer, RESPONSE_TITLE, &env.response_title)?;
    write_text_element(&mut writer, RESPONSE_BASC, &env.response_basc)?;
    write_text_element(&mut writer, RESPONSE_DTAL, &env.response_dtal)?;
    write_text_element(&mut writer, RESPONSE_SYSTEM, &env.response_system)?;
    writer.write_event(Event::End(BytesEnd::new(COMMON_HEADER)))?;
    writer.write_event(Event::End(BytesEnd::new(HEADER_TAG)))?;

    writer.write_event(Event::Start(BytesStart::new(BODY_TAG)))?;
    writer.write_event(Event::Text(BytesText::from_escaped(body_xml.as_str())))?;
    writer.write_event(Event::End(BytesEnd::new(BODY_TAG)))?;

    writer.write_event(Event::End(BytesEnd::new(ENVELOPE_TAG)))?;
    Ok(String::from_utf8(writer.into_inner())?)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResponseEnvelope;
    use serde_json::json;

    fn header() -> CommonHeader {
        CommonHeader {
            app_name: "ORD1".to_string(),
            svc_name: "order".to_string(),
            fn_name: "create".to_string(),
            chnl_type: "KN".to_string(),
            ..CommonHeader::default()
        }
    }

    #[test]
    fn envelope_carries_all_twenty_fields_in_order() {
        let xml = envelope_to_xml(&header(), "<service_request/>").unwrap();
        let mut last = 0;
        for (name, _) in &FIELDS {
            let open = format!("<{name}>");
            let close_or_empty = xml
                .find(&open)
                .or_else(|| xml.find(&format!("<{name}/>")));
            let pos = close_or_empty.unwrap_or_else(|| panic!("missing field {name}"));
            assert!(pos > last, "field {name} out of order");
            last = pos;
        }
        assert!(xml.contains("<service_request/>"));
        assert!(xml.contains("xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\""));
    }

    #[test]
    fn header_values_are_escaped() {
        let mut h = header();
        h.svc_name = "a<b&c".to_string();
        let xml = envelope_to_xml(&h, "<service_request/>").unwrap();
        assert!(xml.contains("a&lt;b&amp;c"));
    }

    #[test]
    fn body_is_injected_verbatim() {
        let xml =
            envelope_to_xml(&header(), "<service_request><x>1</x></service_request>").unwrap();
        assert!(xml.contains("<service_request><x>1</x></service_request>"));
    }

    #[test]
    fn response_envelope_renders_disposition_and_payload() {
        let env = ResponseEnvelope::success(json!({"service_response": {"ok": "y"}}));
        let xml = response_to_xml(&env).unwrap();
        assert!(xml.contains("<responseType>I</responseType>"));
        assert!(xml.contains("<service_response><ok>y</ok></service_response>"));
    }

    #[test]
    fn response_envelope_renders_error_fields() {
        let env = ResponseEnvelope::business_error(
            "ORD-E001",
            "invalid order",
            "order rejected",
            "quantity out of range",
            "ORD",
        );
        let xml = response_to_xml(&env).unwrap();
        assert!(xml.contains("<responseType>E</responseType>"));
        assert!(xml.contains("<responseCode>ORD-E001</responseCode>"));
        assert!(xml.contains("<responseSystem>ORD</responseSystem>"));
        assert!(xml.contains("<soapenv:Body></soapenv:Body>"));
    }
}
