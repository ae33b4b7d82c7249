//! Request and response envelope types shared across the pipeline.
//!
//! Field names mirror the legacy wire contract exactly, including the
//! historical `oderId` spelling, so that existing channel clients keep
//! working without translation shims.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Identifies which backend function an inbound request targets.
///
/// Decoded from the `svcRequestInfoDTO` object of the JSON request body.
/// `options` carries optional lock/token fields that end up in the SOAP
/// common header; it is never `null` after deserialization, only empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequestInfo {
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub svc_name: String,
    #[serde(default)]
    pub fn_name: String,
    /// Order identifier; the misspelling is part of the wire contract.
    #[serde(rename = "oderId", default)]
    pub oder_id: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl ServiceRequestInfo {
    /// Returns the option value for `key`, or an empty string when absent.
    #[must_use]
    pub fn option(&self, key: &str) -> &str {
        self.options.get(key).map_or("", String::as_str)
    }
}

/// The parsed inbound request: routing descriptor plus opaque payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "svcRequestInfoDTO")]
    pub svc_request_info: Option<ServiceRequestInfo>,
    #[serde(default)]
    pub data: Value,
}

/// SOAP-level outcome classification carried in `responseType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Success.
    I,
    /// Business error: a valid, already-delivered application outcome.
    E,
    /// System error on the backend or in the gateway's parsing path.
    S,
}

impl ResponseType {
    /// Maps a wire code to a response type.
    ///
    /// An empty or absent code defaults to success. This is preserved from
    /// the legacy contract and is a known risk: a truncated backend
    /// response that loses its header is silently treated as success.
    #[must_use]
    pub fn from_code_or_default(code: &str) -> Self {
        match code {
            "E" => Self::E,
            "S" => Self::S,
            _ => Self::I,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I => "I",
            Self::E => "E",
            Self::S => "S",
        }
    }
}

/// Normalized outcome returned to the caller.
///
/// The five descriptive fields are empty on success; `data` is present
/// if and only if the response type is [`ResponseType::I`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub response_type: ResponseType,
    pub response_code: String,
    pub response_title: String,
    pub response_basc: String,
    pub response_dtal: String,
    pub response_system: String,
    pub data: Option<Value>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            response_type: ResponseType::I,
            response_code: String::new(),
            response_title: String::new(),
            response_basc: String::new(),
            response_dtal: String::new(),
            response_system: String::new(),
            data: Some(data),
        }
    }

    #[must_use]
    pub fn business_error(
        code: impl Into<String>,
        title: impl Into<String>,
        basc: impl Into<String>,
        dtal: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::E,
            response_code: code.into(),
            response_title: title.into(),
            response_basc: basc.into(),
            response_dtal: dtal.into(),
            response_system: system.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn system_error(
        code: impl Into<String>,
        title: impl Into<String>,
        basc: impl Into<String>,
        dtal: impl Into<String>,
        system: impl Into<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::S,
            response_code: code.into(),
            response_title: title.into(),
            response_basc: basc.into(),
            response_dtal: dtal.into(),
            response_system: system.into(),
            data: None,
        }
    }

    /// True when the envelope carries a success outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::I
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_decodes_wire_shape() {
        let body = json!({
            "svcRequestInfoDTO": {
                "appName": "ORD1",
                "svcName": "order",
                "fnName": "create",
                "oderId": "ORD-42",
                "options": { "tokenId": "tk-1" }
            },
            "data": { "itemCd": "A100" }
        });

        let req: RequestEnvelope = serde_json::from_value(body).unwrap();
        let info = req.svc_request_info.unwrap();
        assert_eq!(info.app_name, "ORD1");
        assert_eq!(info.oder_id, "ORD-42");
        assert_eq!(info.option("tokenId"), "tk-1");
        assert_eq!(info.option("lockId"), "");
        assert_eq!(req.data["itemCd"], "A100");
    }

    #[test]
    fn options_defaults_to_empty_map() {
        let body = json!({
            "svcRequestInfoDTO": { "appName": "CRM", "svcName": "s", "fnName": "f", "oderId": "" },
            "data": {}
        });
        let req: RequestEnvelope = serde_json::from_value(body).unwrap();
        assert!(req.svc_request_info.unwrap().options.is_empty());
    }

    #[test]
    fn response_type_defaults_to_success() {
        assert_eq!(ResponseType::from_code_or_default(""), ResponseType::I);
        assert_eq!(ResponseType::from_code_or_default("I"), ResponseType::I);
        assert_eq!(ResponseType::from_code_or_default("E"), ResponseType::E);
        assert_eq!(ResponseType::from_code_or_default("S"), ResponseType::S);
    }

    #[test]
    fn success_envelope_carries_data_and_empty_fields() {
        let env = ResponseEnvelope::success(json!({"ok": true}));
        assert!(env.is_success());
        assert_eq!(env.response_code, "");
        assert!(env.data.is_some());

        let err = ResponseEnvelope::business_error("ORD-E001", "t", "b", "d", "ORD");
        assert_eq!(err.response_type, ResponseType::E);
        assert!(err.data.is_none());
    }

    #[test]
    fn response_envelope_serializes_wire_field_names() {
        let env = ResponseEnvelope::business_error("ORD-E001", "title", "basc", "dtal", "ORD");
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["responseType"], "E");
        assert_eq!(v["responseCode"], "ORD-E001");
        assert_eq!(v["responseBasc"], "basc");
        assert_eq!(v["responseDtal"], "dtal");
        assert_eq!(v["data"], Value::Null);
    }
}
