//! SOAP envelope construction and parsing.
//!
//! The wire format is a single fixed envelope schema spoken by every
//! backend domain: `Envelope > Header > commonHeader` with twenty named
//! fields in a documented order, and `Envelope > Body > service_request`
//! carrying a small business header plus the request payload rendered as
//! XML. The outbound path is template-driven ([`template`]) with a
//! marshalling fallback ([`marshal`]); the inbound path parses into a
//! generic tree ([`parser`]) because the `Body` shape varies per backend
//! and is passed through opaquely.

pub mod body;
pub mod convert;
pub mod header;
pub mod marshal;
pub mod parser;
pub mod template;

pub use convert::SoapConverter;
pub use header::{CommonHeader, HeaderBuilder};
pub use parser::SoapResponseParser;
pub use template::SoapTemplateEngine;

use thiserror::Error;

/// Failures in SOAP rendering, body serialization, or response parsing.
#[derive(Debug, Error)]
pub enum SoapError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template render failed: {0}")]
    Template(String),

    #[error("body serialization failed: {0}")]
    Body(String),

    #[error("malformed soap response: {0}")]
    Malformed(String),

    #[error("invalid utf-8 in rendered envelope")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// SOAP namespace of the outer envelope.
pub const SOAP_ENV_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Element names of the fixed schema.
pub const ENVELOPE: &str = "Envelope";
pub const HEADER: &str = "Header";
pub const BODY: &str = "Body";
pub const COMMON_HEADER: &str = "commonHeader";
pub const BIZ_HEADER: &str = "bizHeader";
pub const SERVICE_REQUEST: &str = "service_request";

/// Response fields of the inbound common header.
pub const RESPONSE_TYPE: &str = "responseType";
pub const RESPONSE_CODE: &str = "responseCode";
pub const RESPONSE_TITLE: &str = "responseTitle";
pub const RESPONSE_BASC: &str = "responseBasc";
pub const RESPONSE_DTAL: &str = "responseDtal";
pub const RESPONSE_SYSTEM: &str = "responseSystem";

/// Fallback error identity used when response parsing itself fails.
pub const DEFAULT_SYSTEM_ERROR_CODE: &str = "KOL_SYS_ERR";
pub const DEFAULT_SYSTEM_ERROR_SYSTEM: &str = "KOL";
