//! SOAP Mock Builder for backend testing.
//!
//! Wraps mockito to provide SOAP-envelope response builders for the
//! backend shapes the gateway talks to.

use mockito::{Mock, Server, ServerGuard};

/// Builder for mock SOAP backends.
pub struct SoapMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl SoapMockBuilder {
    /// Creates a builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Base URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks a success reply on `path` whose `service_response` holds
    /// `data_xml`.
    pub async fn mock_success(&mut self, path: &str, data_xml: &str) -> &mut Self {
        let body = success_envelope(data_xml);
        let mock = self
            .server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Mocks a success reply whose `soapenv:Body` holds `body_xml` as-is,
    /// for backends that do not use the `service_response` root.
    pub async fn mock_success_raw_body(&mut self, path: &str, body_xml: &str) -> &mut Self {
        let body = success_envelope_raw_body(body_xml);
        let mock = self
            .server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Mocks a success reply that also asserts an inbound header.
    pub async fn mock_success_expecting_header(
        &mut self,
        path: &str,
        header: (&str, &str),
        data_xml: &str,
    ) -> &mut Self {
        let body = success_envelope(data_xml);
        let mock = self
            .server
            .mock("POST", path)
            .match_header(header.0, header.1)
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Mocks a business-error reply on `path`.
    pub async fn mock_business_error(
        &mut self,
        path: &str,
        code: &str,
        title: &str,
    ) -> &mut Self {
        let body = error_envelope("E", code, title, "basc", "dtal", "ORD");
        let mock = self
            .server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(body)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Mocks an HTTP-level failure with an expected hit count.
    pub async fn mock_failure(&mut self, path: &str, status: usize, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", path)
            .with_status(status)
            .with_body("backend unavailable")
            .expect(hits)
            .create_async()
            .await;
        self.mocks.push(mock);
        self
    }

    /// Asserts every registered mock was satisfied.
    pub async fn assert_all(&self) {
        for mock in &self.mocks {
            mock.assert_async().await;
        }
    }
}

/// A full success envelope with `data_xml` under `service_response`.
#[must_use]
pub fn success_envelope(data_xml: &str) -> String {
    success_envelope_raw_body(&format!("<service_response>{data_xml}</service_response>"))
}

/// A full success envelope with `body_xml` directly under the body.
#[must_use]
pub fn success_envelope_raw_body(body_xml: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Header><commonHeader><responseType>I</responseType></commonHeader></soapenv:Header>\
         <soapenv:Body>{body_xml}</soapenv:Body>\
         </soapenv:Envelope>"
    )
}

/// A full error envelope with all five disposition fields.
#[must_use]
pub fn error_envelope(
    response_type: &str,
    code: &str,
    title: &str,
    basc: &str,
    dtal: &str,
    system: &str,
) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <soapenv:Header><commonHeader>\
         <responseType>{response_type}</responseType>\
         <responseCode>{code}</responseCode>\
         <responseTitle>{title}</responseTitle>\
         <responseBasc>{basc}</responseBasc>\
         <responseDtal>{dtal}</responseDtal>\
         <responseSystem>{system}</responseSystem>\
         </commonHeader></soapenv:Header>\
         <soapenv:Body/></soapenv:Envelope>"
    )
}
