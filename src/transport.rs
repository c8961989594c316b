use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::TransportError;

/// Content type of every SOAP 1.1 request
pub const SOAP_CONTENT_TYPE: &str = r#"text/xml; charset="utf-8""#;

/// Name of the SOAP 1.1 action header
pub const SOAP_ACTION: &str = "SOAPAction";

/// A fully prepared SOAP POST
#[derive(Debug, Clone)]
pub struct SoapRequest {
    pub url: Url,
    pub soap_action: HeaderValue,
    pub body: Vec<u8>,
}

impl SoapRequest {
    /// Fails when the action cannot be carried in an HTTP header
    pub fn new(url: Url, soap_action: &str, body: Vec<u8>) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            url,
            soap_action: HeaderValue::from_str(soap_action)?,
            body,
        })
    }
}

/// Status and raw body of the server's answer
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Delivers a request and yields the response, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: SoapRequest) -> Result<SoapResponse, TransportError>;
}

/// Transport over a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a transport whose requests time out after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: SoapRequest) -> Result<SoapResponse, TransportError> {
        debug!(url = %request.url, bytes = request.body.len(), "POST SOAP request");

        let response = self
            .client
            .post(request.url)
            .header(CONTENT_TYPE, HeaderValue::from_static(SOAP_CONTENT_TYPE))
            .header(SOAP_ACTION, request.soap_action)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?.to_vec();
        debug!(%status, bytes = body.len(), "received SOAP response");

        Ok(SoapResponse { status, body })
    }
}
