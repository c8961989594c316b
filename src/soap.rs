mod config;
mod de;
mod ser;
pub mod wsse;

pub use config::XmlConfig;
pub use de::{check_well_formed, from_str};
pub use ser::{to_string, to_string_with_content};

use serde::Serialize;

use crate::id::{Identifier, Role};
use crate::soap::wsse::Security;

pub mod ns {
    pub const SOAP_ENV: &str = "http://schemas.xmlsoap.org/soap/envelope/";
}

pub mod prefix {
    pub const SOAP_ENV: &str = "soapenv";
}

/// A SOAP 1.1 envelope around a caller payload.
///
/// The header is only serialized when a security block was attached.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    header: Option<Header>,
    body: Body<T>,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with a freshly identified body and no header
    pub fn new(payload: T) -> Self {
        Self {
            header: None,
            body: Body {
                id: Identifier::next(Role::Body),
                content: payload,
            },
        }
    }

    /// Set the envelope header
    pub fn with_header(mut self, header: Header) -> Self {
        self.header = Some(header);
        self
    }

    /// Identifier shared by the body's `wsu:Id` and `xml:id` attributes
    pub fn body_id(&self) -> &Identifier {
        &self.body.id
    }

    /// Returns the payload carried in the body
    pub fn payload(&self) -> &T {
        &self.body.content
    }

    /// Returns the header of the envelope
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub(crate) fn header_mut(&mut self) -> &mut Header {
        self.header.get_or_insert_with(Header::default)
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serialize this envelope into a SOAP string with optional pretty printing.
    ///
    /// The payload is encoded under its own root name and written as the only
    /// child of `soapenv:Body`.
    pub fn serialize_soap(&self, pretty: bool) -> Result<String, quick_xml::SeError> {
        let mut payload = String::new();
        quick_xml::se::to_writer(&mut payload, &self.body.content)?;

        let config = XmlConfig::new()
            .pretty(pretty)
            .namespace(prefix::SOAP_ENV, ns::SOAP_ENV);
        to_string_with_content(&config, &self.frame(), BODY_TAG, &payload)
    }

    fn frame(&self) -> Frame<'_> {
        Frame {
            header: self.header.as_ref(),
            body: BodyFrame {
                wsu: wsse::ns::WSU,
                wsu_id: &self.body.id,
                xml_id: &self.body.id,
            },
        }
    }
}

const BODY_TAG: &str = "soapenv:Body";

/// Represents a SOAP header
#[derive(Debug, Clone, Default, Serialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "wsse:Security")]
    pub security: Option<Security>,
}

/// Represents a SOAP body carrying an opaque payload
#[derive(Debug, Clone)]
pub struct Body<T> {
    id: Identifier,
    content: T,
}

/// Envelope markup around the payload
#[derive(Serialize)]
#[serde(rename = "soapenv:Envelope")]
struct Frame<'a> {
    #[serde(rename = "soapenv:Header", skip_serializing_if = "Option::is_none")]
    header: Option<&'a Header>,
    #[serde(rename = "soapenv:Body")]
    body: BodyFrame<'a>,
}

#[derive(Serialize)]
struct BodyFrame<'a> {
    #[serde(rename = "@xmlns:wsu")]
    wsu: &'static str,
    #[serde(rename = "@wsu:Id")]
    wsu_id: &'a Identifier,
    #[serde(rename = "@xml:id")]
    xml_id: &'a Identifier,
}
