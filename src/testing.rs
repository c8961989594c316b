//! Test fixtures shared across modules.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::x509::{X509, X509NameBuilder};
use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::StatusCode;

use crate::crypto::{rsa, rsa::RsaPrivateKey, x509::Certificate};
use crate::error::TransportError;
use crate::soap;
use crate::soap::wsse::{SignedInfo, canonicalize, digest_hash, signature_hash, utils};
use crate::transport::{SoapRequest, SoapResponse, Transport};

/// A self-signed RSA certificate and its key
pub struct Fixture {
    pub certificate_pem: Vec<u8>,
    pub certificate_der: Vec<u8>,
    pub private_key_pem: Vec<u8>,
}

impl Fixture {
    pub fn generate() -> Self {
        let key = RsaPrivateKey::generate(2048).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "wsse-soap test").unwrap();
        let name = name.build();

        let mut serial = BigNum::new().unwrap();
        serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder
            .set_serial_number(&serial.to_asn1_integer().unwrap())
            .unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(key.pkey()).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(key.pkey(), MessageDigest::sha256()).unwrap();
        let certificate = builder.build();

        Self {
            certificate_pem: certificate.to_pem().unwrap(),
            certificate_der: certificate.to_der().unwrap(),
            private_key_pem: key.to_pem().unwrap(),
        }
    }

    /// One fixture per test binary; key generation is slow
    pub fn shared() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(Fixture::generate)
    }
}

/// Records every request and answers with a canned response
#[derive(Clone)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<SoapRequest>>>,
    response: SoapResponse,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn replying(status: StatusCode, body: &str) -> Self {
        Self {
            requests: Arc::default(),
            response: SoapResponse {
                status,
                body: body.as_bytes().to_vec(),
            },
            delay: None,
        }
    }

    pub fn ok(body: &str) -> Self {
        Self::replying(StatusCode::OK, body)
    }

    /// Waits before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<SoapRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("no request was sent");
        String::from_utf8(request.body.clone()).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: SoapRequest) -> Result<SoapResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}

/// Checks a signed document the way a receiving XML-DSig verifier would:
/// every reference digest, the signature over `SignedInfo`, and that the
/// key reference resolves to a token carrying `certificate_der`.
pub fn verify_signed_document(xml: &str, certificate_der: &[u8]) -> Result<(), String> {
    let signed_info = utils::extract_element(xml, "SignedInfo").map_err(|e| e.to_string())?;
    let template: SignedInfo = soap::from_str(&signed_info.xml).map_err(|e| e.to_string())?;

    for reference in &template.references {
        let id = reference
            .uri
            .strip_prefix('#')
            .ok_or("reference is not same-document")?;
        let element = utils::extract_element_by_id(xml, id).map_err(|e| e.to_string())?;
        let canonical =
            canonicalize(&element.xml, &element.namespaces).map_err(|e| e.to_string())?;
        let hash = digest_hash(&reference.digest_method.algorithm).map_err(|e| e.to_string())?;
        let digest = BASE64.encode(hash.hash(canonical.as_bytes()).map_err(|e| e.to_string())?);
        if digest != reference.digest_value {
            return Err(format!("digest mismatch for {}", reference.uri));
        }
    }

    let canonical = canonicalize(&signed_info.xml, &signed_info.namespaces)
        .map_err(|e| e.to_string())?;
    let signature_value = element_text(xml, "SignatureValue").ok_or("no SignatureValue")?;
    let signature = BASE64
        .decode(signature_value.trim())
        .map_err(|e| e.to_string())?;

    let public_key = Certificate::from_bytes(certificate_der)
        .and_then(|c| c.public_key())
        .map_err(|e| e.to_string())?;
    let hash =
        signature_hash(&template.signature_method.algorithm).map_err(|e| e.to_string())?;
    if !rsa::verify(&public_key, canonical.as_bytes(), &signature, hash).unwrap_or(false) {
        return Err("signature does not verify".into());
    }

    let key_reference =
        attribute_of(xml, "SecurityTokenReference", "Reference", "URI").ok_or("no key reference")?;
    let token_id = attribute_of(xml, "Security", "BinarySecurityToken", "wsu:Id")
        .ok_or("no token id")?;
    if key_reference != format!("#{token_id}") {
        return Err("key reference does not point at the token".into());
    }
    let token = element_text(xml, "BinarySecurityToken").ok_or("no token")?;
    if token != BASE64.encode(certificate_der) {
        return Err("token does not carry the certificate".into());
    }
    Ok(())
}

/// Text of the first element with the given local name
pub fn element_text(xml: &str, local_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut text = String::new();
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) if !inside && e.local_name().as_ref() == local_name.as_bytes() => {
                inside = true;
            }
            Event::Empty(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                return Some(String::new());
            }
            Event::Text(e) if inside => text.push_str(&e.unescape().ok()?),
            Event::End(_) if inside => return Some(text),
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// Attribute `key` of the first `child` element found directly inside `parent`
pub fn attribute_of(xml: &str, parent: &str, child: &str, key: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    loop {
        let event = reader.read_event().ok()?;
        let (start, empty) = match &event {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => return None,
            _ => continue,
        };
        let in_parent = stack.last().is_some_and(|name| name == parent.as_bytes());
        if in_parent && start.local_name().as_ref() == child.as_bytes() {
            return start
                .attributes()
                .filter_map(|a| a.ok())
                .find(|a| a.key.as_ref() == key.as_bytes())
                .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
        }
        if !empty {
            stack.push(start.local_name().as_ref().to_vec());
        }
    }
}
