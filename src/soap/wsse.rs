mod c14n;
mod error;
mod signer;
pub(crate) mod utils;

pub use c14n::{Namespaces, canonicalize};
pub use error::SigningError;
pub use signer::{Signer, XmlDsigSigner};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::crypto::{HashAlg, x509::Certificate};
use crate::id::{Identifier, Role};
use crate::soap::Envelope;

pub type Result<T> = std::result::Result<T, SigningError>;

// Algorithm URIs
pub mod algorithms {
    // Digest algorithms
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

    // Signature algorithms
    pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

    // Canonicalization and transform algorithms
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
}

// Namespaces
pub mod ns {
    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
}

// BinarySecurityToken attribute values
pub mod token {
    pub const BASE64_BINARY: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
    pub const X509V3: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";
}

/// Signature and digest methods written into the signature template.
///
/// Canonicalization and the reference transform are always exclusive c14n.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureSuite {
    /// RSA-SHA1 signature over a SHA-1 digest
    #[default]
    RsaSha1,
    /// RSA-SHA256 signature over a SHA-256 digest
    RsaSha256,
}

impl SignatureSuite {
    pub fn signature_method(&self) -> &'static str {
        match self {
            SignatureSuite::RsaSha1 => algorithms::RSA_SHA1,
            SignatureSuite::RsaSha256 => algorithms::RSA_SHA256,
        }
    }

    pub fn digest_method(&self) -> &'static str {
        match self {
            SignatureSuite::RsaSha1 => algorithms::SHA1,
            SignatureSuite::RsaSha256 => algorithms::SHA256,
        }
    }

    pub fn canonicalization_method(&self) -> &'static str {
        algorithms::EXCLUSIVE_C14N
    }
}

/// Hash behind a `DigestMethod` algorithm URI
pub(crate) fn digest_hash(uri: &str) -> Result<HashAlg> {
    match uri {
        algorithms::SHA1 => Ok(HashAlg::Sha1),
        algorithms::SHA256 => Ok(HashAlg::Sha256),
        alg => Err(SigningError::UnsupportedAlgorithm(alg.to_string())),
    }
}

/// Hash behind a `SignatureMethod` algorithm URI
pub(crate) fn signature_hash(uri: &str) -> Result<HashAlg> {
    match uri {
        algorithms::RSA_SHA1 => Ok(HashAlg::Sha1),
        algorithms::RSA_SHA256 => Ok(HashAlg::Sha256),
        alg => Err(SigningError::UnsupportedAlgorithm(alg.to_string())),
    }
}

/// Base64 DER of an X.509 certificate, the content of an X509v3 BinarySecurityToken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X509Token(String);

impl X509Token {
    /// Build the token from a PEM or DER encoded certificate
    pub fn from_certificate(
        certificate: impl AsRef<[u8]>,
    ) -> std::result::Result<Self, crate::crypto::Error> {
        let der = Certificate::from_bytes(certificate)?.to_der()?;
        Ok(Self(BASE64.encode(der)))
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

/// Adds a WS-Security header whose signature template references `body_id`.
///
/// `body_id` must be the id of `envelope`'s own body; a foreign id yields a
/// well-formed document whose signature does not cover the body.
pub fn attach_security<T>(
    envelope: &mut Envelope<T>,
    token: &X509Token,
    body_id: &Identifier,
    suite: SignatureSuite,
) {
    envelope.header_mut().security = Some(Security::new(token, body_id, suite));
}

/// The `wsse:Security` header block
#[derive(Debug, Clone, Serialize)]
pub struct Security {
    #[serde(rename = "@xmlns:wsse")]
    xmlns_wsse: &'static str,

    #[serde(rename = "@xmlns:wsu")]
    xmlns_wsu: &'static str,

    #[serde(rename = "wsse:BinarySecurityToken")]
    pub binary_security_token: BinarySecurityToken,

    #[serde(rename = "ds:Signature")]
    pub signature: Signature,
}

impl Security {
    /// Builds the token and a signature template for a single body reference
    pub fn new(token: &X509Token, body_id: &Identifier, suite: SignatureSuite) -> Self {
        let token_id = Identifier::next(Role::SecurityToken);
        let signature_id = Identifier::next(Role::Signature);

        let body_ref = Reference {
            uri: body_id.reference(),
            transforms: Some(Transforms {
                transform: vec![Transform {
                    algorithm: suite.canonicalization_method().into(),
                }],
            }),
            digest_method: DigestMethod {
                algorithm: suite.digest_method().into(),
            },
            digest_value: String::new(),
        };

        let signed_info = SignedInfo {
            canon_method: CanonicalizationMethod {
                algorithm: suite.canonicalization_method().into(),
            },
            signature_method: SignatureMethod {
                algorithm: suite.signature_method().into(),
            },
            references: vec![body_ref],
        };

        let key_info = KeyInfo {
            security_token_ref: SecurityTokenReference {
                reference: TokenReference {
                    uri: token_id.reference(),
                    value_type: token::X509V3.into(),
                },
            },
        };

        Self {
            xmlns_wsse: ns::WSSE,
            xmlns_wsu: ns::WSU,
            binary_security_token: BinarySecurityToken {
                id: token_id,
                encoding_type: token::BASE64_BINARY.into(),
                value_type: token::X509V3.into(),
                value: token.as_base64().to_string(),
            },
            signature: Signature {
                xmlns_ds: ns::DS,
                id: signature_id,
                signed_info,
                signature_value: String::new(),
                key_info,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BinarySecurityToken {
    #[serde(rename = "@wsu:Id")]
    pub id: Identifier,

    #[serde(rename = "@EncodingType")]
    pub encoding_type: String,

    #[serde(rename = "@ValueType")]
    pub value_type: String,

    #[serde(rename = "$text")]
    pub value: String,
}

/// Signature template; digest and signature values stay empty until signed
#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    #[serde(rename = "@xmlns:ds")]
    xmlns_ds: &'static str,

    #[serde(rename = "@Id")]
    pub id: Identifier,

    #[serde(rename = "ds:SignedInfo")]
    pub signed_info: SignedInfo,

    #[serde(rename = "ds:SignatureValue")]
    pub signature_value: String,

    #[serde(rename = "ds:KeyInfo")]
    pub key_info: KeyInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInfo {
    #[serde(rename(
        serialize = "ds:CanonicalizationMethod",
        deserialize = "CanonicalizationMethod"
    ))]
    pub canon_method: CanonicalizationMethod,

    #[serde(rename(serialize = "ds:SignatureMethod", deserialize = "SignatureMethod"))]
    pub signature_method: SignatureMethod,

    #[serde(rename(serialize = "ds:Reference", deserialize = "Reference"), default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalizationMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@URI")]
    pub uri: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[serde(rename(serialize = "ds:Transforms", deserialize = "Transforms"))]
    pub transforms: Option<Transforms>,

    #[serde(rename(serialize = "ds:DigestMethod", deserialize = "DigestMethod"))]
    pub digest_method: DigestMethod,

    #[serde(rename(serialize = "ds:DigestValue", deserialize = "DigestValue"), default)]
    pub digest_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transforms {
    #[serde(rename(serialize = "ds:Transform", deserialize = "Transform"), default)]
    pub transform: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    #[serde(rename = "wsse:SecurityTokenReference")]
    pub security_token_ref: SecurityTokenReference,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityTokenReference {
    #[serde(rename = "wsse:Reference")]
    pub reference: TokenReference,
}

/// `wsse:Reference` pointing at the BinarySecurityToken
#[derive(Debug, Clone, Serialize)]
pub struct TokenReference {
    #[serde(rename = "@URI")]
    pub uri: String,

    #[serde(rename = "@ValueType")]
    pub value_type: String,
}
