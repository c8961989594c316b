/// Failure of the signing stage
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("XML processing error: {0}")]
    Xml(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid document: {0}")]
    Invalid(String),

    #[error("{0}")]
    Other(String),
}

impl From<quick_xml::Error> for SigningError {
    fn from(err: quick_xml::Error) -> Self {
        SigningError::Xml(err.to_string())
    }
}

impl From<quick_xml::DeError> for SigningError {
    fn from(err: quick_xml::DeError) -> Self {
        SigningError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SigningError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        SigningError::Xml(err.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(err: std::io::Error) -> Self {
        SigningError::Xml(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for SigningError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        SigningError::Utf8(err.utf8_error())
    }
}
