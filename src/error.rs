use std::path::PathBuf;
use std::str::Utf8Error;
use std::time::Duration;

use quick_xml::{DeError, SeError};
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

use crate::soap::wsse::SigningError;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a client call, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum Error {
    #[error("configure client: {0}")]
    Config(#[from] ConfigError),

    #[error("encode document: {0}")]
    Serialization(#[from] SeError),

    #[error("sign document: {0}")]
    Signing(#[from] SigningError),

    #[error("create request: {0}")]
    Request(#[from] InvalidHeaderValue),

    #[error("call {action}: {source}")]
    Transport {
        action: String,
        #[source]
        source: TransportError,
    },

    #[error("decode response: {0}")]
    Decode(#[from] DecodeError),
}

/// Invalid construction-time input
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported endpoint scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("invalid option '{option}': {reason}")]
    InvalidOption {
        option: &'static str,
        reason: String,
    },

    #[error("settings: {0}")]
    Settings(#[from] ::config::ConfigError),

    #[error("read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid_option(option: &'static str, reason: impl ToString) -> Self {
        ConfigError::InvalidOption {
            option,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("call cancelled")]
    Cancelled,

    #[error("call timed out after {0:?}")]
    TimedOut(Duration),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response is not UTF-8: {0}")]
    NotUtf8(#[from] Utf8Error),

    #[error("response is not XML: {0}")]
    NotXml(String),

    #[error("response does not match the expected shape: {0}")]
    Shape(DeError),
}
