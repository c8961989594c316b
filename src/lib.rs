pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod id;
pub mod soap;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CallContext, Client, ClientOptions, SigningCredentials};
pub use error::{ConfigError, DecodeError, Error, Result, TransportError};
pub use soap::wsse::{SignatureSuite, Signer, SigningError, XmlDsigSigner};
pub use transport::{HttpTransport, SoapRequest, SoapResponse, Transport};
