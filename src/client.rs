
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretSlice};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{ConfigError, DecodeError, Error, Result, TransportError};
use crate::soap::wsse::{SignatureSuite, Signer, X509Token, XmlDsigSigner, attach_security};
use crate::soap::{self, Envelope};
use crate::transport::{HttpTransport, SoapRequest, Transport};

/// Certificate and private key used to sign every call of a client.
///
/// The certificate may be PEM or DER. The key is handed to the signer as
/// given.
pub struct SigningCredentials {
    certificate: Vec<u8>,
    private_key: SecretSlice<u8>,
}

impl SigningCredentials {
    pub fn new(certificate: impl Into<Vec<u8>>, private_key: impl Into<Vec<u8>>) -> Self {
        Self {
            certificate: certificate.into(),
            private_key: SecretSlice::from(private_key.into()),
        }
    }
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Construction-time options, validated by [`Client::new`].
///
/// Options are applied in the order transport, signer, signing
/// credentials, signature suite; the first one that fails is named in the
/// returned [`ConfigError::InvalidOption`].
#[derive(Default)]
pub struct ClientOptions {
    transport: Option<Arc<dyn Transport>>,
    signer: Option<Arc<dyn Signer>>,
    signing_credentials: Option<SigningCredentials>,
    signature_suite: Option<SignatureSuite>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default HTTP transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the default XML-DSig signer; requires signing credentials
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sign every call with the given certificate and key
    pub fn with_signing_credentials(mut self, credentials: SigningCredentials) -> Self {
        self.signing_credentials = Some(credentials);
        self
    }

    /// Select signature and digest methods; requires signing credentials
    pub fn with_signature_suite(mut self, suite: SignatureSuite) -> Self {
        self.signature_suite = Some(suite);
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("custom_transport", &self.transport.is_some())
            .field("custom_signer", &self.signer.is_some())
            .field("signing_credentials", &self.signing_credentials)
            .field("signature_suite", &self.signature_suite)
            .finish()
    }
}

/// Cancellation and deadline for a single call.
///
/// Both are only observed while the transport is in flight; signing is
/// never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    timeout: Option<Duration>,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Runs `fut` until it completes, the deadline passes or the token is cancelled
    async fn guard<F, T>(&self, fut: F) -> std::result::Result<T, TransportError>
    where
        F: Future<Output = std::result::Result<T, TransportError>>,
    {
        let bounded = async {
            match self.timeout {
                Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::TimedOut(timeout)),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(TransportError::Cancelled),
            result = bounded => result,
        }
    }
}

struct Signing {
    signer: Arc<dyn Signer>,
    token: X509Token,
    private_key: SecretSlice<u8>,
    suite: SignatureSuite,
}

struct ClientInner {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    signing: Option<Signing>,
}

/// SOAP 1.1 client bound to one endpoint.
///
/// Cheap to clone; all clones share the same immutable configuration and
/// may call concurrently.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Parse `endpoint` and validate `options`.
    ///
    /// The query string of the endpoint is dropped; only `http` and `https`
    /// are accepted.
    pub fn new(endpoint: &str, options: ClientOptions) -> std::result::Result<Self, ConfigError> {
        let endpoint = parse_endpoint(endpoint)?;

        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::default()));

        if options.signer.is_some() && options.signing_credentials.is_none() {
            return Err(ConfigError::invalid_option(
                "signer",
                "a signer requires signing credentials",
            ));
        }
        let signer = options
            .signer
            .unwrap_or_else(|| Arc::new(XmlDsigSigner));

        let signing = match options.signing_credentials {
            Some(credentials) => {
                let token = X509Token::from_certificate(&credentials.certificate)
                    .map_err(|e| ConfigError::invalid_option("signing_credentials", e))?;
                if credentials.private_key.expose_secret().is_empty() {
                    return Err(ConfigError::invalid_option(
                        "signing_credentials",
                        "private key is empty",
                    ));
                }
                Some(Signing {
                    signer,
                    token,
                    private_key: credentials.private_key,
                    suite: options.signature_suite.unwrap_or_default(),
                })
            }
            None if options.signature_suite.is_some() => {
                return Err(ConfigError::invalid_option(
                    "signature_suite",
                    "a signature suite requires signing credentials",
                ));
            }
            None => None,
        };

        info!(
            endpoint = %endpoint,
            signed = signing.is_some(),
            "SOAP client configured"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint,
                transport,
                signing,
            }),
        })
    }

    /// Build a client from loaded [`Settings`], reading credential files if set
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ConfigError> {
        let transport = HttpTransport::with_timeout(Duration::from_secs(settings.timeout_secs))
            .map_err(|e| ConfigError::invalid_option("transport", e))?;
        let mut options = ClientOptions::new().with_transport(Arc::new(transport));

        if let Some(credentials) = settings.signing_credentials()? {
            options = options
                .with_signing_credentials(credentials)
                .with_signature_suite(settings.signature_suite);
        }
        Self::new(&settings.endpoint, options)
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Whether calls carry a WS-Security header and signature
    pub fn is_signing(&self) -> bool {
        self.inner.signing.is_some()
    }

    /// Send `payload` with the given `SOAPAction` and decode the response body as `R`.
    ///
    /// The response is decoded as-is; a SOAP envelope around the reply is
    /// not unwrapped, so `R` must describe the whole response document.
    pub async fn call<P, R>(&self, ctx: &CallContext, soap_action: &str, payload: &P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let mut envelope = Envelope::new(payload);
        let body_id = envelope.body_id().clone();

        if let Some(signing) = &self.inner.signing {
            attach_security(&mut envelope, &signing.token, &body_id, signing.suite);
        }

        let document = envelope.serialize_soap(false)?;
        let body = match &self.inner.signing {
            Some(signing) => signing
                .signer
                .sign(signing.private_key.expose_secret(), document.as_bytes())?,
            None => document.into_bytes(),
        };

        let request = SoapRequest::new(self.inner.endpoint.clone(), soap_action, body)?;
        debug!(
            endpoint = %self.inner.endpoint,
            soap_action,
            body_id = %body_id,
            signed = self.is_signing(),
            bytes = request.body.len(),
            "sending SOAP request"
        );

        let response = ctx
            .guard(self.inner.transport.send(request))
            .await
            .map_err(|source| Error::Transport {
                action: soap_action.to_string(),
                source,
            })?;

        if !response.status.is_success() {
            warn!(
                soap_action,
                status = %response.status,
                "SOAP endpoint answered with a non-success status"
            );
        }

        Ok(decode(&response.body)?)
    }

    /// Like [`Client::call`], writing into `destination` only when the whole call succeeds
    pub async fn call_into<P, R>(
        &self,
        ctx: &CallContext,
        soap_action: &str,
        payload: &P,
        destination: &mut R,
    ) -> Result<()>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        *destination = self.call(ctx, soap_action, payload).await?;
        Ok(())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("signed", &self.is_signing())
            .field(
                "signature_suite",
                &self.inner.signing.as_ref().map(|s| s.suite),
            )
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(endpoint: &str) -> std::result::Result<Url, ConfigError> {
    let mut url = Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
        url: endpoint.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
    }
    url.set_query(None);
    Ok(url)
}

/// Decode a response body directly into `R`
fn decode<R: DeserializeOwned>(body: &[u8]) -> std::result::Result<R, DecodeError> {
    let xml = std::str::from_utf8(body)?;
    soap::check_well_formed(xml).map_err(|e| DecodeError::NotXml(e.to_string()))?;
    soap::from_str(xml).map_err(DecodeError::Shape)
}
