use crate::crypto::errors::CryptoResult;
use crate::crypto::rsa::{RsaPublicKey, is_pem};
use openssl::x509::X509;

/// X.509 certificate accepted in PEM or DER form
#[derive(Clone)]
pub struct Certificate {
    x509: X509,
}

impl Certificate {
    /// Parse a certificate, picking PEM or DER from the content
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let bytes = bytes.as_ref();
        let x509 = if is_pem(bytes) {
            X509::from_pem(bytes)?
        } else {
            X509::from_der(bytes)?
        };
        Ok(Self { x509 })
    }

    /// DER encoding, the form carried by an X509v3 BinarySecurityToken
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.x509.to_der()?)
    }

    /// Subject public key, which must be RSA
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        RsaPublicKey::from_pkey(self.x509.public_key()?)
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate").finish_non_exhaustive()
    }
}
