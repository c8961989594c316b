use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::rsa::Rsa;
use openssl::sign::{Signer, Verifier};

const PEM_BOUNDARY: &[u8] = b"-----BEGIN";

/// RSA private key wrapper
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
}

impl RsaPrivateKey {
    /// Generate a new RSA private key with the given modulus size
    pub fn generate(bits: u32) -> CryptoResult<Self> {
        let rsa = Rsa::generate(bits)?;
        let key = PKey::from_rsa(rsa)?;
        Ok(Self { key })
    }

    /// Load from PEM-encoded PKCS#1/PKCS#8.
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_pem(pem_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from DER-encoded PKCS#1/PKCS#8.
    pub fn from_der(der_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let key = PKey::private_key_from_der(der_bytes.as_ref())?;
        Self::from_pkey(key)
    }

    /// Load from PEM or DER, picking the format from the content.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(Error::Invalid("empty private key".into()));
        }
        if is_pem(bytes) {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        if key.id() != Id::RSA {
            return Err(Error::UnsupportedKey(format!("key id {}", key.id().as_raw())));
        }
        Ok(Self { key })
    }

    /// Serialize as PEM-encoded PKCS#8.
    pub fn to_pem(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.private_key_to_pem_pkcs8()?)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let key = PKey::public_key_from_der(&self.key.public_key_to_der()?)?;
        Ok(RsaPublicKey { key })
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// RSA public key wrapper
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
}

impl RsaPublicKey {
    pub(crate) fn from_pkey(key: PKey<Public>) -> CryptoResult<Self> {
        if key.id() != Id::RSA {
            return Err(Error::UnsupportedKey(format!("key id {}", key.id().as_raw())));
        }
        Ok(Self { key })
    }

    /// Export key in SubjectPublicKeyInfo DER format
    pub fn to_der(&self) -> CryptoResult<Vec<u8>> {
        Ok(self.key.public_key_to_der()?)
    }
}

/// Sign data with RSASSA-PKCS1-v1_5 using the given hash
pub fn sign(
    private_key: &RsaPrivateKey,
    data: impl AsRef<[u8]>,
    hash_alg: HashAlg,
) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new(MessageDigest::from(&hash_alg), private_key.pkey())?;
    signer.update(data.as_ref())?;
    Ok(signer.sign_to_vec()?)
}

/// Verify an RSASSA-PKCS1-v1_5 signature
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &[u8],
    hash_alg: HashAlg,
) -> CryptoResult<bool> {
    let mut verifier = Verifier::new(MessageDigest::from(&hash_alg), &public_key.key)?;
    verifier.update(data.as_ref())?;
    Ok(verifier.verify(signature)?)
}

pub(crate) fn is_pem(bytes: &[u8]) -> bool {
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| &bytes[start..])
        .unwrap_or_default();
    trimmed.starts_with(PEM_BOUNDARY)
}
