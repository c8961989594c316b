mod errors;
pub mod rsa;
pub mod x509;

pub use errors::Error;

use errors::CryptoResult;
use openssl::hash::{Hasher, MessageDigest as Digest};

/// Digest algorithms of the supported signature suites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha256,
}

impl HashAlg {
    /// Hash the given data with this hash algorithm
    pub fn hash(&self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        let mut hasher = Hasher::new(self.into())?;
        hasher.update(data.as_ref())?;
        Ok(hasher.finish()?.to_vec())
    }
}

impl From<&HashAlg> for Digest {
    fn from(hash_alg: &HashAlg) -> Self {
        match hash_alg {
            HashAlg::Sha1 => Digest::sha1(),
            HashAlg::Sha256 => Digest::sha256(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::STANDARD};

    #[test]
    fn test_known_vectors() {
        let sha1 = HashAlg::Sha1.hash(b"abc").unwrap();
        assert_eq!(STANDARD.encode(sha1), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");

        let sha256 = HashAlg::Sha256.hash(b"abc").unwrap();
        assert_eq!(
            STANDARD.encode(sha256),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }
}
