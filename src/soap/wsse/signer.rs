use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::collections::HashMap;
use std::str;

use crate::crypto::{rsa, rsa::RsaPrivateKey};
use crate::soap;
use crate::soap::wsse::{
    Reference, Result, SignedInfo, SigningError, algorithms, c14n, digest_hash, signature_hash,
    utils,
};

/// Produces the signed form of a serialized envelope.
///
/// Implementations receive the document with its signature template in
/// place and return the same document with digest and signature values
/// filled in. Anything that rejects the key or the document fails with a
/// [`SigningError`].
pub trait Signer: Send + Sync {
    fn sign(&self, private_key: &[u8], document: &[u8]) -> Result<Vec<u8>>;
}

/// XML-DSig enveloped-template signer over RSA keys
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlDsigSigner;

impl Signer for XmlDsigSigner {
    fn sign(&self, private_key: &[u8], document: &[u8]) -> Result<Vec<u8>> {
        let key = RsaPrivateKey::from_bytes(private_key)?;
        let xml = str::from_utf8(document)?;

        let template = utils::extract_element(xml, "SignedInfo")?;
        let signed_info: SignedInfo = soap::from_str(&template.xml)?;

        if signed_info.canon_method.algorithm != algorithms::EXCLUSIVE_C14N {
            return Err(SigningError::UnsupportedAlgorithm(
                signed_info.canon_method.algorithm,
            ));
        }
        let hash = signature_hash(&signed_info.signature_method.algorithm)?;
        if signed_info.references.is_empty() {
            return Err(SigningError::Invalid("SignedInfo has no references".into()));
        }

        // Digest every referenced element
        let mut digests = HashMap::with_capacity(signed_info.references.len());
        for reference in &signed_info.references {
            digests.insert(reference.uri.clone(), digest_reference(xml, reference)?);
        }
        let digested = utils::fill_digest_values(xml, &digests)?;

        // Canonicalize and sign the completed SignedInfo
        let signed_info = utils::extract_element(&digested, "SignedInfo")?;
        let signed_info_c14n = c14n::canonicalize(&signed_info.xml, &signed_info.namespaces)?;
        let signature = rsa::sign(&key, signed_info_c14n.as_bytes(), hash)?;

        let signed = utils::fill_signature_value(&digested, &BASE64.encode(signature))?;
        Ok(signed.into_bytes())
    }
}

/// Computes the base64 digest of the element a same-document reference points at
fn digest_reference(xml: &str, reference: &Reference) -> Result<String> {
    let id = reference.uri.strip_prefix('#').ok_or_else(|| {
        SigningError::Invalid(format!("unsupported reference URI '{}'", reference.uri))
    })?;
    let hash = digest_hash(&reference.digest_method.algorithm)?;

    // Exclusive c14n is the only transform; a reference without transforms
    // is canonicalized the same way.
    if let Some(transforms) = &reference.transforms {
        if let Some(transform) = transforms
            .transform
            .iter()
            .find(|t| t.algorithm != algorithms::EXCLUSIVE_C14N)
        {
            return Err(SigningError::UnsupportedAlgorithm(transform.algorithm.clone()));
        }
    }

    let element = utils::extract_element_by_id(xml, id)?;
    let canonical = c14n::canonicalize(&element.xml, &element.namespaces)?;
    let digest = hash.hash(canonical.as_bytes())?;
    Ok(BASE64.encode(digest))
}
