#![forbid(unsafe_code)]

//! Signing configuration.

use samling_core::algorithm;
use samling_keys::Key;

/// The parameters of one signature.
///
/// Defaults: exclusive c14n without comments, SHA-1 digests, RSA-SHA1
/// signatures, and the enveloped-signature and exclusive c14n
/// transforms.
#[derive(Debug, Clone)]
pub struct SigningContext {
    canonicalization_algorithm: String,
    digest_algorithm: String,
    signature_algorithm: String,
    signing_key: Option<Key>,
    public_key: Option<Key>,
    certificates: Vec<Vec<u8>>,
    transforms: Vec<String>,
    inclusive_prefixes: Vec<String>,
}

impl Default for SigningContext {
    fn default() -> Self {
        Self {
            canonicalization_algorithm: algorithm::EXC_C14N.to_owned(),
            digest_algorithm: algorithm::SHA1.to_owned(),
            signature_algorithm: algorithm::RSA_SHA1.to_owned(),
            signing_key: None,
            public_key: None,
            certificates: Vec::new(),
            transforms: vec![
                algorithm::ENVELOPED_SIGNATURE.to_owned(),
                algorithm::EXC_C14N.to_owned(),
            ],
            inclusive_prefixes: Vec::new(),
        }
    }
}

impl SigningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canonicalization_algorithm(mut self, uri: impl Into<String>) -> Self {
        self.canonicalization_algorithm = uri.into();
        self
    }

    pub fn with_digest_algorithm(mut self, uri: impl Into<String>) -> Self {
        self.digest_algorithm = uri.into();
        self
    }

    pub fn with_signature_algorithm(mut self, uri: impl Into<String>) -> Self {
        self.signature_algorithm = uri.into();
        self
    }

    /// The private key to sign with. Certificates carried by the key are
    /// embedded unless certificates were set explicitly.
    pub fn with_signing_key(mut self, key: Key) -> Self {
        if self.certificates.is_empty() {
            self.certificates = key.certificates.clone();
        }
        self.signing_key = Some(key);
        self
    }

    pub fn with_public_key(mut self, key: Key) -> Self {
        self.public_key = Some(key);
        self
    }

    /// DER certificates to embed in the signature's KeyInfo.
    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<String>) -> Self {
        self.transforms = transforms;
        self
    }

    /// The exclusive c14n `InclusiveNamespaces` prefix list.
    pub fn with_inclusive_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.inclusive_prefixes = prefixes;
        self
    }

    pub fn canonicalization_algorithm(&self) -> &str {
        &self.canonicalization_algorithm
    }

    pub fn digest_algorithm(&self) -> &str {
        &self.digest_algorithm
    }

    pub fn signature_algorithm(&self) -> &str {
        &self.signature_algorithm
    }

    pub fn signing_key(&self) -> Option<&Key> {
        self.signing_key.as_ref()
    }

    /// The key to validate with: the explicit public key, else the public
    /// half of the signing key.
    pub fn public_key(&self) -> Option<Key> {
        self.public_key
            .clone()
            .or_else(|| self.signing_key.as_ref().map(Key::public))
    }

    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    pub fn transforms(&self) -> &[String] {
        &self.transforms
    }

    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let ctx = SigningContext::new();
        assert_eq!(ctx.canonicalization_algorithm(), algorithm::EXC_C14N);
        assert_eq!(ctx.digest_algorithm(), algorithm::SHA1);
        assert_eq!(ctx.signature_algorithm(), algorithm::RSA_SHA1);
        assert_eq!(
            ctx.transforms(),
            [algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N]
        );
        assert!(ctx.signing_key().is_none());
        assert!(ctx.public_key().is_none());
    }

    #[test]
    fn signing_key_brings_its_certificates() {
        let key = crate::tests::ec_key(7).with_certificates(vec![vec![1, 2, 3]]);
        let ctx = SigningContext::new().with_signing_key(key);
        assert_eq!(ctx.certificates(), [vec![1u8, 2, 3]]);
        assert!(!ctx.public_key().unwrap().has_private());

        let explicit = SigningContext::new()
            .with_certificates(vec![vec![9]])
            .with_signing_key(ctx.signing_key().unwrap().clone());
        assert_eq!(explicit.certificates(), [vec![9u8]]);
    }
}
