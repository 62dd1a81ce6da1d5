#![forbid(unsafe_code)]

//! Trust in one known X.509 credential, without path building.

use crate::credential::X509Credential;
use crate::engine::{first_valid_key, first_valid_raw_key, security_error, SignatureTrustEngine};
use samling_core::Result;
use samling_dsig::Signature;
use samling_xmlobject::XmlHandle;

/// Checks a signature against one trusted credential, without building
/// a certificate path.
///
/// Every public key of the credential is tried in turn, then the key of
/// its entity certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicX509SignatureTrustEngine;

impl BasicX509SignatureTrustEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SignatureTrustEngine for BasicX509SignatureTrustEngine {
    type TrustBasis = X509Credential;

    fn validate(&self, signature: &XmlHandle<Signature>, trust: &X509Credential) -> Result<bool> {
        let keys = trust.candidate_keys().map_err(security_error)?;
        tracing::debug!(
            entity = ?trust.entity_id(),
            candidates = keys.len(),
            "validating against trusted credential"
        );
        Ok(first_valid_key(signature, &keys)?.is_some())
    }

    fn validate_raw(
        &self,
        signature: &[u8],
        content: &[u8],
        algorithm: &str,
        trust: &X509Credential,
    ) -> Result<bool> {
        let keys = trust.candidate_keys().map_err(security_error)?;
        Ok(first_valid_raw_key(signature, content, algorithm, &keys)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{leaf_der, leaf_key, rogue_der, rogue_key, sign_raw, signed_standalone};
    use samling_core::{algorithm, Error};

    #[test]
    fn entity_certificate_validates() {
        let signature = signed_standalone(&leaf_key());
        let engine = BasicX509SignatureTrustEngine::new();
        assert!(engine
            .validate(&signature, &X509Credential::from_certificate(leaf_der()))
            .unwrap());
        assert!(!engine
            .validate(&signature, &X509Credential::from_certificate(rogue_der()))
            .unwrap());
    }

    #[test]
    fn later_public_key_still_matches() {
        let value = sign_raw(&leaf_key(), b"content");
        let credential = X509Credential::from_certificate(rogue_der())
            .with_public_key(rogue_key().public())
            .with_public_key(leaf_key().public());
        assert!(BasicX509SignatureTrustEngine
            .validate_raw(&value, b"content", algorithm::ECDSA_SHA256, &credential)
            .unwrap());
    }

    #[test]
    fn empty_credential_is_false() {
        let value = sign_raw(&leaf_key(), b"content");
        assert!(!BasicX509SignatureTrustEngine
            .validate_raw(&value, b"content", algorithm::ECDSA_SHA256, &X509Credential::new())
            .unwrap());
    }

    #[test]
    fn unparseable_certificate_is_a_security_error() {
        let credential = X509Credential::from_certificate(vec![0xff]);
        assert!(matches!(
            BasicX509SignatureTrustEngine.validate_raw(b"s", b"c", algorithm::ECDSA_SHA256, &credential),
            Err(Error::Security(_))
        ));
    }
}
