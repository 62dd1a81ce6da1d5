#![forbid(unsafe_code)]

//! Trust in the keys of a KeyInfo the caller already trusts.

use crate::engine::{first_valid_key, first_valid_raw_key, security_error, SignatureTrustEngine};
use samling_core::Result;
use samling_dsig::{InlineX509KeyInfoResolver, KeyInfo, KeyInfoResolver, Signature};
use samling_keys::Key;
use samling_xmlobject::XmlHandle;

/// Checks a signature against the keys of a KeyInfo the caller has
/// already decided to trust.
#[derive(Debug, Clone, Default)]
pub struct BasicSignatureTrustEngine<R = InlineX509KeyInfoResolver> {
    resolver: R,
}

impl<R: KeyInfoResolver> BasicSignatureTrustEngine<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn keys(&self, key_info: &KeyInfo) -> Result<Vec<Key>> {
        let keys = self.resolver.resolve_keys(key_info).map_err(security_error)?;
        if keys.is_empty() {
            tracing::debug!("no keys in the trusted KeyInfo");
        }
        Ok(keys)
    }
}

impl<R: KeyInfoResolver> SignatureTrustEngine for BasicSignatureTrustEngine<R> {
    type TrustBasis = KeyInfo;

    fn validate(&self, signature: &XmlHandle<Signature>, trust: &KeyInfo) -> Result<bool> {
        let keys = self.keys(trust)?;
        Ok(first_valid_key(signature, &keys)?.is_some())
    }

    fn validate_raw(
        &self,
        signature: &[u8],
        content: &[u8],
        algorithm: &str,
        trust: &KeyInfo,
    ) -> Result<bool> {
        let keys = self.keys(trust)?;
        Ok(first_valid_raw_key(signature, content, algorithm, &keys)?.is_some())
    }
}
