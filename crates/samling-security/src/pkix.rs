#![forbid(unsafe_code)]

//! Trust through certificate path validation.
//!
//! For each KeyInfo a source offers, in order:
//! 1. Resolve its candidate keys, certificates and CRLs
//! 2. Find a key the signature verifies under
//! 3. Put the certificate holding that key first
//! 4. Validate the path against the peer's trust anchors
//!
//! Both checks must pass. A signature that verifies under a key with no
//! trusted path is not trusted.

use crate::credential::KeyInfoSource;
use crate::engine::{security_error, verifies, verifies_raw, SignatureTrustEngine};
use crate::pkix_info::PkixValidationInformationResolver;
use samling_core::Result;
use samling_dsig::{
    InlineX509KeyInfoResolver, KeyInfo, KeyInfoResolver, Signature, X509KeyInfoResolver,
};
use samling_keys::loader::load_x509_cert_der;
use samling_keys::{validate_cert_chain, Key};
use samling_xmlobject::XmlHandle;

struct Candidates {
    keys: Vec<Key>,
    certificates: Vec<Vec<u8>>,
    crls: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct PkixSignatureTrustEngine<P, R = InlineX509KeyInfoResolver> {
    validation: P,
    resolver: R,
}

impl<P: PkixValidationInformationResolver> PkixSignatureTrustEngine<P> {
    pub fn new(validation: P) -> Self {
        Self::with_resolver(validation, InlineX509KeyInfoResolver)
    }
}

impl<P, R> PkixSignatureTrustEngine<P, R>
where
    P: PkixValidationInformationResolver,
    R: X509KeyInfoResolver,
{
    pub fn with_resolver(validation: P, resolver: R) -> Self {
        Self {
            validation,
            resolver,
        }
    }

    pub fn validation_information_resolver(&self) -> &P {
        &self.validation
    }

    fn candidates(&self, key_info: &XmlHandle<KeyInfo>) -> Result<Candidates> {
        let info = key_info.try_borrow().map_err(security_error)?;
        Ok(Candidates {
            keys: self.resolver.resolve_keys(&info).map_err(security_error)?,
            certificates: self
                .resolver
                .resolve_certificates(&info)
                .map_err(security_error)?,
            crls: self.resolver.resolve_crls(&info).map_err(security_error)?,
        })
    }

    /// Walk the source's KeyInfos in order, resolving each only when it is
    /// reached; `check` is the cryptographic test for one key.
    fn evaluate(
        &self,
        source: &dyn KeyInfoSource,
        check: impl Fn(&Key) -> Result<bool>,
    ) -> Result<bool> {
        let peer = source.name();
        for key_info in source.key_infos() {
            let candidates = self.candidates(&key_info)?;
            for key in &candidates.keys {
                if !check(key)? {
                    continue;
                }
                if self.trusted_path(key, &candidates.certificates, &candidates.crls, peer)? {
                    return Ok(true);
                }
            }
        }
        tracing::debug!(peer = ?peer, "no candidate key with a trusted path");
        Ok(false)
    }

    fn trusted_path(
        &self,
        key: &Key,
        certificates: &[Vec<u8>],
        crls: &[Vec<u8>],
        peer: Option<&str>,
    ) -> Result<bool> {
        let Some(chain) = chain_for_key(key, certificates) else {
            tracing::debug!(key = ?key.name, "verifying key has no certificate");
            return Ok(false);
        };
        let infos = self.validation.resolve(peer).map_err(security_error)?;
        if infos.is_empty() {
            tracing::debug!(peer = ?peer, "no PKIX validation information for peer");
            return Ok(false);
        }
        for info in &infos {
            match validate_cert_chain(&chain, &info.to_config(crls)) {
                Ok(()) => {
                    tracing::debug!(peer = ?peer, "certificate path validated");
                    return Ok(true);
                }
                Err(e) => tracing::debug!(peer = ?peer, error = %e, "certificate path rejected"),
            }
        }
        Ok(false)
    }
}

/// `certificates` reordered so the one holding `key` comes first, or
/// `None` when no certificate holds it.
fn chain_for_key(key: &Key, certificates: &[Vec<u8>]) -> Option<Vec<Vec<u8>>> {
    let index = certificates.iter().position(|der| {
        load_x509_cert_der(der).is_ok_and(|certified| certified.same_public_key(key))
    })?;
    let mut chain = certificates.to_vec();
    let entity = chain.remove(index);
    chain.insert(0, entity);
    Some(chain)
}

impl<P, R> SignatureTrustEngine for PkixSignatureTrustEngine<P, R>
where
    P: PkixValidationInformationResolver,
    R: X509KeyInfoResolver,
{
    type TrustBasis = dyn KeyInfoSource;

    fn validate(&self, signature: &XmlHandle<Signature>, trust: &Self::TrustBasis) -> Result<bool> {
        self.evaluate(trust, |key| verifies(signature, key))
    }

    fn validate_raw(
        &self,
        signature: &[u8],
        content: &[u8],
        algorithm: &str,
        trust: &Self::TrustBasis,
    ) -> Result<bool> {
        self.evaluate(trust, |key| verifies_raw(signature, content, algorithm, key))
    }
}
