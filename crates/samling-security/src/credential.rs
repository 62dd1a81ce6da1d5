#![forbid(unsafe_code)]

//! Trusted credentials and the sources of untrusted KeyInfo.

use samling_core::Result;
use samling_dsig::KeyInfo;
use samling_keys::loader::load_x509_cert_der;
use samling_keys::{entity_certificate_first, Key};
use samling_xmlobject::XmlHandle;

/// A credential the caller already trusts: an entity certificate with
/// its chain, and/or bare public keys.
#[derive(Debug, Clone, Default)]
pub struct X509Credential {
    entity_id: Option<String>,
    certificates: Vec<Vec<u8>>,
    public_keys: Vec<Key>,
    crls: Vec<Vec<u8>>,
}

impl X509Credential {
    pub fn new() -> Self {
        Self::default()
    }

    /// A credential for the entity certificate `der`.
    pub fn from_certificate(der: Vec<u8>) -> Self {
        Self::new().with_certificates(vec![der])
    }

    /// A credential for a bare key; its certificates are carried along.
    pub fn from_key(key: Key) -> Self {
        let certificates = key.certificates.clone();
        Self::new()
            .with_certificates(certificates)
            .with_public_key(key.public())
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// The certificates in any order; the entity certificate is moved to
    /// the front.
    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = entity_certificate_first(&certificates);
        self
    }

    pub fn with_public_key(mut self, key: Key) -> Self {
        self.public_keys.push(key);
        self
    }

    pub fn with_crls(mut self, crls: Vec<Vec<u8>>) -> Self {
        self.crls = crls;
        self
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn entity_certificate(&self) -> Option<&[u8]> {
        self.certificates.first().map(Vec::as_slice)
    }

    pub fn certificates(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    pub fn crls(&self) -> &[Vec<u8>] {
        &self.crls
    }

    /// The keys to try: the explicit public keys in the order given,
    /// then the entity certificate's key.
    pub fn candidate_keys(&self) -> Result<Vec<Key>> {
        let mut keys: Vec<Key> = self.public_keys.clone();
        if let Some(entity) = self.entity_certificate() {
            let key = load_x509_cert_der(entity)?.with_certificates(self.certificates.clone());
            if !keys.iter().any(|k| k.same_public_key(&key)) {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// An ordered supply of untrusted KeyInfos for one peer.
pub trait KeyInfoSource {
    /// The peer the KeyInfos belong to, used to select validation
    /// information.
    fn name(&self) -> Option<&str>;

    fn key_infos(&self) -> Vec<XmlHandle<KeyInfo>>;
}

/// A fixed list of KeyInfos.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyInfoSource {
    name: Option<String>,
    key_infos: Vec<XmlHandle<KeyInfo>>,
}

impl StaticKeyInfoSource {
    pub fn new(name: Option<String>, key_infos: Vec<XmlHandle<KeyInfo>>) -> Self {
        Self { name, key_infos }
    }

    pub fn push(&mut self, key_info: XmlHandle<KeyInfo>) {
        self.key_infos.push(key_info);
    }
}

impl KeyInfoSource for StaticKeyInfoSource {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn key_infos(&self) -> Vec<XmlHandle<KeyInfo>> {
        self.key_infos.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{ca_der, leaf_der, leaf_key, rogue_key};

    #[test]
    fn certificates_are_entity_first() {
        let credential = X509Credential::new().with_certificates(vec![ca_der(), leaf_der()]);
        assert_eq!(credential.entity_certificate(), Some(leaf_der().as_slice()));
        assert_eq!(credential.certificates().len(), 2);
    }

    #[test]
    fn candidate_keys_order() {
        let credential = X509Credential::from_certificate(leaf_der())
            .with_public_key(rogue_key().public())
            .with_entity_id("https://idp.example.org");
        let keys = credential.candidate_keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].same_public_key(&rogue_key()));
        assert!(keys[1].same_public_key(&leaf_key()));
        assert_eq!(keys[1].certificate(), Some(leaf_der().as_slice()));
        assert_eq!(credential.entity_id(), Some("https://idp.example.org"));
    }

    #[test]
    fn duplicate_certificate_key_is_not_repeated() {
        let key = leaf_key().with_certificates(vec![leaf_der()]);
        let keys = X509Credential::from_key(key).candidate_keys().unwrap();
        assert_eq!(keys.len(), 1);
        assert!(!keys[0].has_private());
    }

    #[test]
    fn static_source_keeps_order() {
        let first = KeyInfo::from_key(&leaf_key().public()).unwrap();
        let second = KeyInfo::from_key(&rogue_key().public()).unwrap();
        let mut source = StaticKeyInfoSource::new(Some("peer".into()), vec![first.clone()]);
        source.push(second.clone());
        let infos = source.key_infos();
        assert!(infos[0].ptr_eq(&first));
        assert!(infos[1].ptr_eq(&second));
        assert_eq!(source.name(), Some("peer"));
    }
}
