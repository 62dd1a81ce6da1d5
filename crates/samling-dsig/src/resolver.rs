#![forbid(unsafe_code)]

//! Extracting candidate keys and certificates from `<ds:KeyInfo>`.

use crate::keyinfo::KeyInfo;
use samling_core::{Error, Result};
use samling_keys::loader::load_x509_cert_der;
use samling_keys::{entity_certificate_first, Key};

/// Produces the keys a KeyInfo describes.
pub trait KeyInfoResolver {
    fn resolve_keys(&self, key_info: &KeyInfo) -> Result<Vec<Key>>;
}

/// A KeyInfo resolver that also exposes the X.509 material.
pub trait X509KeyInfoResolver: KeyInfoResolver {
    /// All certificates, the entity certificate first.
    fn resolve_certificates(&self, key_info: &KeyInfo) -> Result<Vec<Vec<u8>>>;

    /// The certificate of the signing entity.
    fn resolve_entity_certificate(&self, key_info: &KeyInfo) -> Result<Option<Vec<u8>>> {
        Ok(self.resolve_certificates(key_info)?.into_iter().next())
    }

    fn resolve_crls(&self, key_info: &KeyInfo) -> Result<Vec<Vec<u8>>>;
}

/// Resolves only what is written inline in the KeyInfo.
///
/// Keys come out in document order of their `KeyValue`s, followed by
/// the entity certificate's key carrying the full chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineX509KeyInfoResolver;

impl KeyInfoResolver for InlineX509KeyInfoResolver {
    fn resolve_keys(&self, key_info: &KeyInfo) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        for value in key_info.key_values() {
            match value.borrow().to_key() {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => {}
                Err(e @ Error::UnsupportedAlgorithm(_)) => {
                    tracing::debug!(error = %e, "skipping KeyValue");
                }
                Err(e) => return Err(e),
            }
        }
        let certificates = self.resolve_certificates(key_info)?;
        if let Some(entity) = certificates.first() {
            let key = load_x509_cert_der(entity)?.with_certificates(certificates.clone());
            keys.push(key);
        }
        if let Some(name) = key_info.key_names().first() {
            let name = name.borrow().value().map(str::to_owned);
            if let Some(name) = name {
                for key in keys.iter_mut().filter(|k| k.name.is_none()) {
                    key.name = Some(name.clone());
                }
            }
        }
        tracing::trace!(count = keys.len(), "resolved keys from KeyInfo");
        Ok(keys)
    }
}

impl X509KeyInfoResolver for InlineX509KeyInfoResolver {
    fn resolve_certificates(&self, key_info: &KeyInfo) -> Result<Vec<Vec<u8>>> {
        let mut certificates = Vec::new();
        for data in key_info.x509_datas() {
            certificates.extend(data.borrow().certificate_ders()?);
        }
        Ok(entity_certificate_first(&certificates))
    }

    fn resolve_crls(&self, key_info: &KeyInfo) -> Result<Vec<Vec<u8>>> {
        let mut crls = Vec::new();
        for data in key_info.x509_datas() {
            crls.extend(data.borrow().crl_ders()?);
        }
        Ok(crls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyinfo::{KeyName, X509Data};
    use crate::tests::ec_key;
    use samling_xmlobject::XmlObjectType;

    #[test]
    fn key_values_in_document_order() {
        let first = ec_key(11).public();
        let second = ec_key(12).public();
        let key_info = KeyInfo::from_key(&first).unwrap();
        let extra = crate::keyinfo::KeyValue::from_key(&second).unwrap().unwrap();
        key_info.borrow_mut().push(extra.erase()).unwrap();

        let keys = InlineX509KeyInfoResolver
            .resolve_keys(&key_info.borrow())
            .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].same_public_key(&first));
        assert!(keys[1].same_public_key(&second));
    }

    #[test]
    fn key_name_is_applied() {
        let key_info = KeyInfo::from_key(&ec_key(13).public()).unwrap();
        let name = KeyName::build();
        name.borrow_mut().set_value(Some("idp-signing"));
        key_info.borrow_mut().push(name.erase()).unwrap();
        let keys = InlineX509KeyInfoResolver
            .resolve_keys(&key_info.borrow())
            .unwrap();
        assert_eq!(keys[0].name.as_deref(), Some("idp-signing"));
    }

    #[test]
    fn crls_and_empty_certificates() {
        let key_info = KeyInfo::build();
        let data = X509Data::build();
        data.borrow_mut().push_crl(&[1, 2, 3]).unwrap();
        key_info.borrow_mut().push(data.erase()).unwrap();
        let resolver = InlineX509KeyInfoResolver;
        let info = key_info.borrow();
        assert_eq!(resolver.resolve_crls(&info).unwrap(), vec![vec![1u8, 2, 3]]);
        assert!(resolver.resolve_certificates(&info).unwrap().is_empty());
        assert!(resolver.resolve_entity_certificate(&info).unwrap().is_none());
        assert!(resolver.resolve_keys(&info).unwrap().is_empty());
    }

    #[test]
    fn garbage_certificate_is_an_error() {
        let key_info = KeyInfo::from_certificates(&[vec![0xde, 0xad]]).unwrap();
        assert!(InlineX509KeyInfoResolver
            .resolve_keys(&key_info.borrow())
            .is_err());
    }
}
