#![forbid(unsafe_code)]

//! SAML 1.x/2.0 object model with XML signature support.
//!
//! The member crates are re-exported under short names. [`default_registry`]
//! returns a provider registry covering every element type they define.

pub use samling_c14n as c14n;
pub use samling_core as core;
pub use samling_crypto as crypto;
pub use samling_dsig as dsig;
pub use samling_keys as keys;
pub use samling_saml as saml;
pub use samling_security as security;
pub use samling_xml as xml;
pub use samling_xmlobject as xmlobject;

use samling_core::{algorithm, Result};
use samling_keys::{Key, KeyData};
use samling_xmlobject::{
    ObjectProvider, UnmarshallingPolicy, XmlObjectProviderRegistry, XmlObjectRef, XsAny, XsString,
};

/// A registry with the schema, XML-DSig, SAML 1.x and SAML 2.0 providers.
pub fn default_registry() -> XmlObjectProviderRegistry {
    let mut registry = XmlObjectProviderRegistry::new();
    registry.register(XsString::type_name(), ObjectProvider::of::<XsString>());
    registry.register(XsAny::type_name(), ObjectProvider::of::<XsAny>());
    samling_dsig::register(&mut registry);
    samling_saml::register(&mut registry);
    registry
}

/// Parse `xml` and unmarshall its document element.
pub fn unmarshall_str(
    registry: &XmlObjectProviderRegistry,
    xml: &str,
    policy: UnmarshallingPolicy,
) -> Result<XmlObjectRef> {
    let root = samling_xml::parse(xml)?;
    registry.unmarshall(&root, policy)
}

/// The signature algorithm used for `key` when none is configured.
pub fn default_signature_algorithm(key: &Key) -> &'static str {
    match key.data {
        KeyData::Rsa { .. } => algorithm::RSA_SHA256,
        KeyData::EcP256 { .. } => algorithm::ECDSA_SHA256,
        KeyData::EcP384 { .. } => algorithm::ECDSA_SHA384,
        KeyData::Hmac(_) => algorithm::HMAC_SHA256,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samling_saml::saml2;
    use samling_xmlobject::XmlObjectType;

    #[test]
    fn default_registry_covers_every_family() {
        let registry = default_registry();
        for name in [
            saml2::Assertion::default_element_name(),
            saml2::Response::default_element_name(),
            samling_saml::saml1::Assertion::default_element_name(),
            samling_dsig::signature::element_name(),
            samling_dsig::KeyInfo::default_element_name(),
            XsString::type_name(),
        ] {
            assert!(registry.lookup(&name).is_some(), "{name}");
        }
    }

    #[test]
    fn unknown_root_is_builder_not_found() {
        let registry = default_registry();
        let err = unmarshall_str(&registry, "<x:Nope xmlns:x=\"urn:x\"/>", UnmarshallingPolicy::lenient())
            .unwrap_err();
        assert!(matches!(err, samling_core::Error::BuilderNotFound(_)));
    }
}
