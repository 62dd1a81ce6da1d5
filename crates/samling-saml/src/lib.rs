#![forbid(unsafe_code)]

//! SAML element types for samling.
//!
//! [`saml2`] holds the SAML 2.0 assertion and protocol types and
//! [`saml1`] the SAML 1.x assertion types. [`register`] adds both to a
//! provider registry; the XML-DSig and schema types they embed must be
//! registered alongside.

pub mod datetime;
pub mod saml1;
pub mod saml2;
pub mod version;

pub use version::SamlVersion;

use samling_xmlobject::XmlObjectProviderRegistry;

/// Register the SAML 1.x and SAML 2.0 element types.
pub fn register(registry: &mut XmlObjectProviderRegistry) {
    saml1::register(registry);
    saml2::register(registry);
}

#[cfg(test)]
pub(crate) mod tests {
    use samling_keys::loader::load_pem;
    use samling_keys::Key;
    use samling_xmlobject::{ObjectProvider, XmlObjectProviderRegistry, XsAny, XsString};

    pub(crate) fn registry() -> XmlObjectProviderRegistry {
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register(XsString::type_name(), ObjectProvider::of::<XsString>());
        registry.register(XsAny::type_name(), ObjectProvider::of::<XsAny>());
        samling_dsig::register(&mut registry);
        super::register(&mut registry);
        registry
    }

    /// The EC P-256 key of the fixture leaf certificate.
    pub(crate) fn signing_key() -> Key {
        load_pem(include_bytes!("../../samling-keys/testdata/leaf-key.pem")).unwrap()
    }
}
