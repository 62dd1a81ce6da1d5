#![forbid(unsafe_code)]

//! XML Digital Signature objects for samling.
//!
//! Provides the typed `<ds:Signature>` and `<ds:KeyInfo>` nodes, the
//! signer that fills marshalled signatures in, and the validator that
//! checks them against a candidate key.

pub mod context;
pub mod keyinfo;
pub mod reference;
pub mod resolver;
pub mod sign;
pub mod signature;
pub mod verify;

pub use context::SigningContext;
pub use keyinfo::{
    EcKeyValue, Exponent, KeyInfo, KeyName, KeyValue, Modulus, NamedCurve, PublicKey,
    RsaKeyValue, X509Certificate, X509Crl, X509Data,
};
pub use resolver::{InlineX509KeyInfoResolver, KeyInfoResolver, X509KeyInfoResolver};
pub use sign::{sign_object, sign_objects};
pub use signature::Signature;
pub use verify::{validate_raw, SignatureValidator};

use samling_xmlobject::{XmlObjectProviderRegistry, XmlObjectType};

/// Register the signature and KeyInfo node types.
pub fn register(registry: &mut XmlObjectProviderRegistry) {
    registry.register(signature::element_name(), signature::provider());
    registry.register_type::<KeyInfo>(KeyInfo::default_element_name());
    registry.register_type::<KeyName>(KeyName::default_element_name());
    registry.register_type::<KeyValue>(KeyValue::default_element_name());
    registry.register_type::<RsaKeyValue>(RsaKeyValue::default_element_name());
    registry.register_type::<Modulus>(Modulus::default_element_name());
    registry.register_type::<Exponent>(Exponent::default_element_name());
    registry.register_type::<EcKeyValue>(EcKeyValue::default_element_name());
    registry.register_type::<NamedCurve>(NamedCurve::default_element_name());
    registry.register_type::<PublicKey>(PublicKey::default_element_name());
    registry.register_type::<X509Data>(X509Data::default_element_name());
    registry.register_type::<X509Certificate>(X509Certificate::default_element_name());
    registry.register_type::<X509Crl>(X509Crl::default_element_name());
}
