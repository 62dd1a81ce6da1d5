#![forbid(unsafe_code)]

//! Keys for the samling signature layer.
//!
//! Loads RSA and EC keys from PEM, DER and X.509 certificates, and
//! validates certificate paths against trust anchors.

pub mod key;
pub mod loader;
pub mod x509;

pub use key::{Key, KeyData};
pub use x509::{
    entity_certificate_first, entity_certificate_index, validate_cert_chain, CertValidationConfig,
};
