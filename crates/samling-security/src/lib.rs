#![forbid(unsafe_code)]

//! Signature trust evaluation for samling.
//!
//! Three engines share the [`SignatureTrustEngine`] contract:
//!
//! - [`BasicSignatureTrustEngine`] trusts the keys of a KeyInfo the
//!   caller already trusts.
//! - [`BasicX509SignatureTrustEngine`] trusts one [`X509Credential`].
//! - [`PkixSignatureTrustEngine`] takes candidate keys from untrusted
//!   KeyInfo and requires a certificate path to a configured anchor.

pub mod basic;
pub mod credential;
pub mod engine;
pub mod pkix;
pub mod pkix_info;
pub mod x509;

pub use basic::BasicSignatureTrustEngine;
pub use credential::{KeyInfoSource, StaticKeyInfoSource, X509Credential};
pub use engine::SignatureTrustEngine;
pub use pkix::PkixSignatureTrustEngine;
pub use pkix_info::{
    PkixValidationInformation, PkixValidationInformationResolver,
    StaticPkixValidationInformationResolver,
};
pub use x509::BasicX509SignatureTrustEngine;
