#![forbid(unsafe_code)]

//! Digest and signature algorithms for XML signatures over SAML objects.
//!
//! Algorithms are looked up by their XML-DSig URI.

pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{SignatureMethod, SigningKey};
