#![forbid(unsafe_code)]

//! Owned XML DOM for the samling SAML object model.
//!
//! Parsing goes through `roxmltree` and is converted into a mutable,
//! reference-counted tree that marshallers can build and the signer can
//! update in place.

pub mod document;
pub mod dom;
pub mod escape;
pub mod writer;

pub use document::{parse, parse_bytes};
pub use dom::{Attribute, Element, Namespace, Node};

/// Return roxmltree parsing options.
///
/// DTDs are refused: SAML messages never carry one and entity
/// declarations in inbound protocol messages are an attack surface.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
