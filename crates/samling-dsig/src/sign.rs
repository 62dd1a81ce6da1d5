#![forbid(unsafe_code)]

//! Computing signatures over marshalled objects.
//!
//! Signing works on the DOM cached by marshalling: the document must be
//! marshalled from its root first, which lays out every `<ds:Signature>`
//! with empty values. Digests and signature values are then written into
//! that DOM in place.

use crate::keyinfo::B64;
use crate::reference::{canonical_signed_info, dsig_child, reference_digest};
use crate::signature::Signature;
use base64::Engine;
use samling_core::{ns, Error, Result};
use samling_crypto::SignatureMethod;
use samling_xml::Element;
use samling_xmlobject::{XmlHandle, XmlObjectRef};

/// The cached DOM of the topmost ancestor of `object`.
pub(crate) fn document_root(object: &XmlObjectRef) -> Result<Element> {
    let mut top = object.clone();
    while let Some(parent) = top.parent() {
        top = parent;
    }
    top.dom().ok_or_else(|| {
        Error::IllegalState(format!(
            "{} has not been marshalled; marshall the document before signing or validating",
            top.element_name()
        ))
    })
}

/// Sign each signature in order.
///
/// Later signatures see the values written by earlier ones, so an inner
/// signature must come before any signature whose reference covers it.
pub fn sign_objects(signatures: &[XmlHandle<Signature>]) -> Result<()> {
    for signature in signatures {
        sign_object(signature)?;
    }
    Ok(())
}

/// Compute the digests and the signature value of one marshalled
/// signature.
///
/// A signature read from a document rather than laid out by marshalling
/// is skipped with a warning.
pub fn sign_object(signature: &XmlHandle<Signature>) -> Result<()> {
    let (construct, context) = {
        let sig = signature.try_borrow()?;
        let Some(construct) = sig.construct().cloned() else {
            tracing::warn!("signature was not laid out by marshalling, not signing it");
            return Ok(());
        };
        (construct, sig.context().clone())
    };
    let key = context.signing_key().ok_or_else(|| {
        Error::IllegalState("SigningContext has no signing key".into())
    })?;
    let current = signature.dom().ok_or_else(|| {
        Error::IllegalState("Signature changed after marshalling; marshall it again".into())
    })?;
    if !current.ptr_eq(&construct) {
        return Err(Error::IllegalState(
            "Signature DOM was replaced after marshalling".into(),
        ));
    }
    let root = document_root(&signature.erase())?;
    if root.path_to(&construct).is_none() {
        return Err(Error::IllegalState(
            "Signature is not part of its document's DOM; marshall the document again".into(),
        ));
    }

    let method = SignatureMethod::from_uri(context.signature_algorithm())?;
    let signing_key = key.to_signing_key();
    if !method.accepts(&signing_key) {
        return Err(Error::Key(format!(
            "{} cannot be used with a {:?}",
            method.uri(),
            key.data
        )));
    }

    let signed_info = dsig_child(&construct, ns::node::SIGNED_INFO)?;
    for reference in signed_info.children_named(ns::DSIG, ns::node::REFERENCE) {
        let digest = reference_digest(&root, &construct, &reference)?;
        dsig_child(&reference, ns::node::DIGEST_VALUE)?.set_text(&B64.encode(digest));
    }
    let octets = canonical_signed_info(&root, &signed_info)?;
    let value = method.sign(&signing_key, &octets)?;
    dsig_child(&construct, ns::node::SIGNATURE_VALUE)?.set_text(&B64.encode(value));
    tracing::debug!(algorithm = method.uri(), "signed");
    Ok(())
}
