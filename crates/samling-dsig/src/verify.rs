#![forbid(unsafe_code)]

//! XML-DSig signature validation.
//!
//! Processing order:
//! 1. Read `<SignedInfo>` and its SignatureMethod
//! 2. For each `<Reference>`: resolve, transform, digest, compare
//! 3. Canonicalize `<SignedInfo>`
//! 4. Verify `<SignatureValue>` with the candidate key

use crate::keyinfo::decode_base64;
use crate::reference::{algorithm_of, canonical_signed_info, dsig_child, reference_digest};
use crate::sign::document_root;
use crate::signature::Signature;
use samling_core::{ns, Error, Result};
use samling_crypto::SignatureMethod;
use samling_keys::Key;
use samling_xml::Element;
use samling_xmlobject::XmlHandle;

const HMAC_OUTPUT_LENGTH: &str = "HMACOutputLength";

/// Checks signatures against one candidate key.
///
/// `Ok(false)` means the signature does not verify with this key: a
/// digest mismatch, a key of the wrong type, or a bad signature value.
/// Errors are reserved for documents that cannot be processed at all.
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    key: Key,
}

impl SignatureValidator {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Validate a signature node against the DOM of its document.
    pub fn validate(&self, signature: &XmlHandle<Signature>) -> Result<bool> {
        let element = signature.dom().ok_or_else(|| {
            Error::IllegalState("Signature has no DOM; it must be marshalled or unmarshalled".into())
        })?;
        let root = document_root(&signature.erase())?;
        self.validate_element(&root, &element)
    }

    /// Validate the `<ds:Signature>` element `signature` found in the
    /// document rooted at `root`.
    pub fn validate_element(&self, root: &Element, signature: &Element) -> Result<bool> {
        let signed_info = dsig_child(signature, ns::node::SIGNED_INFO)?;
        let method_element = dsig_child(&signed_info, ns::node::SIGNATURE_METHOD)?;
        if method_element.first_child(ns::DSIG, HMAC_OUTPUT_LENGTH).is_some() {
            return Err(Error::Security("truncated HMAC output is not accepted".into()));
        }
        let method = SignatureMethod::from_uri(&algorithm_of(&method_element)?)?;
        let key = self.key.to_signing_key();
        if !method.accepts(&key) {
            tracing::debug!(
                algorithm = method.uri(),
                key = ?self.key.data,
                "key does not match the signature algorithm"
            );
            return Ok(false);
        }

        let references = signed_info.children_named(ns::DSIG, ns::node::REFERENCE);
        if references.is_empty() {
            return Err(Error::MissingElement("Reference".into()));
        }
        for reference in &references {
            let computed = reference_digest(root, signature, reference)?;
            let stored = dsig_child(reference, ns::node::DIGEST_VALUE)?.text();
            if decode_base64(&stored, "DigestValue")? != computed {
                tracing::debug!(
                    uri = %reference.attribute_local(ns::attr::URI).unwrap_or_default(),
                    "reference digest mismatch"
                );
                return Ok(false);
            }
        }

        let value = dsig_child(signature, ns::node::SIGNATURE_VALUE)?.text();
        let value = decode_base64(&value, "SignatureValue")?;
        let octets = canonical_signed_info(root, &signed_info)?;
        let valid = method.verify(&key, &octets, &value)?;
        tracing::debug!(algorithm = method.uri(), valid, "checked signature value");
        Ok(valid)
    }
}

/// Verify a detached signature value over `content`.
///
/// A key that does not fit `algorithm` yields `Ok(false)`.
pub fn validate_raw(signature: &[u8], content: &[u8], algorithm: &str, key: &Key) -> Result<bool> {
    let method = SignatureMethod::from_uri(algorithm)?;
    let key = key.to_signing_key();
    if !method.accepts(&key) {
        return Ok(false);
    }
    method.verify(&key, content, signature)
}
