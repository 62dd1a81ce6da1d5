#![forbid(unsafe_code)]

//! Reference processing on the DOM, shared by signing and validation.
//!
//! A reference is resolved against the document root, run through its
//! transforms (enveloped-signature and the c14n family) and digested.

use samling_c14n::{C14nMode, C14nOptions};
use samling_core::{algorithm, ns, Error, Result};
use samling_crypto::DigestMethod;
use samling_xml::Element;

/// Attributes treated as element identifiers for same-document
/// references.
pub const ID_ATTRIBUTES: &[&str] = &["ID", "Id", "AssertionID", "ResponseID", "RequestID"];

/// The required `ds:` child `local_name` of `parent`.
pub(crate) fn dsig_child(parent: &Element, local_name: &str) -> Result<Element> {
    parent
        .first_child(ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.into()))
}

/// The `Algorithm` attribute of a method element.
pub(crate) fn algorithm_of(method: &Element) -> Result<String> {
    method.attribute_local(ns::attr::ALGORITHM).ok_or_else(|| {
        Error::MissingAttribute(format!("Algorithm on {}", method.name().local_name()))
    })
}

/// The exclusive c14n `InclusiveNamespaces` prefix list below `method`.
pub(crate) fn inclusive_prefixes(method: &Element) -> Vec<String> {
    method
        .first_child(ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|el| el.attribute_local(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// Find the element a same-document `uri` points at.
///
/// The empty URI is the whole document. `#id` is looked up among
/// [`ID_ATTRIBUTES`]. Anything else is rejected.
pub fn resolve_uri(root: &Element, uri: &str) -> Result<Element> {
    if uri.is_empty() {
        return Ok(root.clone());
    }
    let Some(id) = uri.strip_prefix('#') else {
        return Err(Error::InvalidUri(format!("unsupported reference URI: {uri}")));
    };
    if id.is_empty() || id.starts_with("xpointer(") {
        return Err(Error::InvalidUri(format!("unsupported reference URI: {uri}")));
    }
    root.find_by_id(id, ID_ATTRIBUTES)
        .ok_or_else(|| Error::InvalidUri(format!("no element with ID {id}")))
}

/// Digest the content referenced by `reference`, a `ds:Reference`
/// element of `signature`, within the document rooted at `root`.
pub fn reference_digest(root: &Element, signature: &Element, reference: &Element) -> Result<Vec<u8>> {
    let uri = reference.attribute_local(ns::attr::URI).unwrap_or_default();
    let target = resolve_uri(root, &uri)?;

    let mut options = C14nOptions {
        inherited_namespaces: root.inherited_namespaces(&target),
        ..C14nOptions::default()
    };
    let mut mode = C14nMode::Inclusive;
    if let Some(transforms) = reference.first_child(ns::DSIG, ns::node::TRANSFORMS) {
        for transform in transforms.children_named(ns::DSIG, ns::node::TRANSFORM) {
            let uri = algorithm_of(&transform)?;
            if uri == algorithm::ENVELOPED_SIGNATURE {
                options.exclude = Some(signature.clone());
            } else if let Some(c14n) = C14nMode::from_uri(&uri) {
                mode = c14n;
                options.inclusive_prefixes = inclusive_prefixes(&transform);
            } else {
                return Err(Error::UnsupportedAlgorithm(format!("transform: {uri}")));
            }
        }
    }

    let method = dsig_child(reference, ns::node::DIGEST_METHOD)?;
    let digest = DigestMethod::from_uri(&algorithm_of(&method)?)?;
    let octets = samling_c14n::canonicalize(&target, mode, &options);
    tracing::debug!(
        uri = %uri,
        c14n = mode.uri(),
        digest = digest.uri(),
        bytes = octets.len(),
        "digesting reference"
    );
    Ok(digest.digest(&octets))
}

/// The canonical form of `signed_info`, the octets a signature value is
/// computed over.
pub fn canonical_signed_info(root: &Element, signed_info: &Element) -> Result<Vec<u8>> {
    let method = dsig_child(signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let mode = C14nMode::require(&algorithm_of(&method)?)?;
    let options = C14nOptions {
        inclusive_prefixes: inclusive_prefixes(&method),
        inherited_namespaces: root.inherited_namespaces(signed_info),
        ..C14nOptions::default()
    };
    Ok(samling_c14n::canonicalize(signed_info, mode, &options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use samling_xml::parse;

    const DOC: &str = r#"<r:Root xmlns:r="urn:r" ID="root"><r:Item Id="item-1">one</r:Item><r:Item AssertionID="a2">two</r:Item></r:Root>"#;

    #[test]
    fn resolves_same_document_references() {
        let root = parse(DOC).unwrap();
        assert!(resolve_uri(&root, "").unwrap().ptr_eq(&root));
        assert!(resolve_uri(&root, "#root").unwrap().ptr_eq(&root));
        assert_eq!(resolve_uri(&root, "#item-1").unwrap().text(), "one");
        assert_eq!(resolve_uri(&root, "#a2").unwrap().text(), "two");
    }

    #[test]
    fn rejects_unresolvable_references() {
        let root = parse(DOC).unwrap();
        for uri in ["#missing", "http://example.org/doc", "#", "#xpointer(/)"] {
            assert!(
                matches!(resolve_uri(&root, uri), Err(Error::InvalidUri(_))),
                "{uri}"
            );
        }
    }

    #[test]
    fn unknown_transform_is_unsupported() {
        let xml = r##"<r:Root xmlns:r="urn:r" ID="x"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:Reference URI="#x"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xslt-19991116"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><ds:DigestValue/></ds:Reference></ds:SignedInfo></ds:Signature></r:Root>"##;
        let root = parse(xml).unwrap();
        let signature = root.find(ns::DSIG, ns::node::SIGNATURE).unwrap();
        let reference = signature.find(ns::DSIG, ns::node::REFERENCE).unwrap();
        assert!(matches!(
            reference_digest(&root, &signature, &reference),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn enveloped_transform_ignores_signature_content() {
        let xml = r##"<r:Root xmlns:r="urn:r" ID="x"><r:Data>d</r:Data><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:Reference URI="#x"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/><ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/><ds:DigestValue/></ds:Reference></ds:SignedInfo><ds:SignatureValue/></ds:Signature></r:Root>"##;
        let root = parse(xml).unwrap();
        let signature = root.find(ns::DSIG, ns::node::SIGNATURE).unwrap();
        let reference = signature.find(ns::DSIG, ns::node::REFERENCE).unwrap();
        let before = reference_digest(&root, &signature, &reference).unwrap();

        signature
            .find(ns::DSIG, ns::node::SIGNATURE_VALUE)
            .unwrap()
            .set_text("c2lnbmF0dXJl");
        assert_eq!(reference_digest(&root, &signature, &reference).unwrap(), before);

        root.first_child("urn:r", "Data").unwrap().set_text("changed");
        assert_ne!(reference_digest(&root, &signature, &reference).unwrap(), before);
    }

    #[test]
    fn prefix_list_is_read() {
        let xml = r#"<ds:Transform xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"><ec:InclusiveNamespaces xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#" PrefixList="xs #default"/></ds:Transform>"#;
        let transform = parse(xml).unwrap();
        assert_eq!(inclusive_prefixes(&transform), ["xs", "#default"]);
    }
}
