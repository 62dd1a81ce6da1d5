#![forbid(unsafe_code)]

//! Parsing XML text into the owned DOM.

use crate::dom::{Element, Namespace};
use samling_core::{ns, Error, QName};

/// Parse XML text and return its document element.
pub fn parse(text: &str) -> Result<Element, Error> {
    let doc = roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))?;
    Ok(convert(doc.root_element()))
}

/// Parse UTF-8 bytes and return the document element.
pub fn parse_bytes(data: &[u8]) -> Result<Element, Error> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
    parse(text)
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = match tag.namespace() {
        Some(uri) => QName::with_prefix(uri, tag.name(), node.lookup_prefix(uri).unwrap_or("")),
        None => QName::local(tag.name()),
    };
    let element = Element::new(name);

    for decl in declared_namespaces(node) {
        element.declare_namespace(&decl.prefix, &decl.uri);
    }

    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(uri) => QName::with_prefix(uri, attr.name(), attribute_prefix(node, uri)),
            None => QName::local(attr.name()),
        };
        element.set_attribute(name, attr.value());
    }

    for child in node.children() {
        if child.is_element() {
            element.append_child(convert(child));
        } else if child.is_text() {
            element.append_text(child.text().unwrap_or(""));
        } else if child.is_comment() {
            element.append_comment(child.text().unwrap_or(""));
        }
    }
    element
}

/// Namespaces in scope on `node` that are not in scope, with the same
/// binding, on its parent element.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<Namespace> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|n| (n.name(), n.uri())).collect())
        .unwrap_or_default();
    node.namespaces()
        .filter(|n| n.name() != Some("xml"))
        .filter(|n| !inherited.contains(&(n.name(), n.uri())))
        .map(|n| Namespace::new(n.name().unwrap_or(""), n.uri()))
        .collect()
}

/// Namespaced attributes need a non-empty prefix.
fn attribute_prefix(node: roxmltree::Node<'_, '_>, uri: &str) -> String {
    if uri == ns::XML {
        return "xml".to_owned();
    }
    node.namespaces()
        .find(|n| n.uri() == uri && n.name().is_some())
        .and_then(|n| n.name())
        .unwrap_or("")
        .to_owned()
}
