#![forbid(unsafe_code)]

//! Serializing the owned DOM to text.
//!
//! Namespace declarations already in scope with the same binding are not
//! repeated, and missing declarations for element and attribute prefixes
//! are added where they are first needed.

use crate::dom::{Element, Namespace, Node};
use crate::escape::{escape_attr, escape_text};

/// Serialize `root` without an XML declaration.
pub fn to_string(root: &Element) -> String {
    let mut out = String::new();
    let mut scope = Vec::new();
    write_element(&mut out, root, &mut scope);
    out
}

/// Serialize `root` as a standalone document with an XML declaration.
pub fn to_document_string(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&to_string(root));
    out
}

fn lookup<'a>(scope: &'a [Namespace], prefix: &str) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|n| n.prefix == prefix)
        .map(|n| n.uri.as_str())
}

/// Add `prefix` → `uri` to `decls` unless it is already bound that way.
fn require(scope: &[Namespace], decls: &mut Vec<Namespace>, prefix: &str, uri: &str) {
    if lookup(decls, prefix).is_some() {
        return;
    }
    let bound = lookup(scope, prefix).unwrap_or("");
    if bound != uri {
        decls.push(Namespace::new(prefix, uri));
    }
}

fn write_element(out: &mut String, el: &Element, scope: &mut Vec<Namespace>) {
    let name = el.name();
    let attributes = el.attributes();

    let mut decls: Vec<Namespace> = el
        .namespaces()
        .into_iter()
        .filter(|n| lookup(scope, &n.prefix) != Some(n.uri.as_str()))
        .filter(|n| !(n.prefix.is_empty() && n.uri.is_empty() && lookup(scope, "").is_none()))
        .collect();

    let element_prefix = name.prefix().unwrap_or("");
    require(scope, &mut decls, element_prefix, name.namespace_uri());

    let mut generated = 0usize;
    let mut attr_names = Vec::with_capacity(attributes.len());
    for attr in &attributes {
        if !attr.name.has_namespace() {
            attr_names.push(attr.name.local_name().to_owned());
            continue;
        }
        let prefix = match attr.name.prefix() {
            Some(p) if p != "xml" => p.to_owned(),
            Some(p) => {
                attr_names.push(format!("{p}:{}", attr.name.local_name()));
                continue;
            }
            None => {
                generated += 1;
                format!("ns{generated}")
            }
        };
        require(scope, &mut decls, &prefix, attr.name.namespace_uri());
        attr_names.push(format!("{prefix}:{}", attr.name.local_name()));
    }

    let qname = name.to_prefixed_string();
    out.push('<');
    out.push_str(&qname);
    for decl in &decls {
        if decl.prefix.is_empty() {
            out.push_str(&format!(" xmlns=\"{}\"", escape_attr(&decl.uri)));
        } else {
            out.push_str(&format!(" xmlns:{}=\"{}\"", decl.prefix, escape_attr(&decl.uri)));
        }
    }
    for (attr, qualified) in attributes.iter().zip(&attr_names) {
        out.push_str(&format!(" {qualified}=\"{}\"", escape_attr(&attr.value)));
    }

    let children = el.children();
    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    let depth = scope.len();
    scope.extend(decls);
    for child in &children {
        match child {
            Node::Element(e) => write_element(out, e, scope),
            Node::Text(t) => out.push_str(&escape_text(t)),
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
        }
    }
    scope.truncate(depth);

    out.push_str("</");
    out.push_str(&qname);
    out.push('>');
}
