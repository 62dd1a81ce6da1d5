#![forbid(unsafe_code)]

//! Shared rendering for canonical output: ordering of namespace
//! declarations and attributes, start/end tags, and the in-scope namespace
//! map both variants maintain while walking down the tree.

use samling_core::ns;
use samling_xml::escape;
use samling_xml::{Element, Namespace};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    pub uri: String,
}

impl NsDecl {
    fn render(&self, out: &mut Vec<u8>) {
        let uri = escape::escape_attr(&self.uri);
        let text = if self.prefix.is_empty() {
            format!(" xmlns=\"{uri}\"")
        } else {
            format!(" xmlns:{}=\"{uri}\"", self.prefix)
        };
        out.extend_from_slice(text.as_bytes());
    }
}

/// Default namespace first, then by prefix.
impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

/// Unqualified attributes first, then by (namespace URI, local name).
impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        (!self.ns_uri.is_empty(), &self.ns_uri, &self.local_name).cmp(&(
            !other.ns_uri.is_empty(),
            &other.ns_uri,
            &other.local_name,
        ))
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Namespace bindings in scope, keyed by prefix.
pub type Scope = BTreeMap<String, String>;

pub fn scope_from(namespaces: &[Namespace]) -> Scope {
    let mut scope = Scope::new();
    for decl in namespaces {
        bind(&mut scope, &decl.prefix, &decl.uri);
    }
    scope
}

fn bind(scope: &mut Scope, prefix: &str, uri: &str) {
    if prefix == "xml" {
        return;
    }
    if uri.is_empty() {
        scope.remove(prefix);
    } else {
        scope.insert(prefix.to_owned(), uri.to_owned());
    }
}

/// Extend `parent` with the declarations on `el` and with the bindings
/// implied by the prefixes of its own name and attributes.
pub fn element_scope(parent: &Scope, el: &Element) -> Scope {
    let mut scope = parent.clone();
    for decl in el.namespaces() {
        bind(&mut scope, &decl.prefix, &decl.uri);
    }
    let name = el.name();
    bind(&mut scope, name.prefix().unwrap_or(""), name.namespace_uri());
    for attr in el.attributes() {
        if let Some(p) = attr.name.prefix() {
            bind(&mut scope, p, attr.name.namespace_uri());
        }
    }
    scope
}

/// The prefixes used by `el`'s name and attributes ("" for an unprefixed
/// element name).
pub fn utilized_prefixes(el: &Element) -> Vec<String> {
    let mut prefixes = vec![el.name().prefix().unwrap_or("").to_owned()];
    for attr in el.attributes() {
        if attr.name.namespace_uri() == ns::XML {
            continue;
        }
        if let Some(p) = attr.name.prefix() {
            if !prefixes.iter().any(|x| x == p) {
                prefixes.push(p.to_owned());
            }
        }
    }
    prefixes
}

pub fn sorted_attrs(el: &Element) -> Vec<Attr> {
    let mut attrs: Vec<Attr> = el
        .attributes()
        .into_iter()
        .map(|a| {
            let qualified_name = match a.name.prefix() {
                Some(p) if a.name.has_namespace() => format!("{p}:{}", a.name.local_name()),
                _ => a.name.local_name().to_owned(),
            };
            Attr {
                ns_uri: a.name.namespace_uri().to_owned(),
                local_name: a.name.local_name().to_owned(),
                qualified_name,
                value: a.value,
            }
        })
        .collect();
    attrs.sort();
    attrs
}

pub fn write_start_tag(out: &mut Vec<u8>, el: &Element, mut decls: Vec<NsDecl>) {
    decls.sort();
    out.push(b'<');
    out.extend_from_slice(el.name().to_prefixed_string().as_bytes());
    for decl in &decls {
        decl.render(out);
    }
    for attr in sorted_attrs(el) {
        let text = format!(
            " {}=\"{}\"",
            attr.qualified_name,
            escape::escape_attr(&attr.value)
        );
        out.extend_from_slice(text.as_bytes());
    }
    out.push(b'>');
}

pub fn write_end_tag(out: &mut Vec<u8>, el: &Element) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(el.name().to_prefixed_string().as_bytes());
    out.push(b'>');
}

pub fn write_text(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(escape::escape_text(text).as_bytes());
}

pub fn write_comment(out: &mut Vec<u8>, text: &str) {
    out.extend_from_slice(b"<!--");
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"-->");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_namespace_sorts_first() {
        let mut decls = vec![
            NsDecl { prefix: "b".into(), uri: "urn:b".into() },
            NsDecl { prefix: "".into(), uri: "urn:d".into() },
            NsDecl { prefix: "a".into(), uri: "urn:a".into() },
        ];
        decls.sort();
        let order: Vec<&str> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(order, ["", "a", "b"]);
    }

    #[test]
    fn unqualified_attributes_sort_before_qualified() {
        let a = Attr {
            ns_uri: "urn:a".into(),
            local_name: "a".into(),
            qualified_name: "p:a".into(),
            value: String::new(),
        };
        let z = Attr {
            ns_uri: String::new(),
            local_name: "z".into(),
            qualified_name: "z".into(),
            value: String::new(),
        };
        assert!(z < a);
    }
}
