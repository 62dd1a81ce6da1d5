#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized if its prefix is used by the element's tag name or
//! one of its attributes, or appears in the InclusiveNamespaces PrefixList.

use crate::render::{self, NsDecl, Scope};
use crate::C14nOptions;
use samling_xml::{Element, Node};

pub fn canonicalize(root: &Element, with_comments: bool, options: &C14nOptions) -> Vec<u8> {
    let mut ctx = ExcC14nContext {
        with_comments,
        options,
        output: Vec::new(),
    };
    let inherited = render::scope_from(&options.inherited_namespaces);
    ctx.process_element(root, &inherited, &Scope::new());
    ctx.output
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    options: &'a C14nOptions,
    output: Vec<u8>,
}

impl ExcC14nContext<'_> {
    fn process_element(&mut self, el: &Element, parent_scope: &Scope, rendered: &Scope) {
        if self.options.is_excluded(el) {
            return;
        }
        let scope = render::element_scope(parent_scope, el);

        let mut prefixes = render::utilized_prefixes(el);
        for p in &self.options.inclusive_prefixes {
            let p = if p == "#default" { "" } else { p.as_str() };
            if !prefixes.iter().any(|x| x == p) {
                prefixes.push(p.to_owned());
            }
        }

        let mut decls = Vec::new();
        for prefix in &prefixes {
            match scope.get(prefix) {
                Some(uri) if rendered.get(prefix) != Some(uri) => decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                // An unbound default namespace only needs `xmlns=""` when a
                // non-empty default was rendered further up.
                None if prefix.is_empty() && rendered.contains_key("") => decls.push(NsDecl {
                    prefix: String::new(),
                    uri: String::new(),
                }),
                None => {}
            }
        }

        let mut child_rendered = rendered.clone();
        for decl in &decls {
            if decl.uri.is_empty() {
                child_rendered.remove(&decl.prefix);
            } else {
                child_rendered.insert(decl.prefix.clone(), decl.uri.clone());
            }
        }

        render::write_start_tag(&mut self.output, el, decls);
        for child in el.children() {
            match child {
                Node::Element(c) => self.process_element(&c, &scope, &child_rendered),
                Node::Text(t) => render::write_text(&mut self.output, &t),
                Node::Comment(c) if self.with_comments => {
                    render::write_comment(&mut self.output, &c)
                }
                Node::Comment(_) => {}
            }
        }
        render::write_end_tag(&mut self.output, el);
    }
}

#[cfg(test)]
mod tests {
    use crate::{canonicalize, C14nMode, C14nOptions};
    use samling_xml::parse;

    fn exc(xml: &str, options: &C14nOptions) -> String {
        let root = parse(xml).unwrap();
        String::from_utf8(canonicalize(&root, C14nMode::Exclusive, options)).unwrap()
    }

    #[test]
    fn unused_namespaces_are_dropped() {
        let out = exc(
            r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b"><a:c z="1" y="2"/></a:r>"#,
            &C14nOptions::default(),
        );
        assert_eq!(out, r#"<a:r xmlns:a="urn:a"><a:c y="2" z="1"></a:c></a:r>"#);
    }

    #[test]
    fn inclusive_prefix_list_is_honoured() {
        let options = C14nOptions {
            inclusive_prefixes: vec!["b".into()],
            ..C14nOptions::default()
        };
        let out = exc(r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b">x</a:r>"#, &options);
        assert_eq!(out, r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b">x</a:r>"#);
    }

    #[test]
    fn subtree_uses_inherited_bindings() {
        let root = parse(r#"<a:r xmlns:a="urn:a"><a:c>t</a:c></a:r>"#).unwrap();
        let child = root.child_elements().remove(0);
        let out = canonicalize(&child, C14nMode::Exclusive, &C14nOptions::default());
        assert_eq!(out, br#"<a:c xmlns:a="urn:a">t</a:c>"#);
    }

    #[test]
    fn excluded_subtree_is_skipped() {
        let root = parse(r#"<r><s>gone</s><k>kept</k></r>"#).unwrap();
        let s = root.child_elements().remove(0);
        let options = C14nOptions {
            exclude: Some(s),
            ..C14nOptions::default()
        };
        let out = canonicalize(&root, C14nMode::Exclusive, &options);
        assert_eq!(out, b"<r><k>kept</k></r>");
    }

    #[test]
    fn comments_only_with_comments_mode() {
        let root = parse("<r><!--c-->t</r>").unwrap();
        let plain = canonicalize(&root, C14nMode::Exclusive, &C14nOptions::default());
        let commented =
            canonicalize(&root, C14nMode::ExclusiveWithComments, &C14nOptions::default());
        assert_eq!(plain, b"<r>t</r>");
        assert_eq!(commented, b"<r><!--c-->t</r>");
    }
}
