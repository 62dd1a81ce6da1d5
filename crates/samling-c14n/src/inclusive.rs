#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0) over an element subtree.
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! The apex element renders every namespace in scope, including bindings
//! inherited from ancestors outside the subtree; descendants render only
//! bindings that differ from their nearest rendered ancestor.

use crate::render::{self, NsDecl, Scope};
use crate::C14nOptions;
use samling_xml::{Element, Node};

pub fn canonicalize(root: &Element, with_comments: bool, options: &C14nOptions) -> Vec<u8> {
    let mut ctx = C14nContext {
        with_comments,
        options,
        output: Vec::new(),
    };
    let inherited = render::scope_from(&options.inherited_namespaces);
    ctx.process_element(root, &inherited, &Scope::new());
    ctx.output
}

struct C14nContext<'a> {
    with_comments: bool,
    options: &'a C14nOptions,
    output: Vec<u8>,
}

impl C14nContext<'_> {
    fn process_element(&mut self, el: &Element, parent_scope: &Scope, rendered: &Scope) {
        if self.options.is_excluded(el) {
            return;
        }
        let scope = render::element_scope(parent_scope, el);

        let mut decls: Vec<NsDecl> = scope
            .iter()
            .filter(|(prefix, uri)| rendered.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();
        if !scope.contains_key("") && rendered.contains_key("") {
            decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }

        render::write_start_tag(&mut self.output, el, decls);
        for child in el.children() {
            match child {
                Node::Element(c) => self.process_element(&c, &scope, &scope),
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
