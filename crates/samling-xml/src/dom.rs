#![forbid(unsafe_code)]

//! Owned, mutable DOM.
//!
//! Elements are shared handles (`Rc<RefCell<..>>`): cloning an [`Element`]
//! clones the handle, not the tree. Identity is checked with
//! [`Element::ptr_eq`]; `==` compares structure.

use samling_core::QName;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A namespace declaration (`xmlns` / `xmlns:prefix`). An empty prefix is
/// the default namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A child node of an element.
#[derive(Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => e.fmt(f),
            Node::Text(t) => write!(f, "Text({t:?})"),
            Node::Comment(c) => write!(f, "Comment({c:?})"),
        }
    }
}

#[derive(Clone)]
struct ElementData {
    name: QName,
    namespaces: Vec<Namespace>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

/// A shared handle to an element.
#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

impl Element {
    pub fn new(name: QName) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        })))
    }

    /// Create an element and declare its own prefix (or the default
    /// namespace) on it.
    pub fn new_declared(name: QName) -> Self {
        let el = Self::new(name.clone());
        if name.has_namespace() {
            el.declare_namespace(name.prefix().unwrap_or(""), name.namespace_uri());
        }
        el
    }

    pub fn name(&self) -> QName {
        self.0.borrow().name.clone()
    }

    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.0.borrow().name.is(namespace, local_name)
    }

    /// Whether both handles point at the same element.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ── Namespaces ───────────────────────────────────────────────────

    /// Namespace declarations made on this element.
    pub fn namespaces(&self) -> Vec<Namespace> {
        self.0.borrow().namespaces.clone()
    }

    /// Declare `prefix` → `uri` on this element, replacing an existing
    /// declaration of the same prefix.
    pub fn declare_namespace(&self, prefix: &str, uri: &str) {
        let mut data = self.0.borrow_mut();
        if let Some(ns) = data.namespaces.iter_mut().find(|ns| ns.prefix == prefix) {
            ns.uri = uri.to_owned();
        } else {
            data.namespaces.push(Namespace::new(prefix, uri));
        }
    }

    /// The URI bound to `prefix` by a declaration on this element.
    pub fn declared_namespace(&self, prefix: &str) -> Option<String> {
        self.0
            .borrow()
            .namespaces
            .iter()
            .find(|ns| ns.prefix == prefix)
            .map(|ns| ns.uri.clone())
    }

    // ── Attributes ───────────────────────────────────────────────────

    pub fn attributes(&self) -> Vec<Attribute> {
        self.0.borrow().attributes.clone()
    }

    pub fn attribute(&self, name: &QName) -> Option<String> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|a| a.name == *name)
            .map(|a| a.value.clone())
    }

    /// Value of an unqualified attribute.
    pub fn attribute_local(&self, local_name: &str) -> Option<String> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|a| a.name.is("", local_name))
            .map(|a| a.value.clone())
    }

    pub fn set_attribute(&self, name: QName, value: impl Into<String>) {
        let value = value.into();
        let mut data = self.0.borrow_mut();
        if let Some(a) = data.attributes.iter_mut().find(|a| a.name == name) {
            a.name = name;
            a.value = value;
        } else {
            data.attributes.push(Attribute::new(name, value));
        }
    }

    /// Set an unqualified attribute.
    pub fn set_attribute_local(&self, local_name: &str, value: impl Into<String>) {
        self.set_attribute(QName::local(local_name), value);
    }

    pub fn remove_attribute(&self, name: &QName) -> Option<String> {
        let mut data = self.0.borrow_mut();
        let pos = data.attributes.iter().position(|a| a.name == *name)?;
        Some(data.attributes.remove(pos).value)
    }

    // ── Children ─────────────────────────────────────────────────────

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_elements(&self) -> Vec<Element> {
        self.0
            .borrow()
            .children
            .iter()
            .filter_map(|n| match n {
                Node::Element(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_child_elements(&self) -> bool {
        self.0
            .borrow()
            .children
            .iter()
            .any(|n| matches!(n, Node::Element(_)))
    }

    /// First child element named `{namespace}local_name`.
    pub fn first_child(&self, namespace: &str, local_name: &str) -> Option<Element> {
        self.child_elements()
            .into_iter()
            .find(|e| e.is(namespace, local_name))
    }

    /// All child elements named `{namespace}local_name`, in document order.
    pub fn children_named(&self, namespace: &str, local_name: &str) -> Vec<Element> {
        self.child_elements()
            .into_iter()
            .filter(|e| e.is(namespace, local_name))
            .collect()
    }

    pub fn append_child(&self, child: Element) {
        self.0.borrow_mut().children.push(Node::Element(child));
    }

    pub fn append_text(&self, text: &str) {
        self.0.borrow_mut().children.push(Node::Text(text.to_owned()));
    }

    pub fn append_comment(&self, text: &str) {
        self.0
            .borrow_mut()
            .children
            .push(Node::Comment(text.to_owned()));
    }

    /// Append a child element and return it.
    pub fn append_new(&self, name: QName) -> Element {
        let child = Element::new(name);
        self.append_child(child.clone());
        child
    }

    /// Insert `child` before the first child element, or at the end when
    /// there is none.
    pub fn prepend_child(&self, child: Element) {
        let mut data = self.0.borrow_mut();
        let pos = data
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(_)))
            .unwrap_or(data.children.len());
        data.children.insert(pos, Node::Element(child));
    }

    /// Remove `child` (by identity). Returns whether it was found.
    pub fn remove_child(&self, child: &Element) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.children.len();
        data.children
            .retain(|n| !matches!(n, Node::Element(e) if e.ptr_eq(child)));
        before != data.children.len()
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        let data = self.0.borrow();
        let mut out = String::new();
        for n in &data.children {
            if let Node::Text(t) = n {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace every child node with a single text node.
    pub fn set_text(&self, text: &str) {
        let mut data = self.0.borrow_mut();
        data.children.clear();
        if !text.is_empty() {
            data.children.push(Node::Text(text.to_owned()));
        }
    }

    // ── Tree queries ─────────────────────────────────────────────────

    /// Depth-first pre-order list of this element and its descendants.
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(el) = stack.pop() {
            let children = el.child_elements();
            out.push(el);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// First descendant (or self) named `{namespace}local_name`.
    pub fn find(&self, namespace: &str, local_name: &str) -> Option<Element> {
        self.descendants()
            .into_iter()
            .find(|e| e.is(namespace, local_name))
    }

    /// First descendant (or self) carrying an unqualified attribute named
    /// one of `id_attrs` with value `id`.
    pub fn find_by_id(&self, id: &str, id_attrs: &[&str]) -> Option<Element> {
        self.descendants().into_iter().find(|e| {
            id_attrs
                .iter()
                .any(|attr| e.attribute_local(attr).as_deref() == Some(id))
        })
    }

    /// The chain of elements from `self` down to `target`, both inclusive.
    pub fn path_to(&self, target: &Element) -> Option<Vec<Element>> {
        if self.ptr_eq(target) {
            return Some(vec![self.clone()]);
        }
        for child in self.child_elements() {
            if let Some(mut path) = child.path_to(target) {
                path.insert(0, self.clone());
                return Some(path);
            }
        }
        None
    }

    /// Namespace bindings in scope at `target`, contributed by the
    /// declarations on its ancestors within this subtree (nearest wins).
    /// Declarations on `target` itself are not included.
    pub fn inherited_namespaces(&self, target: &Element) -> Vec<Namespace> {
        let mut scope: Vec<Namespace> = Vec::new();
        if let Some(path) = self.path_to(target) {
            for el in &path[..path.len() - 1] {
                for ns in el.namespaces() {
                    scope.retain(|n| n.prefix != ns.prefix);
                    scope.push(ns);
                }
            }
        }
        scope
    }

    /// A detached deep copy of this element.
    pub fn deep_clone(&self) -> Element {
        let data = self.0.borrow();
        let copy = Element(Rc::new(RefCell::new(ElementData {
            name: data.name.clone(),
            namespaces: data.namespaces.clone(),
            attributes: data.attributes.clone(),
            children: Vec::new(),
        })));
        for n in &data.children {
            let child = match n {
                Node::Element(e) => Node::Element(e.deep_clone()),
                other => other.clone(),
            };
            copy.0.borrow_mut().children.push(child);
        }
        copy
    }
}

/// Structural equality: same name (prefix ignored), same attribute set, same
/// namespace declaration set, and equal children in order.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.0.borrow();
        let b = other.0.borrow();
        if a.name != b.name
            || a.attributes.len() != b.attributes.len()
            || a.namespaces.len() != b.namespaces.len()
            || a.children.len() != b.children.len()
        {
            return false;
        }
        let attrs_match = a.attributes.iter().all(|x| {
            b.attributes
                .iter()
                .any(|y| y.name == x.name && y.value == x.value)
        });
        let ns_match = a.namespaces.iter().all(|x| b.namespaces.contains(x));
        attrs_match && ns_match && a.children == b.children
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Element")
            .field("name", &data.name)
            .field("attributes", &data.attributes)
            .field("children", &data.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(local: &str) -> QName {
        QName::with_prefix("urn:test", local, "t")
    }

    #[test]
    fn set_attribute_replaces_existing() {
        let el = Element::new(q("a"));
        el.set_attribute_local("ID", "one");
        el.set_attribute_local("ID", "two");
        assert_eq!(el.attributes().len(), 1);
        assert_eq!(el.attribute_local("ID").as_deref(), Some("two"));
    }

    #[test]
    fn clone_shares_identity() {
        let el = Element::new(q("a"));
        let other = el.clone();
        other.set_text("x");
        assert!(el.ptr_eq(&other));
        assert_eq!(el.text(), "x");
    }

    #[test]
    fn structural_equality_ignores_attribute_order() {
        let a = Element::new(q("a"));
        a.set_attribute_local("x", "1");
        a.set_attribute_local("y", "2");
        let b = Element::new(q("a"));
        b.set_attribute_local("y", "2");
        b.set_attribute_local("x", "1");
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        b.append_text("t");
        assert_ne!(a, b);
    }

    #[test]
    fn deep_clone_is_detached() {
        let root = Element::new(q("root"));
        let child = root.append_new(q("child"));
        let copy = root.deep_clone();
        assert_eq!(root, copy);
        child.set_text("changed");
        assert_ne!(root, copy);
    }

    #[test]
    fn path_and_inherited_namespaces() {
        let root = Element::new_declared(q("root"));
        root.declare_namespace("x", "urn:x");
        let mid = root.append_new(q("mid"));
        mid.declare_namespace("x", "urn:x2");
        let leaf = mid.append_new(q("leaf"));
        let path = root.path_to(&leaf).unwrap();
        assert_eq!(path.len(), 3);
        let scope = root.inherited_namespaces(&leaf);
        assert!(scope.contains(&Namespace::new("x", "urn:x2")));
        assert!(scope.contains(&Namespace::new("t", "urn:test")));
        assert!(!scope.contains(&Namespace::new("x", "urn:x")));
    }

    #[test]
    fn find_by_id_searches_descendants() {
        let root = Element::new(q("root"));
        let child = root.append_new(q("child"));
        child.set_attribute_local("ID", "_abc");
        let found = root.find_by_id("_abc", &["ID", "Id"]).unwrap();
        assert!(found.ptr_eq(&child));
        assert!(root.find_by_id("_nope", &["ID"]).is_none());
    }

    #[test]
    fn remove_child_by_identity() {
        let root = Element::new(q("root"));
        let a = root.append_new(q("a"));
        let b = root.append_new(q("a"));
        assert!(root.remove_child(&a));
        assert_eq!(root.child_elements().len(), 1);
        assert!(root.child_elements()[0].ptr_eq(&b));
    }
}
