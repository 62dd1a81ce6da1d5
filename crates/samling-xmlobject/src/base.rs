#![forbid(unsafe_code)]

//! State shared by every typed node: names, retained namespaces, the DOM
//! cache and the link to the parent.
//!
//! The cache and parent link live in a [`NodeState`] that is reference
//! counted separately from the object itself, so invalidation can walk up
//! the tree without borrowing any ancestor object.

use crate::object::{WeakXmlObjectRef, XmlObjectRef};
use samling_core::{Error, QName, Result};
use samling_xml::{Element, Namespace};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Per-node bookkeeping: element name, cached DOM, parent and owner links.
pub struct NodeState {
    name: QName,
    dom: RefCell<Option<Element>>,
    parent: RefCell<Weak<NodeState>>,
    owner: RefCell<Option<WeakXmlObjectRef>>,
}

impl NodeState {
    fn new(name: QName) -> Self {
        Self {
            name,
            dom: RefCell::new(None),
            parent: RefCell::new(Weak::new()),
            owner: RefCell::new(None),
        }
    }

    pub fn element_name(&self) -> &QName {
        &self.name
    }

    pub fn dom(&self) -> Option<Element> {
        self.dom.borrow().clone()
    }

    pub fn set_dom(&self, element: Element) {
        *self.dom.borrow_mut() = Some(element);
    }

    pub fn release_dom(&self) {
        self.dom.borrow_mut().take();
    }

    /// Drop the cached DOM of this node and of every ancestor.
    pub fn invalidate(&self) {
        self.release_dom();
        let mut next = self.parent.borrow().upgrade();
        while let Some(node) = next {
            node.release_dom();
            next = node.parent.borrow().upgrade();
        }
    }

    pub fn parent_state(&self) -> Option<Rc<NodeState>> {
        self.parent.borrow().upgrade()
    }

    /// The typed object owning this state, if it is still alive.
    pub fn owner(self: &Rc<Self>) -> Option<XmlObjectRef> {
        let owner = self.owner.borrow();
        owner.as_ref()?.upgrade(Rc::clone(self))
    }

    pub(crate) fn bind_owner(&self, owner: WeakXmlObjectRef) {
        *self.owner.borrow_mut() = Some(owner);
    }

    /// Whether `self` is `other` or one of its ancestors.
    fn is_ancestor_or_self(self: &Rc<Self>, other: &Rc<NodeState>) -> bool {
        let mut next = Some(Rc::clone(other));
        while let Some(node) = next {
            if Rc::ptr_eq(self, &node) {
                return true;
            }
            next = node.parent_state();
        }
        false
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeState")
            .field("name", &self.name)
            .field("dom_valid", &self.dom.borrow().is_some())
            .field("has_parent", &self.parent_state().is_some())
            .finish()
    }
}

/// Attach `child` below `owner`.
///
/// Fails with `IllegalAdd`, leaving both untouched, when the child
/// already belongs to another parent or when the attachment would create
/// a cycle.
pub fn adopt(owner: &Rc<NodeState>, child: &Rc<NodeState>) -> Result<()> {
    if let Some(current) = child.parent_state() {
        if Rc::ptr_eq(&current, owner) {
            return Ok(());
        }
        return Err(Error::IllegalAdd(format!(
            "{} already has a parent ({})",
            child.name, current.name
        )));
    }
    if child.is_ancestor_or_self(owner) {
        return Err(Error::IllegalAdd(format!(
            "{} cannot be added below itself",
            child.name
        )));
    }
    *child.parent.borrow_mut() = Rc::downgrade(owner);
    owner.invalidate();
    Ok(())
}

/// Detach `child` from `owner`. A child owned elsewhere is left alone.
pub fn orphan(owner: &Rc<NodeState>, child: &Rc<NodeState>) {
    let owned = child
        .parent_state()
        .is_some_and(|current| Rc::ptr_eq(&current, owner));
    if owned {
        *child.parent.borrow_mut() = Weak::new();
        owner.invalidate();
    }
}

/// Anything that can sit in a child slot: a typed handle or an erased
/// reference.
pub trait XmlChild: Clone {
    fn node_state(&self) -> &Rc<NodeState>;

    fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(self.node_state(), other.node_state())
    }
}

/// The fields every typed node carries.
pub struct XmlObjectBase {
    schema_type: Option<QName>,
    namespaces: Vec<Namespace>,
    schema_location: Option<String>,
    no_namespace_schema_location: Option<String>,
    state: Rc<NodeState>,
}

impl XmlObjectBase {
    pub fn new(element_name: QName) -> Self {
        Self {
            schema_type: None,
            namespaces: Vec::new(),
            schema_location: None,
            no_namespace_schema_location: None,
            state: Rc::new(NodeState::new(element_name)),
        }
    }

    pub fn element_name(&self) -> &QName {
        &self.state.name
    }

    pub fn node(&self) -> &Rc<NodeState> {
        &self.state
    }

    /// The explicit `xsi:type` of this node.
    pub fn schema_type(&self) -> Option<&QName> {
        self.schema_type.as_ref()
    }

    pub fn set_schema_type(&mut self, schema_type: Option<QName>) {
        self.state.assign(&mut self.schema_type, schema_type);
    }

    /// Namespace declarations retained from the source element or added
    /// by the application. They are re-declared on marshalling.
    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn add_namespace(&mut self, namespace: Namespace) {
        if self.namespaces.contains(&namespace) {
            return;
        }
        self.namespaces.retain(|n| n.prefix != namespace.prefix);
        self.namespaces.push(namespace);
        self.state.invalidate();
    }

    pub fn schema_location(&self) -> Option<&str> {
        self.schema_location.as_deref()
    }

    pub fn set_schema_location(&mut self, location: Option<String>) {
        self.state.assign(&mut self.schema_location, location);
    }

    pub fn no_namespace_schema_location(&self) -> Option<&str> {
        self.no_namespace_schema_location.as_deref()
    }

    pub fn set_no_namespace_schema_location(&mut self, location: Option<String>) {
        self.state
            .assign(&mut self.no_namespace_schema_location, location);
    }

    pub fn dom(&self) -> Option<Element> {
        self.state.dom()
    }

    pub fn is_dom_valid(&self) -> bool {
        self.state.dom.borrow().is_some()
    }

    pub fn set_dom(&self, element: Element) {
        self.state.set_dom(element);
    }

    /// Drop this node's cached DOM only.
    pub fn release_dom(&self) {
        self.state.release_dom();
    }

    /// Drop the cached DOM of this node and all its ancestors.
    pub fn invalidate(&self) {
        self.state.invalidate();
    }

    pub fn has_parent(&self) -> bool {
        self.state.parent_state().is_some()
    }

    pub fn parent(&self) -> Option<XmlObjectRef> {
        self.state.parent_state()?.owner()
    }

    /// Store `value` in `field`, invalidating the cache only on change.
    pub fn assign<V: PartialEq>(&self, field: &mut V, value: V) {
        self.state.assign(field, value);
    }

    /// Replace the child held in `slot`.
    ///
    /// The new child is adopted before the old one is released, so a
    /// failed adoption leaves the slot unchanged.
    pub fn set_child<C: XmlChild>(&self, slot: &mut Option<C>, child: Option<C>) -> Result<()> {
        match (slot.as_ref(), child.as_ref()) {
            (Some(old), Some(new)) if old.same_node(new) => return Ok(()),
            (None, None) => return Ok(()),
            _ => {}
        }
        if let Some(new) = &child {
            adopt(&self.state, new.node_state())?;
        }
        if let Some(old) = slot.take() {
            orphan(&self.state, old.node_state());
        }
        *slot = child;
        self.state.invalidate();
        Ok(())
    }
}

impl NodeState {
    fn assign<V: PartialEq>(&self, field: &mut V, value: V) {
        if *field != value {
            *field = value;
            self.invalidate();
        }
    }
}

impl fmt::Debug for XmlObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("XmlObjectBase");
        s.field("element_name", self.element_name());
        if let Some(t) = &self.schema_type {
            s.field("schema_type", t);
        }
        s.field("dom_valid", &self.is_dom_valid()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> Rc<NodeState> {
        XmlObjectBase::new(QName::new("urn:t", name)).state
    }

    #[test]
    fn invalidation_walks_to_root() {
        let (root, mid, leaf) = (node("r"), node("m"), node("l"));
        adopt(&root, &mid).unwrap();
        adopt(&mid, &leaf).unwrap();
        for n in [&root, &mid, &leaf] {
            n.set_dom(Element::new(n.name.clone()));
        }
        leaf.invalidate();
        assert!(root.dom().is_none());
        assert!(mid.dom().is_none());
        assert!(leaf.dom().is_none());
    }

    #[test]
    fn invalidation_leaves_siblings_alone() {
        let (root, a, b) = (node("r"), node("a"), node("b"));
        adopt(&root, &a).unwrap();
        adopt(&root, &b).unwrap();
        b.set_dom(Element::new(b.name.clone()));
        a.invalidate();
        assert!(b.dom().is_some());
    }

    #[test]
    fn second_parent_is_rejected() {
        let (first, second, child) = (node("p1"), node("p2"), node("c"));
        adopt(&first, &child).unwrap();
        let err = adopt(&second, &child).unwrap_err();
        assert!(matches!(err, Error::IllegalAdd(_)));
        assert!(Rc::ptr_eq(&child.parent_state().unwrap(), &first));
    }

    #[test]
    fn cycles_are_rejected() {
        let (root, child) = (node("r"), node("c"));
        adopt(&root, &child).unwrap();
        assert!(matches!(adopt(&child, &root), Err(Error::IllegalAdd(_))));
        assert!(matches!(adopt(&child, &child), Err(Error::IllegalAdd(_))));
    }

    #[test]
    fn orphan_only_detaches_own_children() {
        let (first, second, child) = (node("p1"), node("p2"), node("c"));
        adopt(&first, &child).unwrap();
        orphan(&second, &child);
        assert!(child.parent_state().is_some());
        orphan(&first, &child);
        assert!(child.parent_state().is_none());
        adopt(&second, &child).unwrap();
    }

    #[test]
    fn assign_invalidates_only_on_change() {
        let base = XmlObjectBase::new(QName::new("urn:t", "x"));
        let mut field = Some("a".to_owned());
        base.set_dom(Element::new(QName::new("urn:t", "x")));
        base.assign(&mut field, Some("a".to_owned()));
        assert!(base.is_dom_valid());
        base.assign(&mut field, Some("b".to_owned()));
        assert!(!base.is_dom_valid());
        assert_eq!(field.as_deref(), Some("b"));
    }
}
