#![forbid(unsafe_code)]

//! Child collections that keep parent links and the owner's DOM cache in
//! step with every mutation.

use crate::base::{adopt, orphan, NodeState, XmlChild, XmlObjectBase};
use crate::object::{XmlHandle, XmlObject, XmlObjectRef};
use samling_core::{Error, QName, Result};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An ordered list of children of one owner.
///
/// Adding sets the child's parent and invalidates the owner; removing
/// clears it. A child that already has another parent is refused with
/// `IllegalAdd`.
pub struct XmlObjectChildrenList<C: XmlChild> {
    owner: Rc<NodeState>,
    items: Vec<C>,
}

impl<C: XmlChild> XmlObjectChildrenList<C> {
    pub fn new(owner: &XmlObjectBase) -> Self {
        Self {
            owner: Rc::clone(owner.node()),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&C> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[C] {
        &self.items
    }

    pub fn contains(&self, child: &C) -> bool {
        self.items.iter().any(|c| c.same_node(child))
    }

    pub fn push(&mut self, child: C) -> Result<()> {
        adopt(&self.owner, child.node_state())?;
        self.items.push(child);
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, child: C) -> Result<()> {
        adopt(&self.owner, child.node_state())?;
        self.items.insert(index, child);
        Ok(())
    }

    /// Replace the child at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn replace(&mut self, index: usize, child: C) -> Result<C> {
        if self.items[index].same_node(&child) {
            return Ok(child);
        }
        adopt(&self.owner, child.node_state())?;
        let old = std::mem::replace(&mut self.items[index], child);
        orphan(&self.owner, old.node_state());
        Ok(old)
    }

    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> C {
        let old = self.items.remove(index);
        orphan(&self.owner, old.node_state());
        old
    }

    /// Remove `child` by identity. Returns whether it was present.
    pub fn remove_item(&mut self, child: &C) -> bool {
        match self.items.iter().position(|c| c.same_node(child)) {
            Some(index) => {
                self.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        for old in self.items.drain(..) {
            orphan(&self.owner, old.node_state());
        }
        self.owner.invalidate();
    }
}

impl<T: XmlObject> XmlObjectChildrenList<XmlHandle<T>> {
    pub fn erased(&self) -> impl Iterator<Item = XmlObjectRef> + '_ {
        self.items.iter().map(XmlHandle::erase)
    }
}

impl<'a, C: XmlChild> IntoIterator for &'a XmlObjectChildrenList<C> {
    type Item = &'a C;
    type IntoIter = std::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<C: XmlChild + fmt::Debug> fmt::Debug for XmlObjectChildrenList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

/// A children list of heterogeneous nodes with a secondary index by
/// element name and by schema type.
///
/// The index is keyed when a child is added.
pub struct IndexedXmlObjectChildrenList {
    list: XmlObjectChildrenList<XmlObjectRef>,
    index: HashMap<QName, Vec<XmlObjectRef>>,
}

impl IndexedXmlObjectChildrenList {
    pub fn new(owner: &XmlObjectBase) -> Self {
        Self {
            list: XmlObjectChildrenList::new(owner),
            index: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, XmlObjectRef> {
        self.list.iter()
    }

    pub fn as_slice(&self) -> &[XmlObjectRef] {
        self.list.as_slice()
    }

    /// The children with element name or schema type `name`, in list
    /// order.
    pub fn get(&self, name: &QName) -> &[XmlObjectRef] {
        self.index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The children named `name` that are of type `T`.
    pub fn typed<T: XmlObject>(&self, name: &QName) -> Vec<XmlHandle<T>> {
        self.get(name).iter().filter_map(XmlObjectRef::downcast).collect()
    }

    pub fn push(&mut self, child: XmlObjectRef) -> Result<()> {
        self.list.push(child.clone())?;
        for key in Self::keys(&child) {
            self.index.entry(key).or_default().push(child.clone());
        }
        Ok(())
    }

    pub fn remove(&mut self, child: &XmlObjectRef) -> bool {
        if !self.list.remove_item(child) {
            return false;
        }
        // Keys may have changed since the push, so drop by identity.
        self.index.retain(|_, entries| {
            entries.retain(|c| !c.ptr_eq(child));
            !entries.is_empty()
        });
        true
    }

    /// Remove every child indexed under `name`. Returns how many were
    /// removed.
    pub fn remove_all(&mut self, name: &QName) -> usize {
        let targets: Vec<XmlObjectRef> = self.get(name).to_vec();
        targets.iter().filter(|c| self.remove(c)).count()
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

    /// A live view of the children indexed under `name`.
    pub fn sub_list(&mut self, name: &QName) -> IndexedSubList<'_> {
        IndexedSubList {
            list: self,
            name: name.clone(),
        }
    }

    fn keys(child: &XmlObjectRef) -> Vec<QName> {
        let mut keys = vec![child.element_name().clone()];
        if let Ok(node) = child.try_borrow() {
            if let Some(t) = node.base().schema_type() {
                if t != child.element_name() {
                    keys.push(t.clone());
                }
            }
        }
        keys
    }
}

impl fmt::Debug for IndexedXmlObjectChildrenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.list, f)
    }
}

/// The children of an [`IndexedXmlObjectChildrenList`] under one key.
///
/// Changes go through the backing list, so parent links, the index and
/// the owner's cached DOM stay in step.
pub struct IndexedSubList<'a> {
    list: &'a mut IndexedXmlObjectChildrenList,
    name: QName,
}

impl IndexedSubList<'_> {
    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.list.get(&self.name).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&XmlObjectRef> {
        self.list.get(&self.name).get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, XmlObjectRef> {
        self.list.get(&self.name).iter()
    }

    pub fn typed<T: XmlObject>(&self) -> Vec<XmlHandle<T>> {
        self.list.typed(&self.name)
    }

    /// Append `child` to the backing list. Its element name or schema
    /// type must be this view's key.
    pub fn push(&mut self, child: XmlObjectRef) -> Result<()> {
        if !IndexedXmlObjectChildrenList::keys(&child).contains(&self.name) {
            return Err(Error::IllegalAdd(format!(
                "{} is not indexed under {}",
                child.element_name(),
                self.name
            )));
        }
        self.list.push(child)
    }

    /// Remove `child` if it is one of this view's children.
    pub fn remove(&mut self, child: &XmlObjectRef) -> bool {
        if !self.iter().any(|c| c.ptr_eq(child)) {
            return false;
        }
        self.list.remove(child)
    }

    pub fn clear(&mut self) -> usize {
        self.list.remove_all(&self.name)
    }
}

impl fmt::Debug for IndexedSubList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedSubList")
            .field("name", &self.name)
            .field("children", &self.list.get(&self.name))
            .finish()
    }
}

/// An ordered collection with no duplicates by identity.
///
/// Read access is through slices only; additions and removals go
/// through [`insert`](Self::insert) and [`remove`](Self::remove), which
/// maintain parent links and the owner's cache.
pub struct OrderedXmlObjectSet<C: XmlChild> {
    list: XmlObjectChildrenList<C>,
}

impl<C: XmlChild> OrderedXmlObjectSet<C> {
    pub fn new(owner: &XmlObjectBase) -> Self {
        Self {
            list: XmlObjectChildrenList::new(owner),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn as_slice(&self) -> &[C] {
        self.list.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.list.iter()
    }

    pub fn contains(&self, child: &C) -> bool {
        self.list.contains(child)
    }

    /// Append `child` unless it is already present. Returns whether it was
    /// added.
    pub fn insert(&mut self, child: C) -> Result<bool> {
        if self.list.contains(&child) {
            return Ok(false);
        }
        self.list.push(child)?;
        Ok(true)
    }

    pub fn remove(&mut self, child: &C) -> bool {
        self.list.remove_item(child)
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}

impl<C: XmlChild + fmt::Debug> fmt::Debug for OrderedXmlObjectSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.list, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::{Leaf, Pair};
    use crate::object::XmlObjectType;
    use samling_core::Error;
    use samling_xml::Element;

    fn owner() -> XmlObjectBase {
        XmlObjectBase::new(QName::new("urn:test", "Owner"))
    }

    #[test]
    fn push_sets_parent_and_invalidates_owner() {
        let base = owner();
        let mut list = XmlObjectChildrenList::new(&base);
        base.set_dom(Element::new(base.element_name().clone()));
        let leaf = Leaf::build();
        list.push(leaf.clone()).unwrap();
        assert!(!base.is_dom_valid());
        assert!(Rc::ptr_eq(
            &leaf.erase().node().parent_state().unwrap(),
            base.node()
        ));
        assert!(list.remove_item(&leaf));
        assert!(leaf.parent().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn child_of_another_list_is_refused() {
        let (a, b) = (owner(), owner());
        let mut first = XmlObjectChildrenList::new(&a);
        let mut second = XmlObjectChildrenList::new(&b);
        let leaf = Leaf::build();
        first.push(leaf.clone()).unwrap();
        assert!(matches!(second.push(leaf.clone()), Err(Error::IllegalAdd(_))));
        assert!(second.is_empty());
        assert!(first.contains(&leaf));
        first.clear();
        second.push(leaf).unwrap();
    }

    #[test]
    fn replace_swaps_ownership() {
        let base = owner();
        let mut list = XmlObjectChildrenList::new(&base);
        let (old, new) = (Leaf::build(), Leaf::build());
        list.push(old.clone()).unwrap();
        let removed = list.replace(0, new.clone()).unwrap();
        assert!(removed.ptr_eq(&old));
        assert!(old.parent().is_none());
        assert!(list.get(0).unwrap().ptr_eq(&new));
    }

    #[test]
    fn index_tracks_names_and_types() {
        let base = owner();
        let mut list = IndexedXmlObjectChildrenList::new(&base);
        let leaf = Leaf::build();
        let typed = Leaf::build();
        let type_name = QName::new("urn:types", "Special");
        typed.borrow_mut().base_mut().set_schema_type(Some(type_name.clone()));
        let pair = Pair::build();
        list.push(leaf.erase()).unwrap();
        list.push(pair.erase()).unwrap();
        list.push(typed.erase()).unwrap();

        let leaf_name = Leaf::default_element_name();
        assert_eq!(list.get(&leaf_name).len(), 2);
        assert_eq!(list.typed::<Leaf>(&leaf_name).len(), 2);
        assert_eq!(list.get(&type_name).len(), 1);
        assert_eq!(list.get(&Pair::default_element_name()).len(), 1);

        assert!(list.remove(&typed.erase()));
        assert!(list.get(&type_name).is_empty());
        assert_eq!(list.remove_all(&leaf_name), 1);
        assert_eq!(list.len(), 1);
        assert!(leaf.parent().is_none());
    }

    #[test]
    fn removal_clears_index_after_type_change() {
        let base = owner();
        let mut list = IndexedXmlObjectChildrenList::new(&base);
        let leaf = Leaf::build();
        let type_name = QName::new("urn:types", "Special");
        leaf.borrow_mut().base_mut().set_schema_type(Some(type_name.clone()));
        list.push(leaf.erase()).unwrap();
        leaf.borrow_mut().base_mut().set_schema_type(None);

        assert!(list.remove(&leaf.erase()));
        assert!(list.get(&type_name).is_empty());
        assert!(list.get(&Leaf::default_element_name()).is_empty());
        assert!(list.is_empty());
    }

    #[test]
    fn sub_list_writes_through() {
        let base = owner();
        let mut list = IndexedXmlObjectChildrenList::new(&base);
        let leaf_name = Leaf::default_element_name();
        let (leaf, pair) = (Leaf::build(), Pair::build());
        list.push(pair.erase()).unwrap();
        base.set_dom(Element::new(base.element_name().clone()));

        let mut leaves = list.sub_list(&leaf_name);
        assert!(leaves.is_empty());
        leaves.push(leaf.erase()).unwrap();
        assert!(matches!(
            leaves.push(Pair::build().erase()),
            Err(Error::IllegalAdd(_))
        ));
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves.typed::<Leaf>().len(), 1);
        assert!(!leaves.remove(&pair.erase()));
        drop(leaves);

        assert!(!base.is_dom_valid());
        assert!(leaf.parent().is_some());
        assert_eq!(list.len(), 2);
        assert!(list.as_slice()[1].ptr_eq(&leaf.erase()));

        assert!(list.sub_list(&leaf_name).remove(&leaf.erase()));
        assert!(leaf.parent().is_none());
        assert_eq!(list.len(), 1);
        assert!(list.get(&leaf_name).is_empty());
    }

    #[test]
    fn set_refuses_duplicates() {
        let base = owner();
        let mut set = OrderedXmlObjectSet::new(&base);
        let leaf = Leaf::build();
        assert!(set.insert(leaf.clone()).unwrap());
        assert!(!set.insert(leaf.clone()).unwrap());
        assert_eq!(set.len(), 1);
        assert!(set.remove(&leaf));
        assert!(!set.remove(&leaf));
    }
}
