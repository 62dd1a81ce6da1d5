#![forbid(unsafe_code)]

//! The `XmlObject` trait and the handles typed nodes are held through.

use crate::base::{NodeState, XmlChild, XmlObjectBase};
use crate::context::ContextMap;
use samling_core::{Error, QName, Result};
use samling_xml::{Attribute, Element};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

/// A typed node bound to an XML element.
///
/// The hooks are called by the generic marshaller and unmarshaller; a type
/// overrides the ones its schema needs.
pub trait XmlObject: Any + fmt::Debug {
    fn base(&self) -> &XmlObjectBase;

    fn base_mut(&mut self) -> &mut XmlObjectBase;

    /// Children in schema order. Marshalling appends them exactly in
    /// this order.
    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        Vec::new()
    }

    /// Write each present attribute to `element`. Absent values are
    /// omitted.
    fn marshall_attributes(&self, _element: &Element) -> Result<()> {
        Ok(())
    }

    /// Write text content. Only leaf types override this.
    fn marshall_content(&self, _element: &Element) -> Result<()> {
        Ok(())
    }

    /// Take an attribute from the source element. Returns `false` when
    /// the attribute is not recognised.
    fn process_attribute(&mut self, _attribute: &Attribute) -> Result<bool> {
        Ok(false)
    }

    /// Take an unmarshalled child. Returns `false` when this type has no
    /// slot for it.
    fn process_child(&mut self, _child: XmlObjectRef) -> Result<bool> {
        Ok(false)
    }

    /// Take the text content of a childless source element.
    fn process_content(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn as_signable(&self) -> Option<&dyn SignableXmlObject> {
        None
    }

    fn as_signable_mut(&mut self) -> Option<&mut dyn SignableXmlObject> {
        None
    }
}

/// A node that can carry an enveloped signature.
pub trait SignableXmlObject {
    /// The identifier a signature reference points at, without `#`.
    fn signature_reference_id(&self) -> Option<String>;

    fn signature(&self) -> Option<XmlObjectRef>;

    /// Attach or remove the signature. A value that is not a signature
    /// is an `IllegalAdd`.
    fn set_signature(&mut self, signature: Option<XmlObjectRef>) -> Result<()>;

    fn is_signed(&self) -> bool {
        self.signature().is_some()
    }
}

/// A concrete node type with a default element name.
pub trait XmlObjectType: XmlObject + Sized {
    fn default_element_name() -> QName;

    fn with_name(element_name: QName) -> Self;

    /// Construct from a source element during unmarshalling. Types whose
    /// shape depends on inherited parse state read it from `context`.
    fn from_element(element: &Element, _context: &mut ContextMap) -> Result<Self> {
        Ok(Self::with_name(element.name()))
    }

    /// A fresh instance under the default element name.
    fn build() -> XmlHandle<Self> {
        XmlHandle::new(Self::with_name(Self::default_element_name()))
    }
}

/// A strongly typed handle to a node.
pub struct XmlHandle<T: XmlObject> {
    inner: Rc<RefCell<T>>,
    state: Rc<NodeState>,
}

impl<T: XmlObject> XmlHandle<T> {
    pub fn new(object: T) -> Self {
        let state = Rc::clone(object.base().node());
        let handle = Self {
            inner: Rc::new(RefCell::new(object)),
            state,
        };
        handle.state.bind_owner(handle.erase().downgrade());
        handle
    }

    /// # Panics
    ///
    /// Panics if the node is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// # Panics
    ///
    /// Panics if the node is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, T>> {
        self.inner
            .try_borrow()
            .map_err(|_| Error::IllegalState(format!("{} is being modified", self.state.element_name())))
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| Error::IllegalState(format!("{} is in use", self.state.element_name())))
    }

    pub fn erase(&self) -> XmlObjectRef {
        let object: Rc<RefCell<dyn XmlObject>> = self.inner.clone();
        let any: Rc<dyn Any> = self.inner.clone();
        XmlObjectRef {
            object,
            any,
            state: Rc::clone(&self.state),
        }
    }

    pub fn element_name(&self) -> &QName {
        self.state.element_name()
    }

    pub fn dom(&self) -> Option<Element> {
        self.state.dom()
    }

    pub fn parent(&self) -> Option<XmlObjectRef> {
        self.state.parent_state()?.owner()
    }

    pub fn ptr_eq(&self, other: &XmlHandle<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: XmlObject> Clone for XmlHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: XmlObject> XmlChild for XmlHandle<T> {
    fn node_state(&self) -> &Rc<NodeState> {
        &self.state
    }
}

impl<T: XmlObject> fmt::Debug for XmlHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(object) => fmt::Debug::fmt(&*object, f),
            Err(_) => write!(f, "XmlHandle({}, borrowed)", self.element_name()),
        }
    }
}

impl<T: XmlObject> From<XmlHandle<T>> for XmlObjectRef {
    fn from(handle: XmlHandle<T>) -> Self {
        handle.erase()
    }
}

/// A type-erased handle to a node.
#[derive(Clone)]
pub struct XmlObjectRef {
    object: Rc<RefCell<dyn XmlObject>>,
    any: Rc<dyn Any>,
    state: Rc<NodeState>,
}

impl XmlObjectRef {
    /// # Panics
    ///
    /// Panics if the node is mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, dyn XmlObject> {
        self.object.borrow()
    }

    pub fn try_borrow(&self) -> Result<Ref<'_, dyn XmlObject>> {
        self.object
            .try_borrow()
            .map_err(|_| Error::IllegalState(format!("{} is being modified", self.element_name())))
    }

    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn XmlObject>> {
        self.object
            .try_borrow_mut()
            .map_err(|_| Error::IllegalState(format!("{} is in use", self.element_name())))
    }

    pub fn element_name(&self) -> &QName {
        self.state.element_name()
    }

    pub fn node(&self) -> &Rc<NodeState> {
        &self.state
    }

    pub fn dom(&self) -> Option<Element> {
        self.state.dom()
    }

    pub fn parent(&self) -> Option<XmlObjectRef> {
        self.state.parent_state()?.owner()
    }

    pub fn is<T: XmlObject>(&self) -> bool {
        self.any.is::<RefCell<T>>()
    }

    pub fn downcast<T: XmlObject>(&self) -> Option<XmlHandle<T>> {
        let inner = Rc::clone(&self.any).downcast::<RefCell<T>>().ok()?;
        Some(XmlHandle {
            inner,
            state: Rc::clone(&self.state),
        })
    }

    /// Downcast for a child slot; the wrong type is an `IllegalAdd`.
    pub fn cast<T: XmlObject>(&self) -> Result<XmlHandle<T>> {
        self.downcast().ok_or_else(|| {
            Error::IllegalAdd(format!(
                "{} is not a {}",
                self.element_name(),
                std::any::type_name::<T>()
            ))
        })
    }

    pub fn ptr_eq(&self, other: &XmlObjectRef) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn downgrade(&self) -> WeakXmlObjectRef {
        WeakXmlObjectRef {
            object: Rc::downgrade(&self.object),
            any: Rc::downgrade(&self.any),
        }
    }
}

impl XmlChild for XmlObjectRef {
    fn node_state(&self) -> &Rc<NodeState> {
        &self.state
    }
}

impl fmt::Debug for XmlObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object.try_borrow() {
            Ok(object) => fmt::Debug::fmt(&*object, f),
            Err(_) => write!(f, "XmlObjectRef({}, borrowed)", self.element_name()),
        }
    }
}

/// Non-owning counterpart of [`XmlObjectRef`], held by a node's state to
/// reach its owner.
pub(crate) struct WeakXmlObjectRef {
    object: Weak<RefCell<dyn XmlObject>>,
    any: Weak<dyn Any>,
}

impl WeakXmlObjectRef {
    pub(crate) fn upgrade(&self, state: Rc<NodeState>) -> Option<XmlObjectRef> {
        Some(XmlObjectRef {
            object: self.object.upgrade()?,
            any: self.any.upgrade()?,
            state,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug)]
    pub(crate) struct Leaf {
        base: XmlObjectBase,
        pub(crate) value: Option<String>,
    }

    impl Leaf {
        pub(crate) fn set_value(&mut self, value: Option<&str>) {
            self.base.assign(&mut self.value, value.map(str::to_owned));
        }
    }

    impl XmlObject for Leaf {
        fn base(&self) -> &XmlObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut XmlObjectBase {
            &mut self.base
        }
        fn marshall_attributes(&self, element: &Element) -> Result<()> {
            if let Some(v) = &self.value {
                element.set_attribute_local("value", v.as_str());
            }
            Ok(())
        }
        fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
            if attribute.name == QName::local("value") {
                self.value = Some(attribute.value.clone());
                return Ok(true);
            }
            Ok(false)
        }
    }

    impl XmlObjectType for Leaf {
        fn default_element_name() -> QName {
            QName::with_prefix("urn:test", "Leaf", "t")
        }
        fn with_name(element_name: QName) -> Self {
            Self {
                base: XmlObjectBase::new(element_name),
                value: None,
            }
        }
    }

    #[derive(Debug)]
    pub(crate) struct Pair {
        base: XmlObjectBase,
        pub(crate) first: Option<XmlObjectRef>,
        pub(crate) second: Option<XmlObjectRef>,
    }

    impl Pair {
        pub(crate) fn set_first(&mut self, child: Option<XmlObjectRef>) -> Result<()> {
            self.base.set_child(&mut self.first, child)
        }
        pub(crate) fn set_second(&mut self, child: Option<XmlObjectRef>) -> Result<()> {
            self.base.set_child(&mut self.second, child)
        }
    }

    impl XmlObject for Pair {
        fn base(&self) -> &XmlObjectBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut XmlObjectBase {
            &mut self.base
        }
        fn ordered_children(&self) -> Vec<XmlObjectRef> {
            self.first.iter().chain(self.second.iter()).cloned().collect()
        }
        fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
            match (child.element_name().namespace_uri(), child.element_name().local_name()) {
                ("urn:test", "Leaf") => {
                    child.cast::<Leaf>()?;
                }
                ("urn:test", "Pair") => {
                    child.cast::<Pair>()?;
                }
                _ => return Ok(false),
            }
            if self.first.is_none() {
                self.set_first(Some(child))?;
            } else {
                self.set_second(Some(child))?;
            }
            Ok(true)
        }
    }

    impl XmlObjectType for Pair {
        fn default_element_name() -> QName {
            QName::with_prefix("urn:test", "Pair", "t")
        }
        fn with_name(element_name: QName) -> Self {
            Self {
                base: XmlObjectBase::new(element_name),
                first: None,
                second: None,
            }
        }
    }

    #[test]
    fn downcast_matches_concrete_type() {
        let leaf = Leaf::build();
        let erased = leaf.erase();
        assert!(erased.is::<Leaf>());
        assert!(!erased.is::<Pair>());
        assert!(erased.downcast::<Leaf>().unwrap().ptr_eq(&leaf));
        assert!(matches!(erased.cast::<Pair>(), Err(Error::IllegalAdd(_))));
    }

    #[test]
    fn parent_navigation() {
        let pair = Pair::build();
        let leaf = Leaf::build();
        pair.borrow_mut().set_first(Some(leaf.erase())).unwrap();
        let parent = leaf.parent().unwrap();
        assert!(parent.ptr_eq(&pair.erase()));
        pair.borrow_mut().set_first(None).unwrap();
        assert!(leaf.parent().is_none());
    }

    #[test]
    fn child_owned_elsewhere_is_rejected() {
        let first = Pair::build();
        let second = Pair::build();
        let leaf = Leaf::build();
        first.borrow_mut().set_first(Some(leaf.erase())).unwrap();
        let err = second.borrow_mut().set_first(Some(leaf.erase())).unwrap_err();
        assert!(matches!(err, Error::IllegalAdd(_)));
        assert!(second.borrow().first.is_none());
        assert!(leaf.parent().unwrap().ptr_eq(&first.erase()));
    }

    #[test]
    fn owner_is_released_with_handle() {
        let leaf = Leaf::build();
        let state = Rc::clone(leaf.erase().node());
        drop(leaf);
        assert!(state.owner().is_none());
    }
}
