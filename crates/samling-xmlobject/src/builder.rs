#![forbid(unsafe_code)]

//! Factories for empty typed nodes.

use crate::context::ContextMap;
use crate::object::{XmlHandle, XmlObjectRef, XmlObjectType};
use samling_core::{QName, Result};
use samling_xml::Element;
use std::marker::PhantomData;

/// Builds empty nodes for one element or schema type.
///
/// Builders are stateless and shared between threads; the nodes they
/// produce are not.
pub trait XmlObjectBuilder: Send + Sync {
    /// An empty node under `element_name`.
    fn build(&self, element_name: &QName) -> Result<XmlObjectRef>;

    /// An empty node for `element`, with any construction parameters
    /// resolved from the element or from `context`.
    fn build_from_element(
        &self,
        element: &Element,
        _context: &mut ContextMap,
    ) -> Result<XmlObjectRef> {
        self.build(&element.name())
    }
}

/// The builder for a concrete [`XmlObjectType`].
pub struct TypedBuilder<T>(PhantomData<fn() -> T>);

impl<T> TypedBuilder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: XmlObjectType> XmlObjectBuilder for TypedBuilder<T> {
    fn build(&self, element_name: &QName) -> Result<XmlObjectRef> {
        Ok(XmlHandle::new(T::with_name(element_name.clone())).erase())
    }

    fn build_from_element(
        &self,
        element: &Element,
        context: &mut ContextMap,
    ) -> Result<XmlObjectRef> {
        Ok(XmlHandle::new(T::from_element(element, context)?).erase())
    }
}
