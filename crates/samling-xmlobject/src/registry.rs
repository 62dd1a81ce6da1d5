#![forbid(unsafe_code)]

//! The qname-keyed table of builders, marshallers and unmarshallers.

use crate::builder::{TypedBuilder, XmlObjectBuilder};
use crate::marshall::{Marshaller, XmlObjectMarshaller};
use crate::object::{XmlObjectRef, XmlObjectType};
use crate::unmarshall::{Unmarshaller, UnmarshallingContext, UnmarshallingPolicy, XmlObjectUnmarshaller};
use samling_core::{Error, QName, Result};
use samling_xml::Element;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The builder, marshaller and unmarshaller responsible for one element
/// or schema type.
#[derive(Clone)]
pub struct ObjectProvider {
    pub builder: Arc<dyn XmlObjectBuilder>,
    pub marshaller: Arc<dyn Marshaller>,
    pub unmarshaller: Arc<dyn Unmarshaller>,
}

impl ObjectProvider {
    /// A provider for `T` using the generic marshaller and unmarshaller.
    pub fn of<T: XmlObjectType>() -> Self {
        Self {
            builder: Arc::new(TypedBuilder::<T>::new()),
            marshaller: Arc::new(XmlObjectMarshaller),
            unmarshaller: Arc::new(XmlObjectUnmarshaller),
        }
    }
}

/// Maps element and schema-type qnames to their providers.
///
/// The registry is immutable once shared; it is `Send + Sync` and may be
/// used from several threads to process independent object graphs.
#[derive(Clone, Default)]
pub struct XmlObjectProviderRegistry {
    providers: HashMap<QName, ObjectProvider>,
}

impl XmlObjectProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `name` with `provider`. A later registration for the same
    /// name replaces the earlier one.
    pub fn register(&mut self, name: QName, provider: ObjectProvider) {
        tracing::trace!(%name, "registering object provider");
        self.providers.insert(name, provider);
    }

    /// Register `T` with the generic marshaller and unmarshaller under
    /// `name`.
    pub fn register_type<T: XmlObjectType>(&mut self, name: QName) {
        self.register(name, ObjectProvider::of::<T>());
    }

    pub fn deregister(&mut self, name: &QName) -> Option<ObjectProvider> {
        self.providers.remove(name)
    }

    /// Exact-match lookup.
    pub fn lookup(&self, name: &QName) -> Option<&ObjectProvider> {
        self.providers.get(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build an empty node named `name` with the builder registered for
    /// it.
    pub fn build(&self, name: &QName) -> Result<XmlObjectRef> {
        self.lookup(name)
            .ok_or_else(|| Error::BuilderNotFound(name.to_string()))?
            .builder
            .build(name)
    }

    /// Build an empty node named `element_name` using the builder
    /// registered for `schema_type`, and record the type on the node.
    pub fn build_typed(&self, element_name: &QName, schema_type: &QName) -> Result<XmlObjectRef> {
        let object = self
            .lookup(schema_type)
            .ok_or_else(|| Error::BuilderNotFound(schema_type.to_string()))?
            .builder
            .build(element_name)?;
        object
            .try_borrow_mut()?
            .base_mut()
            .set_schema_type(Some(schema_type.clone()));
        Ok(object)
    }

    /// The provider responsible for marshalling `object`: its schema type
    /// if one is registered, otherwise its element name.
    pub fn provider_for_object(&self, object: &XmlObjectRef) -> Option<&ObjectProvider> {
        let schema_type = object.try_borrow().ok()?.base().schema_type().cloned();
        schema_type
            .and_then(|t| self.lookup(&t))
            .or_else(|| self.lookup(object.element_name()))
    }

    /// Marshall `object` (and its subtree) to a DOM element.
    pub fn marshall(&self, object: &XmlObjectRef) -> Result<Element> {
        let provider = self
            .provider_for_object(object)
            .ok_or_else(|| Error::MarshallerNotFound(object.element_name().to_string()))?;
        provider.marshaller.marshall(object, self)
    }

    /// Unmarshall `element` (and its subtree) into a typed node.
    pub fn unmarshall(&self, element: &Element, policy: UnmarshallingPolicy) -> Result<XmlObjectRef> {
        UnmarshallingContext::new(self, policy).unmarshall(element)
    }
}

impl fmt::Debug for XmlObjectProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.providers.keys().map(QName::to_string).collect();
        names.sort();
        f.debug_struct("XmlObjectProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::{Leaf, Pair};

    #[test]
    fn unregistered_name_has_no_builder() {
        let registry = XmlObjectProviderRegistry::new();
        let err = registry.build(&Leaf::default_element_name()).unwrap_err();
        assert!(matches!(err, Error::BuilderNotFound(_)));
    }

    #[test]
    fn build_uses_registered_type() {
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<Leaf>(Leaf::default_element_name());
        let object = registry.build(&Leaf::default_element_name()).unwrap();
        assert!(object.is::<Leaf>());
        assert_eq!(object.element_name(), &Leaf::default_element_name());
    }

    #[test]
    fn last_registration_wins() {
        let name = QName::new("urn:test", "Thing");
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<Leaf>(name.clone());
        registry.register_type::<Pair>(name.clone());
        assert_eq!(registry.len(), 1);
        assert!(registry.build(&name).unwrap().is::<Pair>());
        assert!(registry.deregister(&name).is_some());
        assert!(registry.lookup(&name).is_none());
    }

    #[test]
    fn typed_build_records_schema_type() {
        let type_name = QName::new("urn:test", "LeafType");
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<Leaf>(type_name.clone());
        let element_name = QName::new("urn:other", "Value");
        let object = registry.build_typed(&element_name, &type_name).unwrap();
        assert_eq!(object.element_name(), &element_name);
        assert_eq!(object.borrow().base().schema_type(), Some(&type_name));
        assert!(registry.provider_for_object(&object).is_some());
    }

    #[test]
    fn unregistered_object_has_no_marshaller() {
        let registry = XmlObjectProviderRegistry::new();
        let err = registry.marshall(&Leaf::build().erase()).unwrap_err();
        assert!(matches!(err, Error::MarshallerNotFound(_)));
    }

    #[test]
    fn registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<XmlObjectProviderRegistry>();
    }
}
