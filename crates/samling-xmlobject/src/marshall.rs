#![forbid(unsafe_code)]

//! Typed nodes to DOM.

use crate::object::{XmlObject, XmlObjectRef};
use crate::registry::XmlObjectProviderRegistry;
use samling_core::{ns, QName, Result};
use samling_xml::Element;

/// Produces the DOM for a node of the type it is registered for.
pub trait Marshaller: Send + Sync {
    /// Marshall `object` and its subtree, reusing any valid cached DOM.
    fn marshall(&self, object: &XmlObjectRef, registry: &XmlObjectProviderRegistry) -> Result<Element>;
}

/// The marshaller used by every type that does not need a custom one.
///
/// A node with a valid cached DOM is returned as is. Otherwise a new
/// element is created, the attribute and content hooks run, the ordered
/// children are marshalled and appended, and the result is cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlObjectMarshaller;

impl Marshaller for XmlObjectMarshaller {
    fn marshall(&self, object: &XmlObjectRef, registry: &XmlObjectProviderRegistry) -> Result<Element> {
        if let Some(cached) = object.dom() {
            tracing::trace!(element = %object.element_name(), "reusing cached DOM");
            return Ok(cached);
        }
        tracing::trace!(element = %object.element_name(), "marshalling");

        let (element, children) = {
            let node = object.try_borrow()?;
            let element = create_element(&*node);
            node.marshall_attributes(&element)?;
            node.marshall_content(&element)?;
            (element, node.ordered_children())
        };
        for child in &children {
            element.append_child(registry.marshall(child)?);
        }
        object.node().set_dom(element.clone());
        Ok(element)
    }
}

/// A new element for `object` carrying its own prefix binding, retained
/// namespace declarations, `xsi:type` and schema location attributes.
pub fn create_element(object: &dyn XmlObject) -> Element {
    let base = object.base();
    let element = Element::new_declared(base.element_name().clone());
    for decl in base.namespaces() {
        if element.declared_namespace(&decl.prefix).is_none() {
            element.declare_namespace(&decl.prefix, &decl.uri);
        }
    }

    let mut uses_xsi = false;
    if let Some(schema_type) = base.schema_type() {
        let value = match type_prefix(object, schema_type) {
            Some(prefix) if !prefix.is_empty() => {
                if element.declared_namespace(&prefix).is_none() {
                    element.declare_namespace(&prefix, schema_type.namespace_uri());
                }
                format!("{prefix}:{}", schema_type.local_name())
            }
            _ => schema_type.local_name().to_owned(),
        };
        element.set_attribute(xsi(ns::attr::TYPE), value);
        uses_xsi = true;
    }
    if let Some(location) = base.schema_location() {
        element.set_attribute(xsi(ns::attr::SCHEMA_LOCATION), location);
        uses_xsi = true;
    }
    if let Some(location) = base.no_namespace_schema_location() {
        element.set_attribute(xsi(ns::attr::NO_NAMESPACE_SCHEMA_LOCATION), location);
        uses_xsi = true;
    }
    if uses_xsi && element.declared_namespace(ns::prefix::XSI).is_none() {
        element.declare_namespace(ns::prefix::XSI, ns::XSI);
    }
    element
}

fn xsi(local_name: &str) -> QName {
    QName::with_prefix(ns::XSI, local_name, ns::prefix::XSI)
}

/// The prefix to write a schema type with: its own, one already retained
/// for its namespace, or a well-known one.
fn type_prefix(object: &dyn XmlObject, schema_type: &QName) -> Option<String> {
    if !schema_type.has_namespace() {
        return None;
    }
    if let Some(prefix) = schema_type.prefix() {
        return Some(prefix.to_owned());
    }
    let retained = object
        .base()
        .namespaces()
        .iter()
        .find(|n| n.uri == schema_type.namespace_uri() && !n.prefix.is_empty())
        .map(|n| n.prefix.clone());
    if retained.is_some() {
        return retained;
    }
    let element_name = object.base().element_name();
    if element_name.namespace_uri() == schema_type.namespace_uri() {
        if let Some(p) = element_name.prefix() {
            return Some(p.to_owned());
        }
    }
    Some(match schema_type.namespace_uri() {
        ns::XS => ns::prefix::XS.to_owned(),
        _ => "xsitype".to_owned(),
    })
}
