#![forbid(unsafe_code)]

//! DOM to typed nodes.

use crate::context::ContextMap;
use crate::object::XmlObjectRef;
use crate::registry::{ObjectProvider, XmlObjectProviderRegistry};
use samling_core::{ns, Error, QName, Result};
use samling_xml::{Attribute, Element, Namespace};
use std::sync::Arc;

/// Builds a typed node from a DOM element of the type it is registered
/// for.
pub trait Unmarshaller: Send + Sync {
    fn unmarshall(&self, element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef>;
}

/// How unrecognised content is treated during one unmarshal call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmarshallingPolicy {
    /// Skip child elements that have no provider or that the parent type
    /// does not accept, instead of failing.
    pub ignore_unknown_elements: bool,
    /// Skip attributes the element type does not recognise, instead of
    /// failing.
    pub ignore_unknown_attributes: bool,
}

impl UnmarshallingPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            ignore_unknown_elements: true,
            ignore_unknown_attributes: true,
        }
    }
}

/// State for one unmarshal call: the registry, the policy, the scoped
/// parse context and the namespace bindings of the ancestors.
pub struct UnmarshallingContext<'a> {
    registry: &'a XmlObjectProviderRegistry,
    policy: UnmarshallingPolicy,
    pub context: ContextMap,
    scopes: Vec<Vec<Namespace>>,
}

impl<'a> UnmarshallingContext<'a> {
    pub fn new(registry: &'a XmlObjectProviderRegistry, policy: UnmarshallingPolicy) -> Self {
        Self {
            registry,
            policy,
            context: ContextMap::new(),
            scopes: Vec::new(),
        }
    }

    /// Bindings inherited by the element about to be unmarshalled, for
    /// when a subtree is unmarshalled out of its document.
    pub fn with_inherited_namespaces(mut self, namespaces: Vec<Namespace>) -> Self {
        self.scopes.insert(0, namespaces);
        self
    }

    pub fn registry(&self) -> &'a XmlObjectProviderRegistry {
        self.registry
    }

    pub fn policy(&self) -> UnmarshallingPolicy {
        self.policy
    }

    /// Unmarshall a root element. A root with no provider is a
    /// `BuilderNotFound` error regardless of policy.
    pub fn unmarshall(&mut self, element: &Element) -> Result<XmlObjectRef> {
        let (provider, _) = self
            .provider_for(element)?
            .ok_or_else(|| Error::BuilderNotFound(element.name().to_string()))?;
        provider.unmarshaller.unmarshall(element, self)
    }

    /// Unmarshall a child element. `Ok(None)` means the child has no
    /// provider and the policy says to skip it.
    pub fn unmarshall_child(&mut self, element: &Element) -> Result<Option<XmlObjectRef>> {
        match self.provider_for(element)? {
            Some((provider, _)) => provider.unmarshaller.unmarshall(element, self).map(Some),
            None => {
                self.unknown_element(&element.name())?;
                Ok(None)
            }
        }
    }

    /// The provider for `element` and the schema type it was chosen by:
    /// the `xsi:type` if one is present and registered, otherwise the
    /// element name.
    pub fn provider_for(&self, element: &Element) -> Result<Option<(ObjectProvider, Option<QName>)>> {
        let schema_type = self.schema_type(element)?;
        if let Some(t) = &schema_type {
            if let Some(provider) = self.registry.lookup(t) {
                return Ok(Some((provider.clone(), schema_type)));
            }
        }
        Ok(self
            .registry
            .lookup(&element.name())
            .map(|p| (p.clone(), schema_type)))
    }

    /// The resolved `xsi:type` of `element`, if it has one.
    pub fn schema_type(&self, element: &Element) -> Result<Option<QName>> {
        let Some(value) = element.attribute(&QName::new(ns::XSI, ns::attr::TYPE)) else {
            return Ok(None);
        };
        let value = value.trim();
        let (prefix, local) = value.split_once(':').unwrap_or(("", value));
        let uri = element
            .declared_namespace(prefix)
            .or_else(|| self.lookup_namespace(prefix))
            .or_else(|| (prefix == "xml").then(|| ns::XML.to_owned()));
        match uri {
            Some(uri) => Ok(Some(QName::with_prefix(uri, local, prefix))),
            None if prefix.is_empty() => Ok(Some(QName::local(local))),
            None => Err(Error::Unmarshalling(format!(
                "xsi:type {value} uses undeclared prefix {prefix}"
            ))),
        }
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|n| n.prefix == prefix)
            .map(|n| n.uri.clone())
    }

    /// Apply the unknown-element policy.
    pub fn unknown_element(&self, name: &QName) -> Result<()> {
        if self.policy.ignore_unknown_elements {
            tracing::warn!(element = %name, "ignoring unknown element");
            Ok(())
        } else {
            Err(Error::UnknownElement(name.to_string()))
        }
    }

    /// Apply the unknown-attribute policy.
    pub fn unknown_attribute(&self, element: &QName, attribute: &QName) -> Result<()> {
        if self.policy.ignore_unknown_attributes {
            tracing::warn!(%element, %attribute, "ignoring unknown attribute");
            Ok(())
        } else {
            Err(Error::UnknownAttribute(format!("{attribute} on {element}")))
        }
    }

    /// Open the scopes of `element`. Custom unmarshallers call this before
    /// building their node and [`leave`](Self::leave) when done.
    pub fn enter(&mut self, element: &Element) {
        self.context.push_scope();
        self.scopes.push(element.namespaces());
    }

    pub fn leave(&mut self) {
        self.scopes.pop();
        self.context.pop_scope();
    }
}

/// The unmarshaller used by every type that does not need a custom one.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlObjectUnmarshaller;

impl Unmarshaller for XmlObjectUnmarshaller {
    fn unmarshall(&self, element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef> {
        ctx.enter(element);
        let result = unmarshall_element(element, ctx);
        ctx.leave();
        result
    }
}

fn unmarshall_element(element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef> {
    let object = build_for(element, ctx)?;
    tracing::trace!(element = %object.element_name(), "unmarshalling");

    {
        let mut node = object.try_borrow_mut()?;
        for attribute in element.attributes() {
            if process_schema_attribute(&mut *node, &attribute) {
                continue;
            }
            if !node.process_attribute(&attribute)? {
                ctx.unknown_attribute(object.element_name(), &attribute.name)?;
            }
        }
    }

    let children = element.child_elements();
    if children.is_empty() {
        let text = element.text();
        if !text.is_empty() {
            object.try_borrow_mut()?.process_content(&text)?;
        }
    }
    for child_element in &children {
        let Some(child) = ctx.unmarshall_child(child_element)? else {
            continue;
        };
        let child_name = child.element_name().clone();
        if !object.try_borrow_mut()?.process_child(child)? {
            ctx.unknown_element(&child_name)?;
        }
    }

    object.node().set_dom(element.clone());
    Ok(object)
}

/// Build the empty node for `element` through its provider and record
/// its schema type and namespace declarations.
pub fn build_for(element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef> {
    let (provider, schema_type) = ctx
        .provider_for(element)?
        .ok_or_else(|| Error::BuilderNotFound(element.name().to_string()))?;
    let builder = Arc::clone(&provider.builder);
    let object = builder.build_from_element(element, &mut ctx.context)?;
    {
        let mut node = object.try_borrow_mut()?;
        let base = node.base_mut();
        base.set_schema_type(schema_type);
        for namespace in element.namespaces() {
            base.add_namespace(namespace);
        }
    }
    Ok(object)
}

/// Handle the `xsi:` attributes the engine owns. Returns whether the
/// attribute was consumed.
fn process_schema_attribute(node: &mut dyn crate::object::XmlObject, attribute: &Attribute) -> bool {
    if attribute.name.namespace_uri() != ns::XSI {
        return false;
    }
    match attribute.name.local_name() {
        ns::attr::TYPE => true,
        ns::attr::SCHEMA_LOCATION => {
            node.base_mut()
                .set_schema_location(Some(attribute.value.clone()));
            true
        }
        ns::attr::NO_NAMESPACE_SCHEMA_LOCATION => {
            node.base_mut()
                .set_no_namespace_schema_location(Some(attribute.value.clone()));
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::{Leaf, Pair};
    use crate::object::XmlObjectType;
    use samling_xml::parse;
    use samling_xml::writer::to_string;

    fn registry() -> XmlObjectProviderRegistry {
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<Leaf>(Leaf::default_element_name());
        registry.register_type::<Pair>(Pair::default_element_name());
        registry
    }

    const MIXED: &str = r#"<t:Pair xmlns:t="urn:test"><t:Leaf value="1"/><t:Other/></t:Pair>"#;

    #[test]
    fn unknown_child_fails_strict_unmarshal() {
        let root = parse(MIXED).unwrap();
        let err = registry()
            .unmarshall(&root, UnmarshallingPolicy::strict())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownElement(_)));
    }

    #[test]
    fn unknown_child_is_skipped_when_lenient() {
        let root = parse(MIXED).unwrap();
        let policy = UnmarshallingPolicy {
            ignore_unknown_elements: true,
            ..UnmarshallingPolicy::default()
        };
        let object = registry().unmarshall(&root, policy).unwrap();
        let pair = object.downcast::<Pair>().unwrap();
        let pair = pair.borrow();
        let first = pair.first.as_ref().unwrap().downcast::<Leaf>().unwrap();
        assert_eq!(first.borrow().value.as_deref(), Some("1"));
        assert!(pair.second.is_none());
    }

    #[test]
    fn unknown_attribute_follows_policy() {
        let root = parse(r#"<t:Leaf xmlns:t="urn:test" value="v" extra="x"/>"#).unwrap();
        let err = registry()
            .unmarshall(&root, UnmarshallingPolicy::strict())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute(_)));
        let policy = UnmarshallingPolicy {
            ignore_unknown_attributes: true,
            ..UnmarshallingPolicy::default()
        };
        let leaf = registry().unmarshall(&root, policy).unwrap();
        assert_eq!(
            leaf.downcast::<Leaf>().unwrap().borrow().value.as_deref(),
            Some("v")
        );
    }

    #[test]
    fn unregistered_root_has_no_builder() {
        let root = parse(r#"<x:Nope xmlns:x="urn:x"/>"#).unwrap();
        let err = registry()
            .unmarshall(&root, UnmarshallingPolicy::lenient())
            .unwrap_err();
        assert!(matches!(err, Error::BuilderNotFound(_)));
    }

    #[test]
    fn parsed_tree_marshalls_to_source() {
        let xml = r#"<t:Pair xmlns:t="urn:test"><t:Pair><t:Leaf value="a"/></t:Pair><t:Leaf/></t:Pair>"#;
        let root = parse(xml).unwrap();
        let registry = registry();
        let object = registry.unmarshall(&root, UnmarshallingPolicy::strict()).unwrap();
        let marshalled = registry.marshall(&object).unwrap();
        assert!(marshalled.ptr_eq(&root));
    }

    #[test]
    fn rebuilt_tree_is_dom_equal() {
        let xml = r#"<t:Pair xmlns:t="urn:test"><t:Leaf value="a"/><t:Leaf value="b"/></t:Pair>"#;
        let root = parse(xml).unwrap();
        let registry = registry();
        let object = registry.unmarshall(&root, UnmarshallingPolicy::strict()).unwrap();
        object.node().invalidate();
        {
            let pair = object.downcast::<Pair>().unwrap();
            let pair = pair.borrow();
            for child in pair.first.iter().chain(pair.second.iter()) {
                child.node().release_dom();
            }
        }
        let marshalled = registry.marshall(&object).unwrap();
        assert!(!marshalled.ptr_eq(&root));
        assert_eq!(to_string(&marshalled), to_string(&root));
    }

    #[test]
    fn wrong_child_type_is_illegal_add() {
        let mut registry = registry();
        // Leaf elements now build Pair nodes, which the Leaf slot rejects.
        registry.register_type::<Pair>(Leaf::default_element_name());
        let root = parse(r#"<t:Pair xmlns:t="urn:test"><t:Leaf/></t:Pair>"#).unwrap();
        let err = registry
            .unmarshall(&root, UnmarshallingPolicy::lenient())
            .unwrap_err();
        assert!(matches!(err, Error::IllegalAdd(_)));
    }

    #[test]
    fn xsi_type_selects_provider() {
        let mut registry = registry();
        registry.register_type::<Leaf>(QName::new("urn:types", "LeafType"));
        let xml = r#"<o:Thing xmlns:o="urn:other" xmlns:ty="urn:types" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="ty:LeafType" value="z"/>"#;
        let root = parse(xml).unwrap();
        let object = registry.unmarshall(&root, UnmarshallingPolicy::strict()).unwrap();
        assert!(object.is::<Leaf>());
        assert_eq!(object.element_name(), &QName::new("urn:other", "Thing"));
        assert_eq!(
            object.borrow().base().schema_type(),
            Some(&QName::new("urn:types", "LeafType"))
        );
    }

    #[test]
    fn undeclared_xsi_type_prefix_is_an_error() {
        let mut registry = registry();
        registry.register_type::<Leaf>(QName::new("urn:other", "Thing"));
        let xml = r#"<o:Thing xmlns:o="urn:other" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="nope:T"/>"#;
        let root = parse(xml).unwrap();
        assert!(matches!(
            registry.unmarshall(&root, UnmarshallingPolicy::lenient()),
            Err(Error::Unmarshalling(_))
        ));
    }
}
