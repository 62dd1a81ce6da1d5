#![forbid(unsafe_code)]

//! XML Schema built-in types used as open content.

use crate::base::XmlObjectBase;
use crate::collections::XmlObjectChildrenList;
use crate::object::{XmlObject, XmlObjectRef, XmlObjectType};
use samling_core::{ns, QName, Result};
use samling_xml::{Attribute, Element};

/// An element whose content is a single `xs:string`.
#[derive(Debug)]
pub struct XsString {
    base: XmlObjectBase,
    value: Option<String>,
}

impl XsString {
    pub fn type_name() -> QName {
        QName::with_prefix(ns::XS, "string", ns::prefix::XS)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.value, value.map(str::to_owned));
    }
}

impl XmlObject for XsString {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn marshall_content(&self, element: &Element) -> Result<()> {
        if let Some(value) = &self.value {
            element.set_text(value);
        }
        Ok(())
    }

    fn process_content(&mut self, text: &str) -> Result<()> {
        self.value = Some(text.to_owned());
        Ok(())
    }
}

impl XmlObjectType for XsString {
    fn default_element_name() -> QName {
        Self::type_name()
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            value: None,
        }
    }
}

/// An element of any content: it keeps every attribute, every child and
/// its text.
#[derive(Debug)]
pub struct XsAny {
    base: XmlObjectBase,
    attributes: Vec<Attribute>,
    children: XmlObjectChildrenList<XmlObjectRef>,
    text: Option<String>,
}

impl XsAny {
    pub fn type_name() -> QName {
        QName::with_prefix(ns::XS, "anyType", ns::prefix::XS)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) if existing.value == value => return,
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute::new(name, value)),
        }
        self.base.invalidate();
    }

    pub fn children(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut XmlObjectChildrenList<XmlObjectRef> {
        &mut self.children
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<&str>) {
        self.base.assign(&mut self.text, text.map(str::to_owned));
    }
}

impl XmlObject for XsAny {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.children.as_slice().to_vec()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        for attribute in &self.attributes {
            if let Some(prefix) = attribute.name.prefix() {
                if element.declared_namespace(prefix).is_none() {
                    element.declare_namespace(prefix, attribute.name.namespace_uri());
                }
            }
            element.set_attribute(attribute.name.clone(), attribute.value.as_str());
        }
        Ok(())
    }

    fn marshall_content(&self, element: &Element) -> Result<()> {
        if let Some(text) = &self.text {
            element.append_text(text);
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        self.attributes.push(attribute.clone());
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        self.children.push(child)?;
        Ok(true)
    }

    fn process_content(&mut self, text: &str) -> Result<()> {
        self.text = Some(text.to_owned());
        Ok(())
    }
}

impl XmlObjectType for XsAny {
    fn default_element_name() -> QName {
        Self::type_name()
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let children = XmlObjectChildrenList::new(&base);
        Self {
            base,
            attributes: Vec::new(),
            children,
            text: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::tests::Leaf;
    use crate::registry::XmlObjectProviderRegistry;
    use crate::unmarshall::UnmarshallingPolicy;
    use samling_xml::parse;

    fn registry() -> XmlObjectProviderRegistry {
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<XsString>(XsString::type_name());
        registry.register_type::<XsAny>(QName::new("urn:any", "Bag"));
        registry.register_type::<Leaf>(Leaf::default_element_name());
        registry
    }

    #[test]
    fn typed_string_value() {
        let xml = r#"<v:Value xmlns:v="urn:v" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="xs:string">member</v:Value>"#;
        let object = registry()
            .unmarshall(&parse(xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap();
        let value = object.downcast::<XsString>().unwrap();
        assert_eq!(value.borrow().value(), Some("member"));

        value.borrow_mut().set_value(Some("staff"));
        let element = registry().marshall(&object).unwrap();
        assert_eq!(element.text(), "staff");
        assert_eq!(
            element.attribute(&QName::new(ns::XSI, "type")).as_deref(),
            Some("xs:string")
        );
    }

    #[test]
    fn any_keeps_everything() {
        let xml = r#"<a:Bag xmlns:a="urn:any" xmlns:t="urn:test" kind="k"><t:Leaf value="1"/></a:Bag>"#;
        let registry = registry();
        let object = registry
            .unmarshall(&parse(xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap();
        let bag = object.downcast::<XsAny>().unwrap();
        assert_eq!(bag.borrow().attribute(&QName::local("kind")), Some("k"));
        assert_eq!(bag.borrow().children().len(), 1);

        bag.borrow_mut().set_attribute(QName::local("kind"), "other");
        let element = registry.marshall(&object).unwrap();
        assert_eq!(element.attribute_local("kind").as_deref(), Some("other"));
        assert_eq!(element.child_elements().len(), 1);
    }

    #[test]
    fn any_text_content() {
        let bag = XsAny::build();
        bag.borrow_mut().set_text(Some("free text"));
        let mut registry = XmlObjectProviderRegistry::new();
        registry.register_type::<XsAny>(XsAny::type_name());
        let element = registry.marshall(&bag.erase()).unwrap();
        assert_eq!(element.text(), "free text");
    }
}
