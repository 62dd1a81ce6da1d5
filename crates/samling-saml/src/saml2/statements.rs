#![forbid(unsafe_code)]

use super::saml;
use crate::datetime;
use chrono::{DateTime, Utc};
use samling_core::{ns, Error, QName, Result};
use samling_xml::{Attribute as DomAttribute, Element};
use samling_xmlobject::{
    text_element, XmlHandle, XmlObject, XmlObjectBase, XmlObjectChildrenList, XmlObjectRef,
    XmlObjectType, XsAny, XsString,
};

text_element!(
    /// `<saml2:AuthnContextClassRef>`
    AuthnContextClassRef, ns::SAML2, ns::saml::AUTHN_CONTEXT_CLASS_REF, ns::prefix::SAML2
);

/// Common authentication context classes.
pub mod class_ref {
    pub const PASSWORD: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:Password";
    pub const PASSWORD_PROTECTED_TRANSPORT: &str =
        "urn:oasis:names:tc:SAML:2.0:ac:classes:PasswordProtectedTransport";
    pub const X509: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:X509";
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:ac:classes:unspecified";
}

/// `<saml2:AuthnStatement>`
#[derive(Debug)]
pub struct AuthnStatement {
    base: XmlObjectBase,
    authn_instant: Option<DateTime<Utc>>,
    session_index: Option<String>,
    session_not_on_or_after: Option<DateTime<Utc>>,
    authn_context: Option<XmlHandle<AuthnContext>>,
}

impl AuthnStatement {
    pub fn authn_instant(&self) -> Option<&DateTime<Utc>> {
        self.authn_instant.as_ref()
    }

    pub fn set_authn_instant(&mut self, value: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.authn_instant, value);
    }

    pub fn session_index(&self) -> Option<&str> {
        self.session_index.as_deref()
    }

    pub fn set_session_index(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.session_index, value.map(str::to_owned));
    }

    pub fn session_not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.session_not_on_or_after.as_ref()
    }

    pub fn set_session_not_on_or_after(&mut self, value: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.session_not_on_or_after, value);
    }

    pub fn authn_context(&self) -> Option<&XmlHandle<AuthnContext>> {
        self.authn_context.as_ref()
    }

    pub fn set_authn_context(&mut self, context: Option<XmlHandle<AuthnContext>>) -> Result<()> {
        self.base.set_child(&mut self.authn_context, context)
    }
}

impl XmlObject for AuthnStatement {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.authn_context.iter().map(XmlHandle::erase).collect()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        datetime::write(element, ns::attr::AUTHN_INSTANT, self.authn_instant.as_ref());
        if let Some(index) = &self.session_index {
            element.set_attribute_local(ns::attr::SESSION_INDEX, index.as_str());
        }
        datetime::write(
            element,
            ns::attr::SESSION_NOT_ON_OR_AFTER,
            self.session_not_on_or_after.as_ref(),
        );
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &DomAttribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        let value = &attribute.value;
        match attribute.name.local_name() {
            ns::attr::AUTHN_INSTANT => {
                self.authn_instant = Some(datetime::parse(value, ns::attr::AUTHN_INSTANT)?)
            }
            ns::attr::SESSION_INDEX => self.session_index = Some(value.clone()),
            ns::attr::SESSION_NOT_ON_OR_AFTER => {
                self.session_not_on_or_after =
                    Some(datetime::parse(value, ns::attr::SESSION_NOT_ON_OR_AFTER)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(context) = child.downcast::<AuthnContext>() else {
            return Ok(false);
        };
        self.set_authn_context(Some(context))?;
        Ok(true)
    }
}

impl XmlObjectType for AuthnStatement {
    fn default_element_name() -> QName {
        saml(ns::saml::AUTHN_STATEMENT)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            authn_instant: None,
            session_index: None,
            session_not_on_or_after: None,
            authn_context: None,
        }
    }
}

/// `<saml2:AuthnContext>`
#[derive(Debug)]
pub struct AuthnContext {
    base: XmlObjectBase,
    class_ref: Option<XmlHandle<AuthnContextClassRef>>,
}

impl AuthnContext {
    /// A context naming the class `uri`.
    pub fn with_class_ref(uri: &str) -> Result<XmlHandle<AuthnContext>> {
        let class_ref = AuthnContextClassRef::build();
        class_ref.borrow_mut().set_value(Some(uri));
        let context = Self::build();
        context.borrow_mut().set_class_ref(Some(class_ref))?;
        Ok(context)
    }

    pub fn class_ref(&self) -> Option<&XmlHandle<AuthnContextClassRef>> {
        self.class_ref.as_ref()
    }

    pub fn set_class_ref(&mut self, class_ref: Option<XmlHandle<AuthnContextClassRef>>) -> Result<()> {
        self.base.set_child(&mut self.class_ref, class_ref)
    }
}

impl XmlObject for AuthnContext {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.class_ref.iter().map(XmlHandle::erase).collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(class_ref) = child.downcast::<AuthnContextClassRef>() else {
            return Ok(false);
        };
        self.set_class_ref(Some(class_ref))?;
        Ok(true)
    }
}

impl XmlObjectType for AuthnContext {
    fn default_element_name() -> QName {
        saml(ns::saml::AUTHN_CONTEXT)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            class_ref: None,
        }
    }
}

/// `<saml2:AttributeStatement>`
#[derive(Debug)]
pub struct AttributeStatement {
    base: XmlObjectBase,
    attributes: XmlObjectChildrenList<XmlHandle<Attribute>>,
}

impl AttributeStatement {
    pub fn attributes(&self) -> &XmlObjectChildrenList<XmlHandle<Attribute>> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut XmlObjectChildrenList<XmlHandle<Attribute>> {
        &mut self.attributes
    }

    /// The first attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<XmlHandle<Attribute>> {
        self.attributes
            .iter()
            .find(|a| a.borrow().name() == Some(name))
            .cloned()
    }
}

impl XmlObject for AttributeStatement {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.attributes.erased().collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(attribute) = child.downcast::<Attribute>() else {
            return Ok(false);
        };
        self.attributes.push(attribute)?;
        Ok(true)
    }
}

impl XmlObjectType for AttributeStatement {
    fn default_element_name() -> QName {
        saml(ns::saml::ATTRIBUTE_STATEMENT)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let attributes = XmlObjectChildrenList::new(&base);
        Self { base, attributes }
    }
}

/// `<saml2:Attribute>` with its values.
///
/// Values are `<saml2:AttributeValue>` elements of whatever schema type
/// they declare; see [`AttributeValue`].
#[derive(Debug)]
pub struct Attribute {
    base: XmlObjectBase,
    name: Option<String>,
    name_format: Option<String>,
    friendly_name: Option<String>,
    values: XmlObjectChildrenList<XmlObjectRef>,
}

impl Attribute {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.name, value.map(str::to_owned));
    }

    pub fn name_format(&self) -> Option<&str> {
        self.name_format.as_deref()
    }

    pub fn set_name_format(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.name_format, value.map(str::to_owned));
    }

    pub fn friendly_name(&self) -> Option<&str> {
        self.friendly_name.as_deref()
    }

    pub fn set_friendly_name(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.friendly_name, value.map(str::to_owned));
    }

    pub fn values(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.values
    }

    /// Add a value node. It must be named `<saml2:AttributeValue>`.
    pub fn push_value(&mut self, value: XmlObjectRef) -> Result<()> {
        if value.element_name() != &AttributeValue::element_name() {
            return Err(Error::IllegalAdd(format!(
                "{} is not an AttributeValue",
                value.element_name()
            )));
        }
        self.values.push(value)
    }

    /// Add an `xs:string` value.
    pub fn push_string_value(&mut self, value: &str) -> Result<()> {
        self.push_value(AttributeValue::string(value).erase())
    }

    pub fn remove_value(&mut self, value: &XmlObjectRef) -> bool {
        self.values.remove_item(value)
    }

    /// The text of every value, in order. Values with element content are
    /// skipped.
    pub fn string_values(&self) -> Vec<String> {
        self.values.iter().filter_map(AttributeValue::text).collect()
    }
}

impl XmlObject for Attribute {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.values.as_slice().to_vec()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        let attributes = [
            (ns::attr::NAME, &self.name),
            (ns::attr::NAME_FORMAT, &self.name_format),
            (ns::attr::FRIENDLY_NAME, &self.friendly_name),
        ];
        for (name, value) in attributes {
            if let Some(value) = value {
                element.set_attribute_local(name, value.as_str());
            }
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &DomAttribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        let slot = match attribute.name.local_name() {
            ns::attr::NAME => &mut self.name,
            ns::attr::NAME_FORMAT => &mut self.name_format,
            ns::attr::FRIENDLY_NAME => &mut self.friendly_name,
            _ => return Ok(false),
        };
        *slot = Some(attribute.value.clone());
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if child.element_name() != &AttributeValue::element_name() {
            return Ok(false);
        }
        self.values.push(child)?;
        Ok(true)
    }
}

impl XmlObjectType for Attribute {
    fn default_element_name() -> QName {
        saml(ns::saml::ATTRIBUTE)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let values = XmlObjectChildrenList::new(&base);
        Self {
            base,
            name: None,
            name_format: None,
            friendly_name: None,
            values,
        }
    }
}

/// `<saml2:AttributeValue>`.
///
/// The element is typed by its `xsi:type`: an `xs:string` value is an
/// [`XsString`], an untyped or unknown one an [`XsAny`].
pub struct AttributeValue;

impl AttributeValue {
    pub fn element_name() -> QName {
        saml(ns::saml::ATTRIBUTE_VALUE)
    }

    /// A value of schema type `xs:string`.
    pub fn string(value: &str) -> XmlHandle<XsString> {
        let node = XsString::with_name(Self::element_name());
        let handle = XmlHandle::new(node);
        {
            let mut v = handle.borrow_mut();
            v.base_mut().set_schema_type(Some(XsString::type_name()));
            v.set_value(Some(value));
        }
        handle
    }

    /// The text content of a value node, whatever its type.
    pub fn text(value: &XmlObjectRef) -> Option<String> {
        if let Some(string) = value.downcast::<XsString>() {
            let text = string.borrow().value().map(str::to_owned);
            return text;
        }
        let any = value.downcast::<XsAny>()?;
        let node = any.borrow();
        let text = if node.children().is_empty() {
            node.text().map(str::to_owned)
        } else {
            None
        };
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::registry;
    use samling_xmlobject::UnmarshallingPolicy;

    const ATTRIBUTES: &str = r#"<saml2:AttributeStatement xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><saml2:Attribute Name="mail" FriendlyName="email"><saml2:AttributeValue xsi:type="xs:string">alice@example.org</saml2:AttributeValue><saml2:AttributeValue>a@example.org</saml2:AttributeValue></saml2:Attribute><saml2:Attribute Name="groups"><saml2:AttributeValue><g xmlns="urn:groups">staff</g></saml2:AttributeValue></saml2:Attribute></saml2:AttributeStatement>"#;

    #[test]
    fn values_dispatch_on_schema_type() {
        let registry = registry();
        let statement = registry
            .unmarshall(&samling_xml::parse(ATTRIBUTES).unwrap(), UnmarshallingPolicy::lenient())
            .unwrap()
            .downcast::<AttributeStatement>()
            .unwrap();
        let mail = statement.borrow().attribute("mail").unwrap();
        let mail = mail.borrow();
        assert_eq!(mail.friendly_name(), Some("email"));
        assert!(mail.values().get(0).unwrap().is::<XsString>());
        assert!(mail.values().get(1).unwrap().is::<XsAny>());
        assert_eq!(mail.string_values(), ["alice@example.org", "a@example.org"]);

        let groups = statement.borrow().attribute("groups").unwrap();
        assert!(groups.borrow().string_values().is_empty());
    }

    #[test]
    fn string_value_writes_xsi_type() {
        let registry = registry();
        let attribute = Attribute::build();
        attribute.borrow_mut().set_name(Some("uid"));
        attribute.borrow_mut().push_string_value("alice").unwrap();
        let element = registry.marshall(&attribute.erase()).unwrap();
        let value = element.first_child(ns::SAML2, ns::saml::ATTRIBUTE_VALUE).unwrap();
        assert_eq!(
            value.attribute(&QName::new(ns::XSI, "type")).as_deref(),
            Some("xs:string")
        );
        assert_eq!(value.text(), "alice");
    }

    #[test]
    fn only_attribute_values_are_accepted() {
        let attribute = Attribute::build();
        let stray = XsString::build();
        assert!(matches!(
            attribute.borrow_mut().push_value(stray.erase()),
            Err(Error::IllegalAdd(_))
        ));
    }

    #[test]
    fn authn_statement_round_trip() {
        let registry = registry();
        let statement = AuthnStatement::build();
        {
            let mut s = statement.borrow_mut();
            s.set_authn_instant(Some(datetime::parse("2030-01-01T00:00:00Z", "t").unwrap()));
            s.set_session_index(Some("_s1"));
            s.set_authn_context(Some(
                AuthnContext::with_class_ref(class_ref::PASSWORD_PROTECTED_TRANSPORT).unwrap(),
            ))
            .unwrap();
        }
        let xml = samling_xml::writer::to_string(&registry.marshall(&statement.erase()).unwrap());
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<AuthnStatement>()
            .unwrap();
        let back = back.borrow();
        assert_eq!(back.session_index(), Some("_s1"));
        let context = back.authn_context().unwrap().borrow();
        let class_ref = context.class_ref().unwrap().borrow();
        assert_eq!(class_ref.value(), Some(class_ref::PASSWORD_PROTECTED_TRANSPORT));
    }
}
