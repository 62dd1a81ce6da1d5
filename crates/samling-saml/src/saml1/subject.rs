#![forbid(unsafe_code)]

use super::{versioned_text, versioned_type};
use crate::{datetime, SamlVersion};
use chrono::{DateTime, Utc};
use samling_core::{ns, QName, Result};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{XmlHandle, XmlObject, XmlObjectBase, XmlObjectChildrenList, XmlObjectRef};

versioned_text!(
    /// `<saml1:ConfirmationMethod>`
    ConfirmationMethod, ns::saml::CONFIRMATION_METHOD
);

/// `<saml1:AuthenticationStatement>`
#[derive(Debug)]
pub struct AuthenticationStatement {
    base: XmlObjectBase,
    version: SamlVersion,
    method: Option<String>,
    instant: Option<DateTime<Utc>>,
    subject: Option<XmlHandle<Subject>>,
}

impl AuthenticationStatement {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            version,
            method: None,
            instant: None,
            subject: None,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn authentication_method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn set_authentication_method(&mut self, method: Option<&str>) {
        self.base.assign(&mut self.method, method.map(str::to_owned));
    }

    pub fn authentication_instant(&self) -> Option<&DateTime<Utc>> {
        self.instant.as_ref()
    }

    pub fn set_authentication_instant(&mut self, instant: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.instant, instant);
    }

    pub fn subject(&self) -> Option<&XmlHandle<Subject>> {
        self.subject.as_ref()
    }

    pub fn set_subject(&mut self, subject: Option<XmlHandle<Subject>>) -> Result<()> {
        self.base.set_child(&mut self.subject, subject)
    }
}

impl XmlObject for AuthenticationStatement {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.subject.iter().map(XmlHandle::erase).collect()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(method) = &self.method {
            element.set_attribute_local(ns::attr::AUTHENTICATION_METHOD, method.as_str());
        }
        datetime::write(element, ns::attr::AUTHENTICATION_INSTANT, self.instant.as_ref());
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        match attribute.name.local_name() {
            ns::attr::AUTHENTICATION_METHOD => self.method = Some(attribute.value.clone()),
            ns::attr::AUTHENTICATION_INSTANT => {
                self.instant = Some(datetime::parse(
                    &attribute.value,
                    ns::attr::AUTHENTICATION_INSTANT,
                )?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(subject) = child.downcast::<Subject>() else {
            return Ok(false);
        };
        self.set_subject(Some(subject))?;
        Ok(true)
    }
}

versioned_type!(AuthenticationStatement, ns::saml::AUTHENTICATION_STATEMENT);

/// `<saml1:Subject>`
#[derive(Debug)]
pub struct Subject {
    base: XmlObjectBase,
    version: SamlVersion,
    name_identifier: Option<XmlHandle<NameIdentifier>>,
    confirmation: Option<XmlHandle<SubjectConfirmation>>,
}

impl Subject {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            version,
            name_identifier: None,
            confirmation: None,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn name_identifier(&self) -> Option<&XmlHandle<NameIdentifier>> {
        self.name_identifier.as_ref()
    }

    pub fn set_name_identifier(&mut self, name: Option<XmlHandle<NameIdentifier>>) -> Result<()> {
        self.base.set_child(&mut self.name_identifier, name)
    }

    pub fn subject_confirmation(&self) -> Option<&XmlHandle<SubjectConfirmation>> {
        self.confirmation.as_ref()
    }

    pub fn set_subject_confirmation(
        &mut self,
        confirmation: Option<XmlHandle<SubjectConfirmation>>,
    ) -> Result<()> {
        self.base.set_child(&mut self.confirmation, confirmation)
    }
}

impl XmlObject for Subject {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::with_capacity(2);
        children.extend(self.name_identifier.iter().map(XmlHandle::erase));
        children.extend(self.confirmation.iter().map(XmlHandle::erase));
        children
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(name) = child.downcast::<NameIdentifier>() {
            self.set_name_identifier(Some(name))?;
        } else if let Some(confirmation) = child.downcast::<SubjectConfirmation>() {
            self.set_subject_confirmation(Some(confirmation))?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

versioned_type!(Subject, ns::saml::SUBJECT);

/// `<saml1:NameIdentifier>`
#[derive(Debug)]
pub struct NameIdentifier {
    base: XmlObjectBase,
    version: SamlVersion,
    value: Option<String>,
    format: Option<String>,
    name_qualifier: Option<String>,
}

impl NameIdentifier {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            version,
            value: None,
            format: None,
            name_qualifier: None,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.value, value.map(str::to_owned));
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn set_format(&mut self, format: Option<&str>) {
        self.base.assign(&mut self.format, format.map(str::to_owned));
    }

    pub fn name_qualifier(&self) -> Option<&str> {
        self.name_qualifier.as_deref()
    }

    pub fn set_name_qualifier(&mut self, qualifier: Option<&str>) {
        self.base.assign(&mut self.name_qualifier, qualifier.map(str::to_owned));
    }
}

impl XmlObject for NameIdentifier {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(qualifier) = &self.name_qualifier {
            element.set_attribute_local(ns::attr::NAME_QUALIFIER, qualifier.as_str());
        }
        if let Some(format) = &self.format {
            element.set_attribute_local(ns::attr::FORMAT, format.as_str());
        }
        Ok(())
    }

    fn marshall_content(&self, element: &Element) -> Result<()> {
        if let Some(value) = &self.value {
            element.set_text(value);
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        match attribute.name.local_name() {
            ns::attr::NAME_QUALIFIER => self.name_qualifier = Some(attribute.value.clone()),
            ns::attr::FORMAT => self.format = Some(attribute.value.clone()),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_content(&mut self, text: &str) -> Result<()> {
        self.value = Some(text.trim().to_owned());
        Ok(())
    }
}

versioned_type!(NameIdentifier, ns::saml::NAME_IDENTIFIER);

/// `<saml1:SubjectConfirmation>`: one or more confirmation methods.
#[derive(Debug)]
pub struct SubjectConfirmation {
    base: XmlObjectBase,
    version: SamlVersion,
    methods: XmlObjectChildrenList<XmlHandle<ConfirmationMethod>>,
}

impl SubjectConfirmation {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        let base = XmlObjectBase::new(element_name);
        let methods = XmlObjectChildrenList::new(&base);
        Self {
            base,
            version,
            methods,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn confirmation_methods(&self) -> &XmlObjectChildrenList<XmlHandle<ConfirmationMethod>> {
        &self.methods
    }

    pub fn confirmation_methods_mut(
        &mut self,
    ) -> &mut XmlObjectChildrenList<XmlHandle<ConfirmationMethod>> {
        &mut self.methods
    }
}

impl XmlObject for SubjectConfirmation {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.methods.erased().collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(method) = child.downcast::<ConfirmationMethod>() else {
            return Ok(false);
        };
        self.methods.push(method)?;
        Ok(true)
    }
}

versioned_type!(SubjectConfirmation, ns::saml::SUBJECT_CONFIRMATION);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::registry;
    use samling_xmlobject::{UnmarshallingPolicy, XmlObjectType};

    #[test]
    fn confirmation_methods_keep_order() {
        let registry = registry();
        let confirmation = SubjectConfirmation::build();
        for uri in [
            "urn:oasis:names:tc:SAML:1.0:cm:bearer",
            "urn:oasis:names:tc:SAML:1.0:cm:holder-of-key",
        ] {
            let method = ConfirmationMethod::build();
            method.borrow_mut().set_value(Some(uri));
            confirmation
                .borrow_mut()
                .confirmation_methods_mut()
                .push(method)
                .unwrap();
        }
        let xml = samling_xml::writer::to_string(&registry.marshall(&confirmation.erase()).unwrap());
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<SubjectConfirmation>()
            .unwrap();
        let values: Vec<String> = back
            .borrow()
            .confirmation_methods()
            .iter()
            .filter_map(|m| m.borrow().value().map(str::to_owned))
            .collect();
        assert_eq!(
            values,
            [
                "urn:oasis:names:tc:SAML:1.0:cm:bearer",
                "urn:oasis:names:tc:SAML:1.0:cm:holder-of-key"
            ]
        );
    }

    #[test]
    fn name_identifier_change_invalidates_statement() {
        let registry = registry();
        let statement = AuthenticationStatement::build();
        let subject = Subject::build();
        let name = NameIdentifier::build();
        subject.borrow_mut().set_name_identifier(Some(name.clone())).unwrap();
        statement.borrow_mut().set_subject(Some(subject)).unwrap();
        registry.marshall(&statement.erase()).unwrap();
        assert!(statement.dom().is_some());

        name.borrow_mut().set_format(Some("urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress"));
        assert!(name.dom().is_none());
        assert!(statement.dom().is_none());
    }
}
