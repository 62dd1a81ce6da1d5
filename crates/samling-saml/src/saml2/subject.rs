#![forbid(unsafe_code)]

use super::{saml, NameId};
use crate::datetime;
use chrono::{DateTime, Utc};
use samling_core::{ns, QName, Result};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    XmlHandle, XmlObject, XmlObjectBase, XmlObjectChildrenList, XmlObjectRef, XmlObjectType,
};

/// Subject confirmation methods.
pub mod method {
    pub const BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
    pub const HOLDER_OF_KEY: &str = "urn:oasis:names:tc:SAML:2.0:cm:holder-of-key";
    pub const SENDER_VOUCHES: &str = "urn:oasis:names:tc:SAML:2.0:cm:sender-vouches";
}

/// `<saml2:Subject>`
#[derive(Debug)]
pub struct Subject {
    base: XmlObjectBase,
    name_id: Option<XmlHandle<NameId>>,
    confirmations: XmlObjectChildrenList<XmlHandle<SubjectConfirmation>>,
}

impl Subject {
    pub fn name_id(&self) -> Option<&XmlHandle<NameId>> {
        self.name_id.as_ref()
    }

    pub fn set_name_id(&mut self, name_id: Option<XmlHandle<NameId>>) -> Result<()> {
        self.base.set_child(&mut self.name_id, name_id)
    }

    pub fn subject_confirmations(&self) -> &XmlObjectChildrenList<XmlHandle<SubjectConfirmation>> {
        &self.confirmations
    }

    pub fn subject_confirmations_mut(
        &mut self,
    ) -> &mut XmlObjectChildrenList<XmlHandle<SubjectConfirmation>> {
        &mut self.confirmations
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
        self.name_id
            .iter()
            .map(XmlHandle::erase)
            .chain(self.confirmations.erased())
            .collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(name_id) = child.downcast::<NameId>() {
            self.set_name_id(Some(name_id))?;
        } else if let Some(confirmation) = child.downcast::<SubjectConfirmation>() {
            self.confirmations.push(confirmation)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for Subject {
    fn default_element_name() -> QName {
        saml(ns::saml::SUBJECT)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let confirmations = XmlObjectChildrenList::new(&base);
        Self {
            base,
            name_id: None,
            confirmations,
        }
    }
}

/// `<saml2:SubjectConfirmation Method="...">`
#[derive(Debug)]
pub struct SubjectConfirmation {
    base: XmlObjectBase,
    method: Option<String>,
    name_id: Option<XmlHandle<NameId>>,
    data: Option<XmlHandle<SubjectConfirmationData>>,
}

impl SubjectConfirmation {
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn set_method(&mut self, method: Option<&str>) {
        self.base.assign(&mut self.method, method.map(str::to_owned));
    }

    pub fn name_id(&self) -> Option<&XmlHandle<NameId>> {
        self.name_id.as_ref()
    }

    pub fn set_name_id(&mut self, name_id: Option<XmlHandle<NameId>>) -> Result<()> {
        self.base.set_child(&mut self.name_id, name_id)
    }

    pub fn subject_confirmation_data(&self) -> Option<&XmlHandle<SubjectConfirmationData>> {
        self.data.as_ref()
    }

    pub fn set_subject_confirmation_data(
        &mut self,
        data: Option<XmlHandle<SubjectConfirmationData>>,
    ) -> Result<()> {
        self.base.set_child(&mut self.data, data)
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
        let mut children = Vec::new();
        children.extend(self.name_id.iter().map(XmlHandle::erase));
        children.extend(self.data.iter().map(XmlHandle::erase));
        children
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(method) = &self.method {
            element.set_attribute_local(ns::attr::METHOD, method.as_str());
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() || attribute.name.local_name() != ns::attr::METHOD {
            return Ok(false);
        }
        self.method = Some(attribute.value.clone());
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(name_id) = child.downcast::<NameId>() {
            self.set_name_id(Some(name_id))?;
        } else if let Some(data) = child.downcast::<SubjectConfirmationData>() {
            self.set_subject_confirmation_data(Some(data))?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for SubjectConfirmation {
    fn default_element_name() -> QName {
        saml(ns::saml::SUBJECT_CONFIRMATION)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            method: None,
            name_id: None,
            data: None,
        }
    }
}

/// `<saml2:SubjectConfirmationData>`: validity window and recipient of
/// a confirmation, with open element content (such as `<ds:KeyInfo>`
/// for holder-of-key).
#[derive(Debug)]
pub struct SubjectConfirmationData {
    base: XmlObjectBase,
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    recipient: Option<String>,
    in_response_to: Option<String>,
    address: Option<String>,
    children: XmlObjectChildrenList<XmlObjectRef>,
}

impl SubjectConfirmationData {
    pub fn not_before(&self) -> Option<&DateTime<Utc>> {
        self.not_before.as_ref()
    }

    pub fn set_not_before(&mut self, value: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.not_before, value);
    }

    pub fn not_on_or_after(&self) -> Option<&DateTime<Utc>> {
        self.not_on_or_after.as_ref()
    }

    pub fn set_not_on_or_after(&mut self, value: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.not_on_or_after, value);
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    pub fn set_recipient(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.recipient, value.map(str::to_owned));
    }

    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    pub fn set_in_response_to(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.in_response_to, value.map(str::to_owned));
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn set_address(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.address, value.map(str::to_owned));
    }

    pub fn children(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut XmlObjectChildrenList<XmlObjectRef> {
        &mut self.children
    }
}

impl XmlObject for SubjectConfirmationData {
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
        datetime::write(element, ns::attr::NOT_BEFORE, self.not_before.as_ref());
        datetime::write(element, ns::attr::NOT_ON_OR_AFTER, self.not_on_or_after.as_ref());
        let strings = [
            (ns::attr::RECIPIENT, &self.recipient),
            (ns::attr::IN_RESPONSE_TO, &self.in_response_to),
            (ns::attr::ADDRESS, &self.address),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                element.set_attribute_local(name, value.as_str());
            }
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        let value = &attribute.value;
        match attribute.name.local_name() {
            ns::attr::NOT_BEFORE => {
                self.not_before = Some(datetime::parse(value, ns::attr::NOT_BEFORE)?)
            }
            ns::attr::NOT_ON_OR_AFTER => {
                self.not_on_or_after = Some(datetime::parse(value, ns::attr::NOT_ON_OR_AFTER)?)
            }
            ns::attr::RECIPIENT => self.recipient = Some(value.clone()),
            ns::attr::IN_RESPONSE_TO => self.in_response_to = Some(value.clone()),
            ns::attr::ADDRESS => self.address = Some(value.clone()),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        self.children.push(child)?;
        Ok(true)
    }
}

impl XmlObjectType for SubjectConfirmationData {
    fn default_element_name() -> QName {
        saml(ns::saml::SUBJECT_CONFIRMATION_DATA)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let children = XmlObjectChildrenList::new(&base);
        Self {
            base,
            not_before: None,
            not_on_or_after: None,
            recipient: None,
            in_response_to: None,
            address: None,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::registry;
    use chrono::TimeZone;
    use samling_dsig::KeyInfo;
    use samling_xmlobject::UnmarshallingPolicy;

    fn bearer_subject() -> XmlHandle<Subject> {
        let subject = Subject::build();
        let name_id = NameId::build();
        name_id.borrow_mut().set_value(Some("alice"));
        subject.borrow_mut().set_name_id(Some(name_id)).unwrap();
        let confirmation = SubjectConfirmation::build();
        confirmation.borrow_mut().set_method(Some(method::BEARER));
        let data = SubjectConfirmationData::build();
        data.borrow_mut()
            .set_not_on_or_after(Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 5, 0).unwrap()));
        data.borrow_mut().set_recipient(Some("https://sp.example.org/acs"));
        confirmation
            .borrow_mut()
            .set_subject_confirmation_data(Some(data))
            .unwrap();
        subject
            .borrow_mut()
            .subject_confirmations_mut()
            .push(confirmation)
            .unwrap();
        subject
    }

    #[test]
    fn name_id_precedes_confirmations() {
        let registry = registry();
        let subject = bearer_subject();
        let element = registry.marshall(&subject.erase()).unwrap();
        let names: Vec<String> = element
            .child_elements()
            .iter()
            .map(|c| c.name().local_name().to_owned())
            .collect();
        assert_eq!(names, ["NameID", "SubjectConfirmation"]);
        let data = element.find(ns::SAML2, ns::saml::SUBJECT_CONFIRMATION_DATA).unwrap();
        assert_eq!(
            data.attribute_local("NotOnOrAfter").as_deref(),
            Some("2030-01-01T00:05:00Z")
        );
    }

    #[test]
    fn confirmation_data_keeps_key_info() {
        let registry = registry();
        let data = SubjectConfirmationData::build();
        let key_info = KeyInfo::build();
        key_info.borrow_mut().set_id(Some("hok"));
        data.borrow_mut().children_mut().push(key_info.erase()).unwrap();
        let xml = samling_xml::writer::to_string(&registry.marshall(&data.erase()).unwrap());

        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<SubjectConfirmationData>()
            .unwrap();
        let back = back.borrow();
        let child = back.children().get(0).unwrap();
        assert_eq!(child.downcast::<KeyInfo>().unwrap().borrow().id(), Some("hok"));
    }

    #[test]
    fn deep_change_invalidates_subject() {
        let registry = registry();
        let subject = bearer_subject();
        registry.marshall(&subject.erase()).unwrap();
        let confirmation = subject.borrow().subject_confirmations().get(0).cloned().unwrap();
        let data = confirmation.borrow().subject_confirmation_data().cloned().unwrap();
        assert!(subject.dom().is_some());
        data.borrow_mut().set_address(Some("192.0.2.1"));
        assert!(subject.dom().is_none());
        assert!(confirmation.dom().is_none());
        let element = registry.marshall(&subject.erase()).unwrap();
        let data_element = element.find(ns::SAML2, ns::saml::SUBJECT_CONFIRMATION_DATA).unwrap();
        assert_eq!(data_element.attribute_local("Address").as_deref(), Some("192.0.2.1"));
    }
}
