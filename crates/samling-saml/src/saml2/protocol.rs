#![forbid(unsafe_code)]

use super::{samlp, Assertion, Issuer, VERSION};
use crate::datetime;
use chrono::{DateTime, Utc};
use samling_core::{ns, QName, Result};
use samling_dsig::Signature;
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    text_element, ContextMap, SignableXmlObject, XmlHandle, XmlObject, XmlObjectBase,
    XmlObjectChildrenList, XmlObjectRef, XmlObjectType,
};

/// Top-level and second-level status codes.
pub mod status {
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
    pub const VERSION_MISMATCH: &str = "urn:oasis:names:tc:SAML:2.0:status:VersionMismatch";
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";
    pub const REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";
}

text_element!(
    /// `<saml2p:StatusMessage>`
    StatusMessage, ns::SAML2P, ns::saml::STATUS_MESSAGE, ns::prefix::SAML2P
);

/// `<saml2p:Response>`
#[derive(Debug)]
pub struct Response {
    base: XmlObjectBase,
    id: Option<String>,
    in_response_to: Option<String>,
    version: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    destination: Option<String>,
    consent: Option<String>,
    issuer: Option<XmlHandle<Issuer>>,
    signature: Option<XmlObjectRef>,
    status: Option<XmlHandle<Status>>,
    assertions: XmlObjectChildrenList<XmlHandle<Assertion>>,
}

impl Response {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.id, id.map(str::to_owned));
    }

    pub fn in_response_to(&self) -> Option<&str> {
        self.in_response_to.as_deref()
    }

    pub fn set_in_response_to(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.in_response_to, id.map(str::to_owned));
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.base.assign(&mut self.version, version.map(str::to_owned));
    }

    pub fn issue_instant(&self) -> Option<&DateTime<Utc>> {
        self.issue_instant.as_ref()
    }

    pub fn set_issue_instant(&mut self, instant: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.issue_instant, instant);
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn set_destination(&mut self, destination: Option<&str>) {
        self.base.assign(&mut self.destination, destination.map(str::to_owned));
    }

    pub fn consent(&self) -> Option<&str> {
        self.consent.as_deref()
    }

    pub fn set_consent(&mut self, consent: Option<&str>) {
        self.base.assign(&mut self.consent, consent.map(str::to_owned));
    }

    pub fn issuer(&self) -> Option<&XmlHandle<Issuer>> {
        self.issuer.as_ref()
    }

    pub fn set_issuer(&mut self, issuer: Option<XmlHandle<Issuer>>) -> Result<()> {
        self.base.set_child(&mut self.issuer, issuer)
    }

    pub fn status(&self) -> Option<&XmlHandle<Status>> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, status: Option<XmlHandle<Status>>) -> Result<()> {
        self.base.set_child(&mut self.status, status)
    }

    pub fn signature_handle(&self) -> Option<XmlHandle<Signature>> {
        self.signature.as_ref()?.downcast()
    }

    pub fn assertions(&self) -> &XmlObjectChildrenList<XmlHandle<Assertion>> {
        &self.assertions
    }

    pub fn assertions_mut(&mut self) -> &mut XmlObjectChildrenList<XmlHandle<Assertion>> {
        &mut self.assertions
    }

    /// Whether the top-level status code is `Success`.
    pub fn is_success(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|s| s.borrow().code())
            .is_some_and(|c| c == status::SUCCESS)
    }
}

impl XmlObject for Response {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::with_capacity(3 + self.assertions.len());
        children.extend(self.issuer.iter().map(XmlHandle::erase));
        children.extend(self.signature.iter().cloned());
        children.extend(self.status.iter().map(XmlHandle::erase));
        children.extend(self.assertions.erased());
        children
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        let attributes = [
            (ns::attr::ID, &self.id),
            (ns::attr::IN_RESPONSE_TO, &self.in_response_to),
            (ns::attr::VERSION, &self.version),
        ];
        for (name, value) in attributes {
            if let Some(value) = value {
                element.set_attribute_local(name, value.as_str());
            }
        }
        datetime::write(element, ns::attr::ISSUE_INSTANT, self.issue_instant.as_ref());
        if let Some(destination) = &self.destination {
            element.set_attribute_local(ns::attr::DESTINATION, destination.as_str());
        }
        if let Some(consent) = &self.consent {
            element.set_attribute_local(ns::attr::CONSENT, consent.as_str());
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        let value = Some(attribute.value.clone());
        match attribute.name.local_name() {
            ns::attr::ID => self.id = value,
            ns::attr::IN_RESPONSE_TO => self.in_response_to = value,
            ns::attr::VERSION => self.version = value,
            ns::attr::DESTINATION => self.destination = value,
            ns::attr::CONSENT => self.consent = value,
            ns::attr::ISSUE_INSTANT => {
                self.issue_instant =
                    Some(datetime::parse(&attribute.value, ns::attr::ISSUE_INSTANT)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(issuer) = child.downcast::<Issuer>() {
            self.set_issuer(Some(issuer))?;
        } else if child.is::<Signature>() {
            self.set_signature(Some(child))?;
        } else if let Some(status) = child.downcast::<Status>() {
            self.set_status(Some(status))?;
        } else if let Some(assertion) = child.downcast::<Assertion>() {
            self.assertions.push(assertion)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    fn as_signable(&self) -> Option<&dyn SignableXmlObject> {
        Some(self)
    }

    fn as_signable_mut(&mut self) -> Option<&mut dyn SignableXmlObject> {
        Some(self)
    }
}

impl SignableXmlObject for Response {
    fn signature_reference_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn signature(&self) -> Option<XmlObjectRef> {
        self.signature.clone()
    }

    fn set_signature(&mut self, signature: Option<XmlObjectRef>) -> Result<()> {
        if let Some(s) = &signature {
            s.cast::<Signature>()?;
        }
        self.base.set_child(&mut self.signature, signature)
    }
}

impl XmlObjectType for Response {
    fn default_element_name() -> QName {
        samlp(ns::saml::RESPONSE)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let assertions = XmlObjectChildrenList::new(&base);
        Self {
            base,
            id: None,
            in_response_to: None,
            version: Some(VERSION.to_owned()),
            issue_instant: None,
            destination: None,
            consent: None,
            issuer: None,
            signature: None,
            status: None,
            assertions,
        }
    }

    fn from_element(element: &Element, _context: &mut ContextMap) -> Result<Self> {
        let mut response = Self::with_name(element.name());
        response.version = None;
        Ok(response)
    }
}

/// `<saml2p:Status>`
#[derive(Debug)]
pub struct Status {
    base: XmlObjectBase,
    status_code: Option<XmlHandle<StatusCode>>,
    status_message: Option<XmlHandle<StatusMessage>>,
}

impl Status {
    /// A status with the single top-level code `value`.
    pub fn with_code(value: &str) -> Result<XmlHandle<Status>> {
        let code = StatusCode::build();
        code.borrow_mut().set_value(Some(value));
        let status = Self::build();
        status.borrow_mut().set_status_code(Some(code))?;
        Ok(status)
    }

    pub fn status_code(&self) -> Option<&XmlHandle<StatusCode>> {
        self.status_code.as_ref()
    }

    pub fn set_status_code(&mut self, code: Option<XmlHandle<StatusCode>>) -> Result<()> {
        self.base.set_child(&mut self.status_code, code)
    }

    pub fn status_message(&self) -> Option<&XmlHandle<StatusMessage>> {
        self.status_message.as_ref()
    }

    pub fn set_status_message(&mut self, message: Option<XmlHandle<StatusMessage>>) -> Result<()> {
        self.base.set_child(&mut self.status_message, message)
    }

    /// The top-level code value.
    pub fn code(&self) -> Option<String> {
        let code = self.status_code.as_ref()?;
        let value = code.borrow().value().map(str::to_owned);
        value
    }
}

impl XmlObject for Status {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::with_capacity(2);
        children.extend(self.status_code.iter().map(XmlHandle::erase));
        children.extend(self.status_message.iter().map(XmlHandle::erase));
        children
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(code) = child.downcast::<StatusCode>() {
            self.set_status_code(Some(code))?;
        } else if let Some(message) = child.downcast::<StatusMessage>() {
            self.set_status_message(Some(message))?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for Status {
    fn default_element_name() -> QName {
        samlp(ns::saml::STATUS)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            status_code: None,
            status_message: None,
        }
    }
}

/// `<saml2p:StatusCode>`, optionally refined by a nested code.
#[derive(Debug)]
pub struct StatusCode {
    base: XmlObjectBase,
    value: Option<String>,
    nested: Option<XmlHandle<StatusCode>>,
}

impl StatusCode {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<&str>) {
        self.base.assign(&mut self.value, value.map(str::to_owned));
    }

    pub fn status_code(&self) -> Option<&XmlHandle<StatusCode>> {
        self.nested.as_ref()
    }

    pub fn set_status_code(&mut self, code: Option<XmlHandle<StatusCode>>) -> Result<()> {
        self.base.set_child(&mut self.nested, code)
    }
}

impl XmlObject for StatusCode {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.nested.iter().map(XmlHandle::erase).collect()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(value) = &self.value {
            element.set_attribute_local(ns::attr::VALUE, value.as_str());
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() || attribute.name.local_name() != ns::attr::VALUE {
            return Ok(false);
        }
        self.value = Some(attribute.value.clone());
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(code) = child.downcast::<StatusCode>() else {
            return Ok(false);
        };
        self.set_status_code(Some(code))?;
        Ok(true)
    }
}

impl XmlObjectType for StatusCode {
    fn default_element_name() -> QName {
        samlp(ns::saml::STATUS_CODE)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            value: None,
            nested: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{registry, signing_key};
    use samling_core::{algorithm, Error};
    use samling_dsig::{sign_object, SignatureValidator, SigningContext};
    use samling_xmlobject::UnmarshallingPolicy;

    fn response() -> XmlHandle<Response> {
        let response = Response::build();
        let assertion = Assertion::build();
        assertion.borrow_mut().set_id(Some("_a1"));
        {
            let mut r = response.borrow_mut();
            r.set_id(Some("_r1"));
            r.set_in_response_to(Some("_req"));
            r.set_destination(Some("https://sp.example.org/acs"));
            r.set_issue_instant(Some(datetime::parse("2030-01-01T00:00:00Z", "t").unwrap()));
            r.set_status(Some(Status::with_code(status::SUCCESS).unwrap()))
                .unwrap();
            r.assertions_mut().push(assertion).unwrap();
        }
        response
    }

    #[test]
    fn nested_status_code_round_trip() {
        let registry = registry();
        let status = Status::with_code(status::RESPONDER).unwrap();
        let second = StatusCode::build();
        second.borrow_mut().set_value(Some(status::AUTHN_FAILED));
        status
            .borrow()
            .status_code()
            .unwrap()
            .borrow_mut()
            .set_status_code(Some(second))
            .unwrap();
        let message = StatusMessage::build();
        message.borrow_mut().set_value(Some("no such user"));
        status.borrow_mut().set_status_message(Some(message)).unwrap();

        let xml = samling_xml::writer::to_string(&registry.marshall(&status.erase()).unwrap());
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<Status>()
            .unwrap();
        let back = back.borrow();
        assert_eq!(back.code().as_deref(), Some(status::RESPONDER));
        let top = back.status_code().unwrap().borrow();
        let nested = top.status_code().unwrap().borrow();
        assert_eq!(nested.value(), Some(status::AUTHN_FAILED));
        assert_eq!(
            back.status_message().unwrap().borrow().value(),
            Some("no such user")
        );
    }

    #[test]
    fn signed_response_round_trip() {
        let registry = registry();
        let response = response();
        let context = SigningContext::new()
            .with_signature_algorithm(algorithm::ECDSA_SHA256)
            .with_digest_algorithm(algorithm::SHA256)
            .with_signing_key(signing_key());
        let signature = Signature::new(context).unwrap();
        response
            .borrow_mut()
            .set_signature(Some(signature.erase()))
            .unwrap();
        let element = registry.marshall(&response.erase()).unwrap();
        sign_object(&signature).unwrap();

        let names: Vec<String> = element
            .child_elements()
            .iter()
            .map(|e| e.name().local_name().to_owned())
            .collect();
        assert_eq!(names, ["Signature", "Status", "Assertion"]);

        let xml = samling_xml::writer::to_string(&element);
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<Response>()
            .unwrap();
        let back = back.borrow();
        assert!(back.is_success());
        assert_eq!(back.in_response_to(), Some("_req"));
        assert_eq!(back.assertions().len(), 1);
        let signature = back.signature_handle().unwrap();
        assert!(SignatureValidator::new(signing_key().public())
            .validate(&signature)
            .unwrap());
    }

    #[test]
    fn assertion_cannot_join_two_responses() {
        let first = response();
        let assertion = first.borrow().assertions().get(0).unwrap().clone();
        let second = Response::build();
        assert!(matches!(
            second.borrow_mut().assertions_mut().push(assertion),
            Err(Error::IllegalAdd(_))
        ));
    }
}
