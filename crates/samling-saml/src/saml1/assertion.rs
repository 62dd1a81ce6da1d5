#![forbid(unsafe_code)]

use super::{versioned_text, versioned_type, AuthenticationStatement};
use crate::{datetime, SamlVersion};
use chrono::{DateTime, Utc};
use samling_core::{ns, Error, QName, Result};
use samling_dsig::Signature;
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    OrderedXmlObjectSet, SignableXmlObject, XmlHandle, XmlObject, XmlObjectBase,
    XmlObjectChildrenList, XmlObjectRef,
};

versioned_text!(
    /// `<saml1:Audience>`
    Audience, ns::saml::AUDIENCE
);

/// `<saml1:Assertion>`.
///
/// Children marshall as `Conditions`, the statements, then the
/// `ds:Signature`.
#[derive(Debug)]
pub struct Assertion {
    base: XmlObjectBase,
    version: SamlVersion,
    id: Option<String>,
    issuer: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    conditions: Option<XmlHandle<Conditions>>,
    statements: XmlObjectChildrenList<XmlObjectRef>,
    signature: Option<XmlObjectRef>,
}

impl Assertion {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        let base = XmlObjectBase::new(element_name);
        let statements = XmlObjectChildrenList::new(&base);
        Self {
            base,
            version,
            id: None,
            issuer: None,
            issue_instant: None,
            conditions: None,
            statements,
            signature: None,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn set_version(&mut self, version: SamlVersion) {
        self.base.assign(&mut self.version, version);
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.id, id.map(str::to_owned));
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn set_issuer(&mut self, issuer: Option<&str>) {
        self.base.assign(&mut self.issuer, issuer.map(str::to_owned));
    }

    pub fn issue_instant(&self) -> Option<&DateTime<Utc>> {
        self.issue_instant.as_ref()
    }

    pub fn set_issue_instant(&mut self, instant: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.issue_instant, instant);
    }

    pub fn conditions(&self) -> Option<&XmlHandle<Conditions>> {
        self.conditions.as_ref()
    }

    pub fn set_conditions(&mut self, conditions: Option<XmlHandle<Conditions>>) -> Result<()> {
        self.base.set_child(&mut self.conditions, conditions)
    }

    pub fn statements(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.statements
    }

    /// Append a statement. SAML 1.x elements other than
    /// `AuthenticationStatement` are refused.
    pub fn push_statement(&mut self, statement: XmlObjectRef) -> Result<()> {
        if !is_statement(&statement) {
            return Err(Error::IllegalAdd(format!(
                "{} is not a statement",
                statement.element_name()
            )));
        }
        self.statements.push(statement)
    }

    pub fn authentication_statements(&self) -> Vec<XmlHandle<AuthenticationStatement>> {
        self.statements
            .iter()
            .filter_map(XmlObjectRef::downcast::<AuthenticationStatement>)
            .collect()
    }

    pub fn signature_handle(&self) -> Option<XmlHandle<Signature>> {
        self.signature.as_ref()?.downcast()
    }
}

fn is_statement(child: &XmlObjectRef) -> bool {
    child.is::<AuthenticationStatement>() || child.element_name().namespace_uri() != ns::SAML1
}

impl XmlObject for Assertion {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::with_capacity(2 + self.statements.len());
        children.extend(self.conditions.iter().map(XmlHandle::erase));
        children.extend(self.statements.iter().cloned());
        children.extend(self.signature.iter().cloned());
        children
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        element.set_attribute_local(ns::attr::MAJOR_VERSION, self.version.major().to_string());
        element.set_attribute_local(ns::attr::MINOR_VERSION, self.version.minor().to_string());
        if let Some(id) = &self.id {
            element.set_attribute_local(ns::attr::ASSERTION_ID, id.as_str());
        }
        if let Some(issuer) = &self.issuer {
            element.set_attribute_local(ns::attr::ISSUER, issuer.as_str());
        }
        datetime::write(element, ns::attr::ISSUE_INSTANT, self.issue_instant.as_ref());
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        match attribute.name.local_name() {
            // Resolved when the node was built.
            ns::attr::MAJOR_VERSION | ns::attr::MINOR_VERSION => {}
            ns::attr::ASSERTION_ID => self.id = Some(attribute.value.clone()),
            ns::attr::ISSUER => self.issuer = Some(attribute.value.clone()),
            ns::attr::ISSUE_INSTANT => {
                self.issue_instant =
                    Some(datetime::parse(&attribute.value, ns::attr::ISSUE_INSTANT)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(conditions) = child.downcast::<Conditions>() {
            self.set_conditions(Some(conditions))?;
        } else if child.is::<Signature>() {
            self.set_signature(Some(child))?;
        } else if is_statement(&child) {
            self.statements.push(child)?;
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

impl SignableXmlObject for Assertion {
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

versioned_type!(Assertion, ns::saml::ASSERTION);

/// `<saml1:Conditions>`
#[derive(Debug)]
pub struct Conditions {
    base: XmlObjectBase,
    version: SamlVersion,
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    conditions: XmlObjectChildrenList<XmlObjectRef>,
}

impl Conditions {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        let base = XmlObjectBase::new(element_name);
        let conditions = XmlObjectChildrenList::new(&base);
        Self {
            base,
            version,
            not_before: None,
            not_on_or_after: None,
            conditions,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

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

    pub fn conditions(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.conditions
    }

    pub fn push(&mut self, condition: XmlObjectRef) -> Result<()> {
        if !is_condition(&condition) {
            return Err(Error::IllegalAdd(format!(
                "{} is not a condition",
                condition.element_name()
            )));
        }
        self.conditions.push(condition)
    }

    pub fn audience_restriction_conditions(&self) -> Vec<XmlHandle<AudienceRestrictionCondition>> {
        self.conditions
            .iter()
            .filter_map(XmlObjectRef::downcast::<AudienceRestrictionCondition>)
            .collect()
    }
}

fn is_condition(child: &XmlObjectRef) -> bool {
    child.is::<AudienceRestrictionCondition>() || child.element_name().namespace_uri() != ns::SAML1
}

impl XmlObject for Conditions {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.conditions.as_slice().to_vec()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        datetime::write(element, ns::attr::NOT_BEFORE, self.not_before.as_ref());
        datetime::write(element, ns::attr::NOT_ON_OR_AFTER, self.not_on_or_after.as_ref());
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        match attribute.name.local_name() {
            ns::attr::NOT_BEFORE => {
                self.not_before = Some(datetime::parse(&attribute.value, ns::attr::NOT_BEFORE)?)
            }
            ns::attr::NOT_ON_OR_AFTER => {
                self.not_on_or_after =
                    Some(datetime::parse(&attribute.value, ns::attr::NOT_ON_OR_AFTER)?)
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if !is_condition(&child) {
            return Ok(false);
        }
        self.conditions.push(child)?;
        Ok(true)
    }
}

versioned_type!(Conditions, ns::saml::CONDITIONS);

/// `<saml1:AudienceRestrictionCondition>`
///
/// Each `Audience` node appears at most once.
#[derive(Debug)]
pub struct AudienceRestrictionCondition {
    base: XmlObjectBase,
    version: SamlVersion,
    audiences: OrderedXmlObjectSet<XmlHandle<Audience>>,
}

impl AudienceRestrictionCondition {
    fn with_version(element_name: QName, version: SamlVersion) -> Self {
        let base = XmlObjectBase::new(element_name);
        let audiences = OrderedXmlObjectSet::new(&base);
        Self {
            base,
            version,
            audiences,
        }
    }

    pub fn version(&self) -> SamlVersion {
        self.version
    }

    pub fn audiences(&self) -> &[XmlHandle<Audience>] {
        self.audiences.as_slice()
    }

    /// Append `audience`; returns `false` if this node already lists it.
    pub fn add_audience(&mut self, audience: XmlHandle<Audience>) -> Result<bool> {
        self.audiences.insert(audience)
    }

    pub fn remove_audience(&mut self, audience: &XmlHandle<Audience>) -> bool {
        self.audiences.remove(audience)
    }

    pub fn allows(&self, uri: &str) -> bool {
        self.audiences.iter().any(|a| a.borrow().value() == Some(uri))
    }
}

impl XmlObject for AudienceRestrictionCondition {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.audiences.iter().map(XmlHandle::erase).collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(audience) = child.downcast::<Audience>() else {
            return Ok(false);
        };
        self.audiences.insert(audience)?;
        Ok(true)
    }
}

versioned_type!(AudienceRestrictionCondition, ns::saml::AUDIENCE_RESTRICTION_CONDITION);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saml1::{NameIdentifier, Subject};
    use crate::tests::{registry, signing_key};
    use samling_core::algorithm;
    use samling_dsig::{sign_object, SignatureValidator, SigningContext};
    use samling_xmlobject::{UnmarshallingPolicy, XmlObjectType};

    #[test]
    fn signed_assertion_references_assertion_id() {
        let registry = registry();
        let assertion = Assertion::build();
        let statement = AuthenticationStatement::build();
        let subject = Subject::build();
        let name = NameIdentifier::build();
        name.borrow_mut().set_value(Some("alice"));
        subject.borrow_mut().set_name_identifier(Some(name)).unwrap();
        statement.borrow_mut().set_subject(Some(subject)).unwrap();

        let context = SigningContext::new()
            .with_signature_algorithm(algorithm::ECDSA_SHA256)
            .with_digest_algorithm(algorithm::SHA256)
            .with_signing_key(signing_key());
        let signature = Signature::new(context).unwrap();
        {
            let mut a = assertion.borrow_mut();
            a.set_id(Some("_s1"));
            a.set_issuer(Some("https://idp.example.org"));
            a.push_statement(statement.erase()).unwrap();
            a.set_signature(Some(signature.erase())).unwrap();
        }
        let element = registry.marshall(&assertion.erase()).unwrap();
        sign_object(&signature).unwrap();

        assert_eq!(element.attribute_local("MinorVersion").as_deref(), Some("1"));
        let last = element.child_elements().pop().unwrap();
        assert_eq!(last.name().local_name(), "Signature");
        let reference = last
            .find(ns::DSIG, ns::node::REFERENCE)
            .unwrap()
            .attribute_local(ns::attr::URI);
        assert_eq!(reference.as_deref(), Some("#_s1"));

        let xml = samling_xml::writer::to_string(&element);
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<Assertion>()
            .unwrap();
        let signature = back.borrow().signature_handle().unwrap();
        assert!(SignatureValidator::new(signing_key().public())
            .validate(&signature)
            .unwrap());
    }

    #[test]
    fn version_change_invalidates_dom() {
        let registry = registry();
        let assertion = Assertion::build();
        registry.marshall(&assertion.erase()).unwrap();
        assert!(assertion.dom().is_some());
        assertion.borrow_mut().set_version(SamlVersion::V1_0);
        assert!(assertion.dom().is_none());
        let element = registry.marshall(&assertion.erase()).unwrap();
        assert_eq!(element.attribute_local("MinorVersion").as_deref(), Some("0"));
    }

    #[test]
    fn conditions_refuse_saml1_non_conditions() {
        let conditions = Conditions::build();
        assert!(matches!(
            conditions.borrow_mut().push(Audience::build().erase()),
            Err(Error::IllegalAdd(_))
        ));
        conditions
            .borrow_mut()
            .push(AudienceRestrictionCondition::build().erase())
            .unwrap();
        assert_eq!(conditions.borrow().audience_restriction_conditions().len(), 1);
    }

    #[test]
    fn audience_nodes_are_listed_once() {
        let restriction = AudienceRestrictionCondition::build();
        let audience = Audience::build();
        audience.borrow_mut().set_value(Some("https://sp.example.org"));
        let mut r = restriction.borrow_mut();
        assert!(r.add_audience(audience.clone()).unwrap());
        assert!(!r.add_audience(audience.clone()).unwrap());
        assert_eq!(r.audiences().len(), 1);
        assert!(r.allows("https://sp.example.org"));

        assert!(r.remove_audience(&audience));
        assert!(audience.parent().is_none());
        assert!(!r.allows("https://sp.example.org"));
    }
}
