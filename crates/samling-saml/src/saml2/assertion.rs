#![forbid(unsafe_code)]

use super::{saml, AttributeStatement, AuthnStatement, Conditions, Issuer, Subject, VERSION};
use crate::datetime;
use chrono::{DateTime, Utc};
use samling_core::{ns, Error, QName, Result};
use samling_dsig::Signature;
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    text_element, SignableXmlObject, XmlHandle, XmlObject, XmlObjectBase, XmlObjectChildrenList,
    XmlObjectRef, XmlObjectType,
};

text_element!(
    /// `<saml2:AssertionIDRef>`
    AssertionIdRef, ns::SAML2, ns::saml::ASSERTION_ID_REF, ns::prefix::SAML2
);

/// `<saml2:Assertion>`
///
/// Children marshall in schema order: `Issuer`, `ds:Signature`,
/// `Subject`, `Conditions`, `Advice`, then the statements.
#[derive(Debug)]
pub struct Assertion {
    base: XmlObjectBase,
    version: Option<String>,
    id: Option<String>,
    issue_instant: Option<DateTime<Utc>>,
    issuer: Option<XmlHandle<Issuer>>,
    signature: Option<XmlObjectRef>,
    subject: Option<XmlHandle<Subject>>,
    conditions: Option<XmlHandle<Conditions>>,
    advice: Option<XmlHandle<Advice>>,
    statements: XmlObjectChildrenList<XmlObjectRef>,
}

impl Assertion {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.base.assign(&mut self.version, version.map(str::to_owned));
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.id, id.map(str::to_owned));
    }

    pub fn issue_instant(&self) -> Option<&DateTime<Utc>> {
        self.issue_instant.as_ref()
    }

    pub fn set_issue_instant(&mut self, instant: Option<DateTime<Utc>>) {
        self.base.assign(&mut self.issue_instant, instant);
    }

    pub fn issuer(&self) -> Option<&XmlHandle<Issuer>> {
        self.issuer.as_ref()
    }

    pub fn set_issuer(&mut self, issuer: Option<XmlHandle<Issuer>>) -> Result<()> {
        self.base.set_child(&mut self.issuer, issuer)
    }

    pub fn subject(&self) -> Option<&XmlHandle<Subject>> {
        self.subject.as_ref()
    }

    pub fn set_subject(&mut self, subject: Option<XmlHandle<Subject>>) -> Result<()> {
        self.base.set_child(&mut self.subject, subject)
    }

    pub fn conditions(&self) -> Option<&XmlHandle<Conditions>> {
        self.conditions.as_ref()
    }

    pub fn set_conditions(&mut self, conditions: Option<XmlHandle<Conditions>>) -> Result<()> {
        self.base.set_child(&mut self.conditions, conditions)
    }

    pub fn advice(&self) -> Option<&XmlHandle<Advice>> {
        self.advice.as_ref()
    }

    pub fn set_advice(&mut self, advice: Option<XmlHandle<Advice>>) -> Result<()> {
        self.base.set_child(&mut self.advice, advice)
    }

    /// The signature as its concrete type.
    pub fn signature_handle(&self) -> Option<XmlHandle<Signature>> {
        self.signature.as_ref()?.downcast()
    }

    /// Every statement, in document order.
    pub fn statements(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.statements
    }

    /// Append a statement. SAML 2.0 statements other than `AuthnStatement`
    /// and `AttributeStatement` are refused; extension statements from
    /// other namespaces are kept as given.
    pub fn push_statement(&mut self, statement: XmlObjectRef) -> Result<()> {
        if !is_statement(&statement) {
            return Err(Error::IllegalAdd(format!(
                "{} is not a statement",
                statement.element_name()
            )));
        }
        self.statements.push(statement)
    }

    pub fn remove_statement(&mut self, statement: &XmlObjectRef) -> bool {
        self.statements.remove_item(statement)
    }

    pub fn authn_statements(&self) -> Vec<XmlHandle<AuthnStatement>> {
        self.statements.iter().filter_map(XmlObjectRef::downcast::<AuthnStatement>).collect()
    }

    pub fn attribute_statements(&self) -> Vec<XmlHandle<AttributeStatement>> {
        self.statements.iter().filter_map(XmlObjectRef::downcast::<AttributeStatement>).collect()
    }
}

fn is_statement(child: &XmlObjectRef) -> bool {
    child.is::<AuthnStatement>()
        || child.is::<AttributeStatement>()
        || child.element_name().namespace_uri() != ns::SAML2
}

impl XmlObject for Assertion {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::with_capacity(5 + self.statements.len());
        children.extend(self.issuer.iter().map(XmlHandle::erase));
        children.extend(self.signature.iter().cloned());
        children.extend(self.subject.iter().map(XmlHandle::erase));
        children.extend(self.conditions.iter().map(XmlHandle::erase));
        children.extend(self.advice.iter().map(XmlHandle::erase));
        children.extend(self.statements.iter().cloned());
        children
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(version) = &self.version {
            element.set_attribute_local(ns::attr::VERSION, version.as_str());
        }
        if let Some(id) = &self.id {
            element.set_attribute_local(ns::attr::ID, id.as_str());
        }
        datetime::write(element, ns::attr::ISSUE_INSTANT, self.issue_instant.as_ref());
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name.has_namespace() {
            return Ok(false);
        }
        match attribute.name.local_name() {
            ns::attr::VERSION => self.version = Some(attribute.value.clone()),
            ns::attr::ID => self.id = Some(attribute.value.clone()),
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
        } else if let Some(subject) = child.downcast::<Subject>() {
            self.set_subject(Some(subject))?;
        } else if let Some(conditions) = child.downcast::<Conditions>() {
            self.set_conditions(Some(conditions))?;
        } else if let Some(advice) = child.downcast::<Advice>() {
            self.set_advice(Some(advice))?;
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

impl XmlObjectType for Assertion {
    fn default_element_name() -> QName {
        saml(ns::saml::ASSERTION)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let statements = XmlObjectChildrenList::new(&base);
        Self {
            base,
            version: Some(VERSION.to_owned()),
            id: None,
            issue_instant: None,
            issuer: None,
            signature: None,
            subject: None,
            conditions: None,
            advice: None,
            statements,
        }
    }

    fn from_element(element: &Element, _context: &mut samling_xmlobject::ContextMap) -> Result<Self> {
        let mut assertion = Self::with_name(element.name());
        assertion.version = None;
        Ok(assertion)
    }
}

/// `<saml2:Advice>`: referenced or embedded assertions plus open
/// content from other namespaces.
#[derive(Debug)]
pub struct Advice {
    base: XmlObjectBase,
    children: XmlObjectChildrenList<XmlObjectRef>,
}

impl Advice {
    pub fn children(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.children
    }

    pub fn push(&mut self, child: XmlObjectRef) -> Result<()> {
        if !is_advice(&child) {
            return Err(Error::IllegalAdd(format!(
                "{} cannot appear in Advice",
                child.element_name()
            )));
        }
        self.children.push(child)
    }

    pub fn remove(&mut self, child: &XmlObjectRef) -> bool {
        self.children.remove_item(child)
    }

    pub fn assertions(&self) -> Vec<XmlHandle<Assertion>> {
        self.children.iter().filter_map(XmlObjectRef::downcast::<Assertion>).collect()
    }

    pub fn assertion_id_refs(&self) -> Vec<XmlHandle<AssertionIdRef>> {
        self.children.iter().filter_map(XmlObjectRef::downcast::<AssertionIdRef>).collect()
    }
}

fn is_advice(child: &XmlObjectRef) -> bool {
    child.is::<Assertion>()
        || child.is::<AssertionIdRef>()
        || child.element_name().namespace_uri() != ns::SAML2
}

impl XmlObject for Advice {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.children.as_slice().to_vec()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if !is_advice(&child) {
            return Ok(false);
        }
        self.children.push(child)?;
        Ok(true)
    }
}

impl XmlObjectType for Advice {
    fn default_element_name() -> QName {
        saml(ns::saml::ADVICE)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let children = XmlObjectChildrenList::new(&base);
        Self { base, children }
    }
}
