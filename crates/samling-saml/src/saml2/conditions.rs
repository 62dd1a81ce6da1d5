#![forbid(unsafe_code)]

use super::saml;
use crate::datetime;
use chrono::{DateTime, Utc};
use samling_core::{ns, Error, QName, Result};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    text_element, IndexedSubList, IndexedXmlObjectChildrenList, XmlHandle, XmlObject,
    XmlObjectBase, XmlObjectChildrenList, XmlObjectRef, XmlObjectType,
};

text_element!(
    /// `<saml2:Audience>`: the URI of an intended relying party.
    Audience, ns::SAML2, ns::saml::AUDIENCE, ns::prefix::SAML2
);

/// `<saml2:Conditions>`: validity window plus individual conditions,
/// indexed by element name.
#[derive(Debug)]
pub struct Conditions {
    base: XmlObjectBase,
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    conditions: IndexedXmlObjectChildrenList,
}

impl Conditions {
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

    /// Every condition in document order.
    pub fn conditions(&self) -> &IndexedXmlObjectChildrenList {
        &self.conditions
    }

    /// Add a condition. Only `AudienceRestriction`, `OneTimeUse` and
    /// conditions from other namespaces are accepted.
    pub fn push(&mut self, condition: XmlObjectRef) -> Result<()> {
        if !accepts(&condition) {
            return Err(Error::IllegalAdd(format!(
                "{} is not a condition",
                condition.element_name()
            )));
        }
        self.conditions.push(condition)
    }

    pub fn remove(&mut self, condition: &XmlObjectRef) -> bool {
        self.conditions.remove(condition)
    }

    pub fn audience_restrictions(&self) -> Vec<XmlHandle<AudienceRestriction>> {
        self.conditions
            .typed(&AudienceRestriction::default_element_name())
    }

    /// The audience restrictions as a live view; changes land in
    /// [`Conditions::conditions`].
    pub fn audience_restrictions_mut(&mut self) -> IndexedSubList<'_> {
        self.conditions
            .sub_list(&AudienceRestriction::default_element_name())
    }

    pub fn one_time_use(&self) -> Option<XmlHandle<OneTimeUse>> {
        self.conditions
            .typed(&OneTimeUse::default_element_name())
            .into_iter()
            .next()
    }

    /// Whether `now` falls inside the validity window.
    pub fn is_valid_at(&self, now: &DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |t| *now >= t)
            && self.not_on_or_after.map_or(true, |t| *now < t)
    }
}

fn accepts(condition: &XmlObjectRef) -> bool {
    condition.is::<AudienceRestriction>()
        || condition.is::<OneTimeUse>()
        || condition.element_name().namespace_uri() != ns::SAML2
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
        if !accepts(&child) {
            return Ok(false);
        }
        self.conditions.push(child)?;
        Ok(true)
    }
}

impl XmlObjectType for Conditions {
    fn default_element_name() -> QName {
        saml(ns::saml::CONDITIONS)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let conditions = IndexedXmlObjectChildrenList::new(&base);
        Self {
            base,
            not_before: None,
            not_on_or_after: None,
            conditions,
        }
    }
}

/// `<saml2:AudienceRestriction>`
#[derive(Debug)]
pub struct AudienceRestriction {
    base: XmlObjectBase,
    audiences: XmlObjectChildrenList<XmlHandle<Audience>>,
}

impl AudienceRestriction {
    pub fn audiences(&self) -> &XmlObjectChildrenList<XmlHandle<Audience>> {
        &self.audiences
    }

    pub fn audiences_mut(&mut self) -> &mut XmlObjectChildrenList<XmlHandle<Audience>> {
        &mut self.audiences
    }

    /// Append an `<Audience>` holding `uri`.
    pub fn push_audience(&mut self, uri: &str) -> Result<()> {
        let audience = Audience::build();
        audience.borrow_mut().set_value(Some(uri));
        self.audiences.push(audience)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.audiences.iter().any(|a| a.borrow().value() == Some(uri))
    }
}

impl XmlObject for AudienceRestriction {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.audiences.erased().collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        let Some(audience) = child.downcast::<Audience>() else {
            return Ok(false);
        };
        self.audiences.push(audience)?;
        Ok(true)
    }
}

impl XmlObjectType for AudienceRestriction {
    fn default_element_name() -> QName {
        saml(ns::saml::AUDIENCE_RESTRICTION)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let audiences = XmlObjectChildrenList::new(&base);
        Self { base, audiences }
    }
}

/// `<saml2:OneTimeUse/>`
#[derive(Debug)]
pub struct OneTimeUse {
    base: XmlObjectBase,
}

impl XmlObject for OneTimeUse {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }
}

impl XmlObjectType for OneTimeUse {
    fn default_element_name() -> QName {
        saml(ns::saml::ONE_TIME_USE)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::registry;
    use chrono::TimeZone;
    use samling_xmlobject::UnmarshallingPolicy;

    fn conditions() -> XmlHandle<Conditions> {
        let conditions = Conditions::build();
        let restriction = AudienceRestriction::build();
        restriction
            .borrow_mut()
            .push_audience("https://sp.example.org")
            .unwrap();
        let mut c = conditions.borrow_mut();
        c.set_not_before(Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
        c.set_not_on_or_after(Some(Utc.with_ymd_and_hms(2030, 1, 1, 1, 0, 0).unwrap()));
        c.push(OneTimeUse::build().erase()).unwrap();
        c.push(restriction.erase()).unwrap();
        drop(c);
        conditions
    }

    #[test]
    fn conditions_are_indexed_by_name() {
        let conditions = conditions();
        let c = conditions.borrow();
        assert_eq!(c.conditions().len(), 2);
        assert!(c.one_time_use().is_some());
        let restrictions = c.audience_restrictions();
        assert_eq!(restrictions.len(), 1);
        assert!(restrictions[0].borrow().contains("https://sp.example.org"));
    }

    #[test]
    fn foreign_saml_child_is_refused() {
        let conditions = Conditions::build();
        let audience = Audience::build();
        assert!(matches!(
            conditions.borrow_mut().push(audience.erase()),
            Err(Error::IllegalAdd(_))
        ));
        assert!(audience.parent().is_none());
    }

    #[test]
    fn audience_restrictions_view_writes_through() {
        let conditions = conditions();
        conditions.borrow().base().set_dom(Element::new(Conditions::default_element_name()));
        let extra = AudienceRestriction::build();
        {
            let mut c = conditions.borrow_mut();
            let mut view = c.audience_restrictions_mut();
            view.push(extra.erase()).unwrap();
            assert_eq!(view.len(), 2);
            assert!(matches!(
                view.push(OneTimeUse::build().erase()),
                Err(Error::IllegalAdd(_))
            ));
        }
        assert!(!conditions.borrow().base().is_dom_valid());
        assert!(extra.parent().is_some());
        assert_eq!(conditions.borrow().conditions().len(), 3);

        let first = conditions.borrow().audience_restrictions()[0].erase();
        assert!(conditions.borrow_mut().audience_restrictions_mut().remove(&first));
        assert!(first.parent().is_none());
        let c = conditions.borrow();
        let names: Vec<&str> = c
            .conditions()
            .iter()
            .map(|c| c.element_name().local_name())
            .collect();
        assert_eq!(names, ["OneTimeUse", "AudienceRestriction"]);
        assert!(c.audience_restrictions()[0].ptr_eq(&extra));
    }

    #[test]
    fn validity_window() {
        let conditions = conditions();
        let c = conditions.borrow();
        assert!(c.is_valid_at(&Utc.with_ymd_and_hms(2030, 1, 1, 0, 30, 0).unwrap()));
        assert!(!c.is_valid_at(&Utc.with_ymd_and_hms(2030, 1, 1, 1, 0, 0).unwrap()));
        assert!(!c.is_valid_at(&Utc.with_ymd_and_hms(2029, 12, 31, 23, 59, 59).unwrap()));
    }

    #[test]
    fn document_order_survives_round_trip() {
        let registry = registry();
        let xml = samling_xml::writer::to_string(&registry.marshall(&conditions().erase()).unwrap());
        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<Conditions>()
            .unwrap();
        let back = back.borrow();
        let names: Vec<&str> = back
            .conditions()
            .iter()
            .map(|c| c.element_name().local_name())
            .collect();
        assert_eq!(names, ["OneTimeUse", "AudienceRestriction"]);
        assert_eq!(
            back.not_before().map(datetime::format).as_deref(),
            Some("2030-01-01T00:00:00Z")
        );
    }
}
