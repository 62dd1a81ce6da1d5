use samling::core::{ns, Error, QName};
use samling::saml::saml2::{Assertion, Attribute, AttributeStatement, Issuer, NameId, Subject};
use samling::xmlobject::{UnmarshallingPolicy, XmlObject, XmlObjectType, XsString};
use samling::{default_registry, unmarshall_str};

const WITH_UNKNOWN: &str = r#"<saml2:Assertion xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion" Version="2.0" ID="_a"><saml2:Issuer>idp</saml2:Issuer><saml2:Frobnicate/></saml2:Assertion>"#;

#[test]
fn unknown_elements_follow_the_policy() {
    let registry = default_registry();
    let err = unmarshall_str(&registry, WITH_UNKNOWN, UnmarshallingPolicy::strict()).unwrap_err();
    assert!(matches!(err, Error::UnknownElement(_)));

    let assertion = unmarshall_str(&registry, WITH_UNKNOWN, UnmarshallingPolicy::lenient())
        .unwrap()
        .downcast::<Assertion>()
        .unwrap();
    let cached = registry.marshall(&assertion.erase()).unwrap();
    assert!(cached.first_child(ns::SAML2, "Frobnicate").is_some());

    assertion.borrow_mut().set_id(Some("_b"));
    let rebuilt = registry.marshall(&assertion.erase()).unwrap();
    assert!(rebuilt.first_child(ns::SAML2, "Frobnicate").is_none());
    assert_eq!(rebuilt.attribute_local("ID").as_deref(), Some("_b"));
}

#[test]
fn unchanged_tree_reuses_its_dom() {
    let registry = default_registry();
    let assertion = Assertion::build();
    let issuer = Issuer::build();
    issuer.borrow_mut().set_value(Some("idp"));
    assertion.borrow_mut().set_issuer(Some(issuer.clone())).unwrap();

    let first = registry.marshall(&assertion.erase()).unwrap();
    let second = registry.marshall(&assertion.erase()).unwrap();
    assert!(first.ptr_eq(&second));

    issuer.borrow_mut().set_value(Some("idp"));
    assert!(assertion.dom().is_some(), "an equal value leaves the cache alone");
    issuer.borrow_mut().set_value(Some("other"));
    assert!(assertion.dom().is_none());
    let third = registry.marshall(&assertion.erase()).unwrap();
    assert!(!first.ptr_eq(&third));
}

#[test]
fn deep_change_releases_every_ancestor() {
    let registry = default_registry();
    let name_id = NameId::build();
    let subject = Subject::build();
    subject.borrow_mut().set_name_id(Some(name_id.clone())).unwrap();
    let assertion = Assertion::build();
    assertion.borrow_mut().set_subject(Some(subject.clone())).unwrap();
    registry.marshall(&assertion.erase()).unwrap();
    assert!(subject.dom().is_some());

    name_id.borrow_mut().set_value(Some("carol"));
    assert!(name_id.dom().is_none());
    assert!(subject.dom().is_none());
    assert!(assertion.dom().is_none());
}

#[test]
fn a_node_has_at_most_one_parent() {
    let name_id = NameId::build();
    let first = Subject::build();
    first.borrow_mut().set_name_id(Some(name_id.clone())).unwrap();

    let second = Subject::build();
    let err = second.borrow_mut().set_name_id(Some(name_id.clone())).unwrap_err();
    assert!(matches!(err, Error::IllegalAdd(_)));
    assert!(second.borrow().name_id().is_none());

    first.borrow_mut().set_name_id(None).unwrap();
    assert!(name_id.parent().is_none());
    second.borrow_mut().set_name_id(Some(name_id.clone())).unwrap();
    assert!(name_id.parent().unwrap().ptr_eq(&second.erase()));
}

#[test]
fn schema_typed_values_survive_serialization() {
    let registry = default_registry();
    let attribute = Attribute::build();
    attribute.borrow_mut().set_name(Some("eduPersonAffiliation"));
    attribute.borrow_mut().push_string_value("member").unwrap();
    attribute.borrow_mut().push_string_value("staff").unwrap();
    let statement = AttributeStatement::build();
    statement.borrow_mut().attributes_mut().push(attribute).unwrap();

    let element = registry.marshall(&statement.erase()).unwrap();
    let xml = samling::xml::writer::to_string(&element);
    let back = unmarshall_str(&registry, &xml, UnmarshallingPolicy::strict())
        .unwrap()
        .downcast::<AttributeStatement>()
        .unwrap();
    let attribute = back.borrow().attribute("eduPersonAffiliation").unwrap();
    let attribute = attribute.borrow();
    assert_eq!(attribute.string_values(), ["member", "staff"]);
    let first = attribute.values().get(0).unwrap();
    assert!(first.is::<XsString>());
    assert_eq!(
        first.borrow().base().schema_type(),
        Some(&QName::new(ns::XS, "string"))
    );
}

#[test]
fn unregistered_root_is_builder_not_found_even_when_lenient() {
    let registry = default_registry();
    let err = unmarshall_str(
        &registry,
        r#"<saml2:Frobnicate xmlns:saml2="urn:oasis:names:tc:SAML:2.0:assertion"/>"#,
        UnmarshallingPolicy::lenient(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::BuilderNotFound(_)));
}
