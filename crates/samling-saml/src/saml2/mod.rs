#![forbid(unsafe_code)]

//! SAML 2.0 assertion and protocol element types.

mod assertion;
mod conditions;
mod name_id;
mod protocol;
mod statements;
mod subject;

pub use assertion::{Advice, Assertion, AssertionIdRef};
pub use conditions::{Audience, AudienceRestriction, Conditions, OneTimeUse};
pub use name_id::{format as name_id_format, Issuer, NameId};
pub use protocol::{status, Response, Status, StatusCode, StatusMessage};
pub use statements::{
    class_ref as authn_context_class, Attribute, AttributeStatement, AttributeValue, AuthnContext,
    AuthnContextClassRef, AuthnStatement,
};
pub use subject::method as confirmation_method;
pub use subject::{Subject, SubjectConfirmation, SubjectConfirmationData};

use samling_core::{ns, QName};
use samling_xmlobject::{ObjectProvider, XmlObjectProviderRegistry, XmlObjectType, XsAny};

/// The version every SAML 2.0 message carries.
pub const VERSION: &str = "2.0";

pub(crate) fn saml(local: &str) -> QName {
    QName::with_prefix(ns::SAML2, local, ns::prefix::SAML2)
}

pub(crate) fn samlp(local: &str) -> QName {
    QName::with_prefix(ns::SAML2P, local, ns::prefix::SAML2P)
}

/// Register every SAML 2.0 element type.
///
/// `<saml2:AttributeValue>` without an `xsi:type` is kept as open
/// content ([`XsAny`]); typed values dispatch on their schema type.
pub fn register(registry: &mut XmlObjectProviderRegistry) {
    registry.register_type::<Assertion>(Assertion::default_element_name());
    registry.register_type::<Issuer>(Issuer::default_element_name());
    registry.register_type::<NameId>(NameId::default_element_name());
    registry.register_type::<Subject>(Subject::default_element_name());
    registry.register_type::<SubjectConfirmation>(SubjectConfirmation::default_element_name());
    registry.register_type::<SubjectConfirmationData>(
        SubjectConfirmationData::default_element_name(),
    );
    registry.register_type::<Conditions>(Conditions::default_element_name());
    registry.register_type::<AudienceRestriction>(AudienceRestriction::default_element_name());
    registry.register_type::<Audience>(Audience::default_element_name());
    registry.register_type::<OneTimeUse>(OneTimeUse::default_element_name());
    registry.register_type::<Advice>(Advice::default_element_name());
    registry.register_type::<AssertionIdRef>(AssertionIdRef::default_element_name());
    registry.register_type::<AuthnStatement>(AuthnStatement::default_element_name());
    registry.register_type::<AuthnContext>(AuthnContext::default_element_name());
    registry.register_type::<AuthnContextClassRef>(AuthnContextClassRef::default_element_name());
    registry.register_type::<AttributeStatement>(AttributeStatement::default_element_name());
    registry.register_type::<Attribute>(Attribute::default_element_name());
    registry.register(AttributeValue::element_name(), ObjectProvider::of::<XsAny>());
    registry.register_type::<Response>(Response::default_element_name());
    registry.register_type::<Status>(Status::default_element_name());
    registry.register_type::<StatusCode>(StatusCode::default_element_name());
    registry.register_type::<StatusMessage>(StatusMessage::default_element_name());
}
