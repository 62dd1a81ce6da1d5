#![forbid(unsafe_code)]

//! SAML 1.x assertion element types.
//!
//! Every node records the [`SamlVersion`](crate::SamlVersion) it was built for. Unmarshalled
//! nodes take it from their own `MinorVersion` or from the nearest
//! versioned ancestor; nodes built in code default to 1.1.

mod assertion;
mod subject;

pub use assertion::{Assertion, Audience, AudienceRestrictionCondition, Conditions};
pub use subject::{
    AuthenticationStatement, ConfirmationMethod, NameIdentifier, Subject, SubjectConfirmation,
};

use samling_core::{ns, QName};
use samling_xmlobject::{XmlObjectProviderRegistry, XmlObjectType};

pub(crate) fn saml(local: &str) -> QName {
    QName::with_prefix(ns::SAML1, local, ns::prefix::SAML1)
}

/// Implement `XmlObjectType` for a SAML 1.x node with a
/// `fn with_version(QName, SamlVersion) -> Self` constructor.
macro_rules! versioned_type {
    ($name:ident, $local:expr) => {
        impl samling_xmlobject::XmlObjectType for $name {
            fn default_element_name() -> samling_core::QName {
                super::saml($local)
            }

            fn with_name(element_name: samling_core::QName) -> Self {
                Self::with_version(element_name, crate::SamlVersion::default())
            }

            fn from_element(
                element: &samling_xml::Element,
                context: &mut samling_xmlobject::ContextMap,
            ) -> samling_core::Result<Self> {
                let version = crate::SamlVersion::resolve(element, context)?;
                Ok(Self::with_version(element.name(), version))
            }
        }
    };
}

/// A versioned node whose only content is text.
macro_rules! versioned_text {
    ($(#[$meta:meta])* $name:ident, $local:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            base: samling_xmlobject::XmlObjectBase,
            version: crate::SamlVersion,
            value: Option<String>,
        }

        impl $name {
            fn with_version(element_name: samling_core::QName, version: crate::SamlVersion) -> Self {
                Self {
                    base: samling_xmlobject::XmlObjectBase::new(element_name),
                    version,
                    value: None,
                }
            }

            pub fn version(&self) -> crate::SamlVersion {
                self.version
            }

            pub fn value(&self) -> Option<&str> {
                self.value.as_deref()
            }

            pub fn set_value(&mut self, value: Option<&str>) {
                self.base.assign(&mut self.value, value.map(str::to_owned));
            }
        }

        impl samling_xmlobject::XmlObject for $name {
            fn base(&self) -> &samling_xmlobject::XmlObjectBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut samling_xmlobject::XmlObjectBase {
                &mut self.base
            }

            fn marshall_content(&self, element: &samling_xml::Element) -> samling_core::Result<()> {
                if let Some(value) = &self.value {
                    element.set_text(value);
                }
                Ok(())
            }

            fn process_content(&mut self, text: &str) -> samling_core::Result<()> {
                self.value = Some(text.trim().to_owned());
                Ok(())
            }
        }

        versioned_type!($name, $local);
    };
}

pub(crate) use {versioned_text, versioned_type};

/// Register every SAML 1.x element type.
pub fn register(registry: &mut XmlObjectProviderRegistry) {
    registry.register_type::<Assertion>(Assertion::default_element_name());
    registry.register_type::<Conditions>(Conditions::default_element_name());
    registry.register_type::<AudienceRestrictionCondition>(
        AudienceRestrictionCondition::default_element_name(),
    );
    registry.register_type::<Audience>(Audience::default_element_name());
    registry.register_type::<AuthenticationStatement>(
        AuthenticationStatement::default_element_name(),
    );
    registry.register_type::<Subject>(Subject::default_element_name());
    registry.register_type::<NameIdentifier>(NameIdentifier::default_element_name());
    registry.register_type::<SubjectConfirmation>(SubjectConfirmation::default_element_name());
    registry.register_type::<ConfirmationMethod>(ConfirmationMethod::default_element_name());
}
