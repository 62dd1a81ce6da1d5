#![forbid(unsafe_code)]

use super::saml;
use samling_core::{ns, QName, Result};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{XmlObject, XmlObjectBase, XmlObjectType};

/// Elements of `NameIDType`: a text value qualified by a format and name
/// qualifiers.
macro_rules! name_id_type {
    ($(#[$meta:meta])* $name:ident, $local:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            base: XmlObjectBase,
            value: Option<String>,
            format: Option<String>,
            name_qualifier: Option<String>,
            sp_name_qualifier: Option<String>,
            sp_provided_id: Option<String>,
        }

        impl $name {
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
                self.base
                    .assign(&mut self.name_qualifier, qualifier.map(str::to_owned));
            }

            pub fn sp_name_qualifier(&self) -> Option<&str> {
                self.sp_name_qualifier.as_deref()
            }

            pub fn set_sp_name_qualifier(&mut self, qualifier: Option<&str>) {
                self.base
                    .assign(&mut self.sp_name_qualifier, qualifier.map(str::to_owned));
            }

            pub fn sp_provided_id(&self) -> Option<&str> {
                self.sp_provided_id.as_deref()
            }

            pub fn set_sp_provided_id(&mut self, id: Option<&str>) {
                self.base.assign(&mut self.sp_provided_id, id.map(str::to_owned));
            }
        }

        impl XmlObject for $name {
            fn base(&self) -> &XmlObjectBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut XmlObjectBase {
                &mut self.base
            }

            fn marshall_attributes(&self, element: &Element) -> Result<()> {
                let attributes = [
                    (ns::attr::FORMAT, &self.format),
                    (ns::attr::NAME_QUALIFIER, &self.name_qualifier),
                    (ns::attr::SP_NAME_QUALIFIER, &self.sp_name_qualifier),
                    (ns::attr::SP_PROVIDED_ID, &self.sp_provided_id),
                ];
                for (name, value) in attributes {
                    if let Some(value) = value {
                        element.set_attribute_local(name, value.as_str());
                    }
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
                let slot = match attribute.name.local_name() {
                    ns::attr::FORMAT => &mut self.format,
                    ns::attr::NAME_QUALIFIER => &mut self.name_qualifier,
                    ns::attr::SP_NAME_QUALIFIER => &mut self.sp_name_qualifier,
                    ns::attr::SP_PROVIDED_ID => &mut self.sp_provided_id,
                    _ => return Ok(false),
                };
                *slot = Some(attribute.value.clone());
                Ok(true)
            }

            fn process_content(&mut self, text: &str) -> Result<()> {
                self.value = Some(text.trim().to_owned());
                Ok(())
            }
        }

        impl XmlObjectType for $name {
            fn default_element_name() -> QName {
                saml($local)
            }

            fn with_name(element_name: QName) -> Self {
                Self {
                    base: XmlObjectBase::new(element_name),
                    value: None,
                    format: None,
                    name_qualifier: None,
                    sp_name_qualifier: None,
                    sp_provided_id: None,
                }
            }
        }
    };
}

name_id_type!(
    /// `<saml2:Issuer>`: the entity that issued a message or assertion.
    Issuer, ns::saml::ISSUER
);

name_id_type!(
    /// `<saml2:NameID>`
    NameId, ns::saml::NAME_ID
);

/// Well-known `Format` URIs.
pub mod format {
    pub const ENTITY: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";
    pub const PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";
    pub const TRANSIENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";
    pub const EMAIL: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress";
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";
}
