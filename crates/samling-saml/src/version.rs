#![forbid(unsafe_code)]

use samling_core::{ns, Error, Result};
use samling_xml::Element;
use samling_xmlobject::ContextMap;
use std::fmt;

/// Parse context key holding the SAML 1.x minor version of the nearest
/// versioned ancestor.
pub const MINOR_VERSION_KEY: &str = "saml1.minor_version";

/// The SAML 1.x version a node was built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SamlVersion {
    V1_0,
    #[default]
    V1_1,
}

impl SamlVersion {
    pub fn major(self) -> u8 {
        1
    }

    pub fn minor(self) -> u8 {
        match self {
            Self::V1_0 => 0,
            Self::V1_1 => 1,
        }
    }

    pub fn from_minor(minor: &str) -> Result<Self> {
        match minor.trim() {
            "0" => Ok(Self::V1_0),
            "1" => Ok(Self::V1_1),
            other => {
                tracing::warn!(minor = other, "rejecting SAML 1.x MinorVersion");
                Err(Error::Unmarshalling(format!(
                    "unsupported SAML 1.x MinorVersion {other:?}"
                )))
            }
        }
    }

    /// The version for `element`: its own `MinorVersion`, else the one in
    /// effect for its ancestors, else 1.1.
    ///
    /// A `MajorVersion` other than 1 or a malformed `MinorVersion` is an
    /// error. The resolved version is recorded in `context` for the
    /// element's descendants.
    pub fn resolve(element: &Element, context: &mut ContextMap) -> Result<Self> {
        if let Some(major) = element.attribute_local(ns::attr::MAJOR_VERSION) {
            if major.trim() != "1" {
                tracing::warn!(element = %element.name(), %major, "rejecting SAML MajorVersion");
                return Err(Error::Unmarshalling(format!(
                    "unsupported SAML MajorVersion {major:?}"
                )));
            }
        }
        let version = match element.attribute_local(ns::attr::MINOR_VERSION) {
            Some(minor) => Self::from_minor(&minor)?,
            None => match context.get(MINOR_VERSION_KEY) {
                Some(inherited) => Self::from_minor(inherited)?,
                None => Self::default(),
            },
        };
        tracing::trace!(element = %element.name(), %version, "resolved SAML 1.x version");
        context.insert(MINOR_VERSION_KEY, version.minor().to_string());
        Ok(version)
    }
}

impl fmt::Display for SamlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}
