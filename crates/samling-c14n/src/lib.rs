#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) over the samling DOM.
//!
//! Implements the four Canonical XML 1.0 variants used by SAML signatures:
//! - Canonical XML 1.0 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! The input is always an element subtree. Bindings declared on ancestors
//! outside the subtree are supplied through [`C14nOptions::inherited_namespaces`],
//! and one descendant subtree can be left out (the enveloped signature).

pub mod exclusive;
pub mod inclusive;
pub mod render;

use samling_core::{algorithm, Error};
use samling_xml::{Element, Namespace};

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    /// Like [`C14nMode::from_uri`], failing on unknown URIs.
    pub fn require(uri: &str) -> Result<Self, Error> {
        Self::from_uri(uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N algorithm: {uri}")))
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Inputs to canonicalization besides the subtree itself.
#[derive(Debug, Clone, Default)]
pub struct C14nOptions {
    /// Subtree to leave out of the output (compared by identity).
    pub exclude: Option<Element>,
    /// For exclusive C14N, the InclusiveNamespaces PrefixList
    /// (`#default` for the default namespace).
    pub inclusive_prefixes: Vec<String>,
    /// Bindings in scope at the subtree root, declared outside it.
    pub inherited_namespaces: Vec<Namespace>,
}

impl C14nOptions {
    fn is_excluded(&self, el: &Element) -> bool {
        self.exclude.as_ref().is_some_and(|x| x.ptr_eq(el))
    }
}

/// Canonicalize the subtree rooted at `root`.
pub fn canonicalize(root: &Element, mode: C14nMode, options: &C14nOptions) -> Vec<u8> {
    match mode {
        C14nMode::Inclusive | C14nMode::InclusiveWithComments => {
            inclusive::canonicalize(root, mode.with_comments(), options)
        }
        C14nMode::Exclusive | C14nMode::ExclusiveWithComments => {
            exclusive::canonicalize(root, mode.with_comments(), options)
        }
    }
}

/// Canonicalize by algorithm URI.
pub fn canonicalize_uri(root: &Element, uri: &str, options: &C14nOptions) -> Result<Vec<u8>, Error> {
    Ok(canonicalize(root, C14nMode::require(uri)?, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_uri_mapping() {
        for mode in [
            C14nMode::Inclusive,
            C14nMode::InclusiveWithComments,
            C14nMode::Exclusive,
            C14nMode::ExclusiveWithComments,
        ] {
            assert_eq!(C14nMode::from_uri(mode.uri()), Some(mode));
        }
        assert!(matches!(
            C14nMode::require("urn:nope"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
