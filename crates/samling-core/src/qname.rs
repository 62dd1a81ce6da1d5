#![forbid(unsafe_code)]

//! Qualified names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A (namespace URI, local name) pair with an optional preferred prefix.
///
/// The prefix is carried along so that marshalled elements keep the
/// prefix they were built or parsed with, but it takes no part in
/// equality, ordering or hashing: `{urn:x}a` with prefix `p` equals
/// `{urn:x}a` with prefix `q`.
#[derive(Clone)]
pub struct QName {
    namespace: String,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// A name with no prefix. An empty namespace means "no namespace".
    pub fn new(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: None,
        }
    }

    pub fn with_prefix(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        }
    }

    /// A name in no namespace, as used for unqualified attributes.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self::new("", local_name)
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Returns a copy of this name carrying `prefix`.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self::with_prefix(self.namespace.clone(), self.local_name.clone(), prefix)
    }

    /// Whether this name is `{namespace}local_name`.
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace == namespace && self.local_name == local_name
    }

    /// `prefix:local`, or just `local` when there is no prefix.
    pub fn to_prefixed_string(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local_name),
            None => self.local_name.clone(),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local_name.hash(state);
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.namespace, &self.local_name).cmp(&(&other.namespace, &other.local_name))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "QName({self} as {p})"),
            None => write!(f, "QName({self})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn prefix_does_not_affect_equality() {
        let a = QName::with_prefix("urn:x", "a", "p");
        let b = QName::with_prefix("urn:x", "a", "q");
        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn display_uses_clark_notation() {
        assert_eq!(QName::new("urn:x", "a").to_string(), "{urn:x}a");
        assert_eq!(QName::local("a").to_string(), "a");
    }

    #[test]
    fn empty_prefix_is_none() {
        let q = QName::with_prefix("urn:x", "a", "");
        assert_eq!(q.prefix(), None);
        assert_eq!(q.to_prefixed_string(), "a");
        assert_eq!(q.prefixed("z").to_prefixed_string(), "z:a");
    }
}
