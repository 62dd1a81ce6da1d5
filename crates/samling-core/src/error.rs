#![forbid(unsafe_code)]

/// Errors produced by the samling SAML object model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// No builder is registered for the requested element or type name.
    #[error("no builder registered for {0}")]
    BuilderNotFound(String),

    #[error("no marshaller registered for {0}")]
    MarshallerNotFound(String),

    /// A child element was not recognized by its parent type.
    #[error("unknown element {0}")]
    UnknownElement(String),

    /// An attribute was not recognized by the element type it appeared on.
    #[error("unknown attribute {0}")]
    UnknownAttribute(String),

    /// A child could not be attached: it already has a parent, or it is
    /// the wrong type for the slot.
    #[error("illegal child addition: {0}")]
    IllegalAdd(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("unmarshalling error: {0}")]
    Unmarshalling(String),

    #[error("marshalling error: {0}")]
    Marshalling(String),

    /// Operational failure inside a trust engine. A signature that merely
    /// fails to verify is not an error.
    #[error("security error: {0}")]
    Security(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the unmarshalling policy may suppress this error.
    pub fn is_unknown_content(&self) -> bool {
        matches!(self, Error::UnknownElement(_) | Error::UnknownAttribute(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
