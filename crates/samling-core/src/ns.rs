#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Digital Signature 1.1 namespace
pub const DSIG11: &str = "http://www.w3.org/2009/xmldsig11#";

/// Exclusive C14N namespace
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// XML Schema namespace
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// SAML 1.x assertion namespace
pub const SAML1: &str = "urn:oasis:names:tc:SAML:1.0:assertion";

/// SAML 1.x protocol namespace
pub const SAML1P: &str = "urn:oasis:names:tc:SAML:1.0:protocol";

/// SAML 2.0 assertion namespace
pub const SAML2: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace
pub const SAML2P: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

// ── Conventional prefixes ────────────────────────────────────────────

pub mod prefix {
    pub const DSIG: &str = "ds";
    pub const DSIG11: &str = "dsig11";
    pub const EXC_C14N: &str = "ec";
    pub const XS: &str = "xs";
    pub const XSI: &str = "xsi";
    pub const SAML1: &str = "saml1";
    pub const SAML1P: &str = "saml1p";
    pub const SAML2: &str = "saml2";
    pub const SAML2P: &str = "saml2p";
}

// ── XML-DSig element names ───────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";

    // KeyInfo elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const KEY_VALUE: &str = "KeyValue";

    // RSA elements
    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";

    // EC elements
    pub const EC_KEY_VALUE: &str = "ECKeyValue";
    pub const NAMED_CURVE: &str = "NamedCurve";
    pub const PUBLIC_KEY: &str = "PublicKey";

    // X509 elements
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const X509_CRL: &str = "X509CRL";

    // Exc C14N
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";
}

// ── SAML element names (shared by 1.x and 2.0 where they coincide) ───

pub mod saml {
    pub const ASSERTION: &str = "Assertion";
    pub const ISSUER: &str = "Issuer";
    pub const SUBJECT: &str = "Subject";
    pub const NAME_ID: &str = "NameID";
    pub const SUBJECT_CONFIRMATION: &str = "SubjectConfirmation";
    pub const SUBJECT_CONFIRMATION_DATA: &str = "SubjectConfirmationData";
    pub const CONDITIONS: &str = "Conditions";
    pub const AUDIENCE_RESTRICTION: &str = "AudienceRestriction";
    pub const AUDIENCE: &str = "Audience";
    pub const ONE_TIME_USE: &str = "OneTimeUse";
    pub const ADVICE: &str = "Advice";
    pub const ASSERTION_ID_REF: &str = "AssertionIDRef";
    pub const AUTHN_STATEMENT: &str = "AuthnStatement";
    pub const AUTHN_CONTEXT: &str = "AuthnContext";
    pub const AUTHN_CONTEXT_CLASS_REF: &str = "AuthnContextClassRef";
    pub const ATTRIBUTE_STATEMENT: &str = "AttributeStatement";
    pub const ATTRIBUTE: &str = "Attribute";
    pub const ATTRIBUTE_VALUE: &str = "AttributeValue";

    // Protocol
    pub const RESPONSE: &str = "Response";
    pub const STATUS: &str = "Status";
    pub const STATUS_CODE: &str = "StatusCode";
    pub const STATUS_MESSAGE: &str = "StatusMessage";

    // SAML 1.x only
    pub const AUDIENCE_RESTRICTION_CONDITION: &str = "AudienceRestrictionCondition";
    pub const AUTHENTICATION_STATEMENT: &str = "AuthenticationStatement";
    pub const NAME_IDENTIFIER: &str = "NameIdentifier";
    pub const CONFIRMATION_METHOD: &str = "ConfirmationMethod";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "ID";
    pub const DSIG_ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const ALGORITHM: &str = "Algorithm";
    pub const PREFIX_LIST: &str = "PrefixList";
    pub const TYPE: &str = "type";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const NO_NAMESPACE_SCHEMA_LOCATION: &str = "noNamespaceSchemaLocation";
    pub const VERSION: &str = "Version";
    pub const ISSUE_INSTANT: &str = "IssueInstant";
    pub const MAJOR_VERSION: &str = "MajorVersion";
    pub const MINOR_VERSION: &str = "MinorVersion";
    pub const ASSERTION_ID: &str = "AssertionID";
    pub const RESPONSE_ID: &str = "ResponseID";
    pub const ISSUER: &str = "Issuer";
    pub const FORMAT: &str = "Format";
    pub const NAME_QUALIFIER: &str = "NameQualifier";
    pub const SP_NAME_QUALIFIER: &str = "SPNameQualifier";
    pub const SP_PROVIDED_ID: &str = "SPProvidedID";
    pub const METHOD: &str = "Method";
    pub const NOT_BEFORE: &str = "NotBefore";
    pub const NOT_ON_OR_AFTER: &str = "NotOnOrAfter";
    pub const RECIPIENT: &str = "Recipient";
    pub const IN_RESPONSE_TO: &str = "InResponseTo";
    pub const ADDRESS: &str = "Address";
    pub const AUTHN_INSTANT: &str = "AuthnInstant";
    pub const SESSION_INDEX: &str = "SessionIndex";
    pub const SESSION_NOT_ON_OR_AFTER: &str = "SessionNotOnOrAfter";
    pub const NAME: &str = "Name";
    pub const NAME_FORMAT: &str = "NameFormat";
    pub const FRIENDLY_NAME: &str = "FriendlyName";
    pub const DESTINATION: &str = "Destination";
    pub const CONSENT: &str = "Consent";
    pub const VALUE: &str = "Value";
    pub const AUTHENTICATION_METHOD: &str = "AuthenticationMethod";
    pub const AUTHENTICATION_INSTANT: &str = "AuthenticationInstant";
}
