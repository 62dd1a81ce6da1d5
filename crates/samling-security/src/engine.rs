#![forbid(unsafe_code)]

//! The trust engine contract and the candidate-key loop the engines share.

use samling_core::{Error, Result};
use samling_dsig::{validate_raw, Signature, SignatureValidator};
use samling_keys::Key;
use samling_xmlobject::XmlHandle;

/// Decides whether a signature was made by a trusted key.
///
/// `Ok(false)` is the ordinary "not trusted" outcome. `Err` is reserved
/// for operational failures and is always [`Error::Security`].
pub trait SignatureTrustEngine {
    /// What the caller supplies as the basis of trust.
    type TrustBasis: ?Sized;

    /// Validate a signature node that has a DOM, either from unmarshalling
    /// or from marshalling and signing.
    fn validate(&self, signature: &XmlHandle<Signature>, trust: &Self::TrustBasis) -> Result<bool>;

    /// Validate a detached signature value over `content`.
    fn validate_raw(
        &self,
        signature: &[u8],
        content: &[u8],
        algorithm: &str,
        trust: &Self::TrustBasis,
    ) -> Result<bool>;
}

/// Fold a lower-layer failure into [`Error::Security`].
pub(crate) fn security_error(error: Error) -> Error {
    match error {
        Error::Security(_) => error,
        other => Error::Security(other.to_string()),
    }
}

/// Structural problems with the signature itself make it untrusted
/// rather than an operational failure.
fn is_malformed_signature(error: &Error) -> bool {
    matches!(
        error,
        Error::MissingElement(_)
            | Error::MissingAttribute(_)
            | Error::Base64(_)
            | Error::InvalidUri(_)
            | Error::Canonicalization(_)
    )
}

/// Whether the signature verifies under `key`.
pub(crate) fn verifies(signature: &XmlHandle<Signature>, key: &Key) -> Result<bool> {
    match SignatureValidator::new(key.clone()).validate(signature) {
        Ok(valid) => {
            tracing::debug!(key = ?key.name, valid, "evaluated candidate key");
            Ok(valid)
        }
        Err(e) if is_malformed_signature(&e) => {
            tracing::debug!(error = %e, "malformed signature");
            Ok(false)
        }
        Err(e) => Err(security_error(e)),
    }
}

/// Whether the raw signature value verifies under `key`.
pub(crate) fn verifies_raw(
    signature: &[u8],
    content: &[u8],
    algorithm: &str,
    key: &Key,
) -> Result<bool> {
    let valid = validate_raw(signature, content, algorithm, key).map_err(security_error)?;
    tracing::debug!(key = ?key.name, valid, "evaluated candidate key for raw signature");
    Ok(valid)
}

/// The first key in `keys` that the signature verifies under.
pub(crate) fn first_valid_key<'k>(
    signature: &XmlHandle<Signature>,
    keys: &'k [Key],
) -> Result<Option<&'k Key>> {
    for key in keys {
        if verifies(signature, key)? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

/// The first key in `keys` that verifies the raw signature value.
pub(crate) fn first_valid_raw_key<'k>(
    signature: &[u8],
    content: &[u8],
    algorithm: &str,
    keys: &'k [Key],
) -> Result<Option<&'k Key>> {
    for key in keys {
        if verifies_raw(signature, content, algorithm, key)? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}
