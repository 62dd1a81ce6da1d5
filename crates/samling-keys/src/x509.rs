#![forbid(unsafe_code)]

//! X.509 certificate path validation.
//!
//! Builds a path from an entity certificate through untrusted
//! intermediates to a trust anchor, verifying each link's signature,
//! validity period and (when CRLs are supplied) revocation status.

use crate::key::KeyData;
use crate::loader;
use der::{Decode, Encode};
use samling_core::{algorithm, Error};
use samling_crypto::SignatureMethod;
use std::time::{SystemTime, UNIX_EPOCH};
use x509_cert::crl::CertificateList;
use x509_cert::Certificate;

/// Default limit on intermediates between the entity certificate and the
/// trust anchor.
pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone)]
pub struct CertValidationConfig {
    /// Trust anchors (DER).
    pub trust_anchors: Vec<Vec<u8>>,
    /// DER-encoded CRLs.
    pub crls: Vec<Vec<u8>>,
    /// Maximum number of intermediate certificates in a path.
    pub max_depth: usize,
    /// Time to validate at; `None` means now.
    pub verification_time: Option<SystemTime>,
    pub check_validity_period: bool,
}

impl Default for CertValidationConfig {
    fn default() -> Self {
        Self {
            trust_anchors: Vec::new(),
            crls: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            verification_time: None,
            check_validity_period: true,
        }
    }
}

struct Parsed {
    cert: Certificate,
    der: Vec<u8>,
}

impl Parsed {
    fn parse(der: &[u8]) -> Result<Self, Error> {
        let cert = Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;
        Ok(Self {
            cert,
            der: der.to_vec(),
        })
    }

    fn subject(&self) -> Vec<u8> {
        self.cert.tbs_certificate.subject.to_der().unwrap_or_default()
    }

    fn issuer(&self) -> Vec<u8> {
        self.cert.tbs_certificate.issuer.to_der().unwrap_or_default()
    }

    fn is_ca(&self) -> bool {
        use x509_cert::ext::pkix::BasicConstraints;
        self.cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.extn_id == BASIC_CONSTRAINTS)
            .filter_map(|ext| BasicConstraints::from_der(ext.extn_value.as_bytes()).ok())
            .any(|bc| bc.ca)
    }

    /// Whether this certificate may sign other certificates: the CA flag
    /// is set, and keyCertSign is among its key usages when it has any.
    fn can_issue(&self) -> bool {
        use x509_cert::ext::pkix::KeyUsage;
        let cert_sign = self
            .cert
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .filter(|ext| ext.extn_id == KEY_USAGE)
            .map(|ext| {
                KeyUsage::from_der(ext.extn_value.as_bytes())
                    .map(|usage| usage.key_cert_sign())
                    .unwrap_or(false)
            })
            .next()
            .unwrap_or(true);
        self.is_ca() && cert_sign
    }
}

const BASIC_CONSTRAINTS: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("2.5.29.19");
const KEY_USAGE: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("2.5.29.15");

/// Index of the end-entity certificate in an unordered set.
///
/// The entity certificate is one that issued none of the others,
/// preferring one without the CA flag. Falls back to the first
/// certificate when the set gives no answer.
pub fn entity_certificate_index(certificates: &[Vec<u8>]) -> usize {
    let parsed: Vec<Option<Parsed>> = certificates.iter().map(|d| Parsed::parse(d).ok()).collect();
    let issues_another = |i: usize, cert: &Parsed| {
        let subject = cert.subject();
        parsed
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.as_ref().is_some_and(|o| o.issuer() == subject))
    };
    let candidates: Vec<(usize, &Parsed)> = parsed
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
        .filter(|(i, p)| !issues_another(*i, p))
        .collect();
    candidates
        .iter()
        .find(|(_, p)| !p.is_ca())
        .or_else(|| candidates.first())
        .map(|(i, _)| *i)
        .unwrap_or(0)
}

/// The same certificates with the entity certificate moved to the front.
pub fn entity_certificate_first(certificates: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let mut ordered = certificates.to_vec();
    if !ordered.is_empty() {
        let entity = ordered.remove(entity_certificate_index(certificates));
        ordered.insert(0, entity);
    }
    ordered
}

/// Validate `chain[0]` against the configured trust anchors, using the
/// rest of `chain` as untrusted intermediates.
pub fn validate_cert_chain(chain: &[Vec<u8>], config: &CertValidationConfig) -> Result<(), Error> {
    let (leaf_der, rest) = chain
        .split_first()
        .ok_or_else(|| Error::Certificate("empty certificate chain".into()))?;
    let leaf = Parsed::parse(leaf_der)?;
    let intermediates: Vec<Parsed> = rest
        .iter()
        .filter(|der| *der != leaf_der)
        .filter_map(|der| Parsed::parse(der).ok())
        .collect();
    let anchors: Vec<Parsed> = config
        .trust_anchors
        .iter()
        .filter_map(|der| Parsed::parse(der).ok())
        .collect();
    if anchors.is_empty() {
        return Err(Error::Certificate("no trust anchors available".into()));
    }

    let now = verification_time(config.verification_time)?;
    let path = build_path(&leaf, &intermediates, &anchors, config.max_depth)?;

    for cert in &path {
        if config.check_validity_period {
            check_validity_period(&cert.cert, &now)?;
        }
        check_crls(&cert.cert, &config.crls, &now)?;
    }
    tracing::debug!(length = path.len(), "certificate path validated");
    Ok(())
}

/// The path from `leaf` up to and including its trust anchor.
fn build_path<'a>(
    leaf: &'a Parsed,
    intermediates: &'a [Parsed],
    anchors: &'a [Parsed],
    max_depth: usize,
) -> Result<Vec<&'a Parsed>, Error> {
    if let Some(anchor) = anchors.iter().find(|a| a.der == leaf.der) {
        return Ok(vec![anchor]);
    }

    let mut path = vec![leaf];
    let mut current = leaf;
    loop {
        let issuer = current.issuer();
        if let Some(anchor) = anchors
            .iter()
            .find(|a| a.subject() == issuer && verify_cert_signature(&current.cert, &a.cert).is_ok())
        {
            path.push(anchor);
            return Ok(path);
        }
        if current.subject() == issuer {
            return Err(Error::Certificate(
                "self-signed certificate is not a trust anchor".into(),
            ));
        }
        if path.len() > max_depth {
            return Err(Error::Certificate(format!(
                "certificate path exceeds maximum depth {max_depth}"
            )));
        }
        let next = intermediates
            .iter()
            .filter(|c| !path.iter().any(|p| p.der == c.der))
            .find(|c| c.subject() == issuer && verify_cert_signature(&current.cert, &c.cert).is_ok())
            .ok_or_else(|| {
                Error::Certificate("cannot find issuer certificate (incomplete chain)".into())
            })?;
        if !next.can_issue() {
            return Err(Error::Certificate(
                "issuing certificate is not a CA (basicConstraints/keyUsage)".into(),
            ));
        }
        path.push(next);
        current = next;
    }
}

/// Map a certificate signature algorithm OID to the equivalent XML-DSig
/// signature method.
fn signature_method_for_oid(oid: &str) -> Result<SignatureMethod, Error> {
    let uri = match oid {
        "1.2.840.113549.1.1.5" => algorithm::RSA_SHA1,
        "1.2.840.113549.1.1.11" => algorithm::RSA_SHA256,
        "1.2.840.113549.1.1.12" => algorithm::RSA_SHA384,
        "1.2.840.113549.1.1.13" => algorithm::RSA_SHA512,
        "1.2.840.10045.4.1" => algorithm::ECDSA_SHA1,
        "1.2.840.10045.4.3.2" => algorithm::ECDSA_SHA256,
        "1.2.840.10045.4.3.3" => algorithm::ECDSA_SHA384,
        "1.2.840.10045.4.3.4" => algorithm::ECDSA_SHA512,
        _ => {
            return Err(Error::Certificate(format!(
                "unsupported certificate signature algorithm: {oid}"
            )))
        }
    };
    SignatureMethod::from_uri(uri)
}

/// Verify that `issuer` signed `cert`.
fn verify_cert_signature(cert: &Certificate, issuer: &Certificate) -> Result<(), Error> {
    let tbs = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode TBS: {e}")))?;
    let signature = cert
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Certificate("certificate has no signature bytes".into()))?;
    let spki = issuer
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode issuer SPKI: {e}")))?;
    let issuer_key = loader::load_spki_der(&spki)?;
    let method = signature_method_for_oid(&cert.signature_algorithm.oid.to_string())?;

    // Certificates carry ECDSA signatures DER-encoded.
    let raw = match &issuer_key.data {
        KeyData::EcP256 { .. } => p256::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::Certificate(format!("invalid ECDSA signature: {e}")))?
            .to_bytes()
            .to_vec(),
        KeyData::EcP384 { .. } => p384::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::Certificate(format!("invalid ECDSA signature: {e}")))?
            .to_bytes()
            .to_vec(),
        _ => signature.to_vec(),
    };

    if method.verify(&issuer_key.to_signing_key(), &tbs, &raw)? {
        Ok(())
    } else {
        Err(Error::Certificate("certificate signature verification failed".into()))
    }
}

fn verification_time(at: Option<SystemTime>) -> Result<der::DateTime, Error> {
    let since_epoch = at
        .unwrap_or_else(SystemTime::now)
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Certificate(format!("system time error: {e}")))?;
    der::DateTime::from_unix_duration(since_epoch)
        .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))
}

fn check_validity_period(cert: &Certificate, now: &der::DateTime) -> Result<(), Error> {
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_date_time();
    let not_after = validity.not_after.to_date_time();
    if *now < not_before {
        return Err(Error::Certificate(format!(
            "certificate is not yet valid (notBefore: {not_before})"
        )));
    }
    if *now > not_after {
        return Err(Error::Certificate(format!(
            "certificate has expired (notAfter: {not_after})"
        )));
    }
    Ok(())
}

/// A certificate is revoked when a CRL from its issuer lists its serial
/// with a revocation date at or before `now`.
fn check_crls(cert: &Certificate, crls: &[Vec<u8>], now: &der::DateTime) -> Result<(), Error> {
    let serial = &cert.tbs_certificate.serial_number;
    for crl_der in crls {
        let crl = CertificateList::from_der(crl_der)
            .map_err(|e| Error::Certificate(format!("failed to parse CRL: {e}")))?;
        if crl.tbs_cert_list.issuer != cert.tbs_certificate.issuer {
            continue;
        }
        let revoked = crl
            .tbs_cert_list
            .revoked_certificates
            .iter()
            .flatten()
            .any(|r| r.serial_number == *serial && r.revocation_date.to_date_time() <= *now);
        if revoked {
            return Err(Error::Certificate(
                "certificate has been revoked (found in CRL)".into(),
            ));
        }
    }
    Ok(())
}
