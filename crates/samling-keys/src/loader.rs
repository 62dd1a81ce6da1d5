#![forbid(unsafe_code)]

//! Key loading from PEM, DER and X.509 certificates.

use crate::key::{Key, KeyData};
use samling_core::Error;

/// Load a private key from PKCS#8 DER bytes. Tries RSA, then P-256, then P-384.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        let public = pk.to_public_key();
        return Ok(Key::new(KeyData::Rsa {
            private: Some(pk),
            public,
        }));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        let public = *sk.verifying_key();
        return Ok(Key::new(KeyData::EcP256 {
            private: Some(sk),
            public,
        }));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        let public = *sk.verifying_key();
        return Ok(Key::new(KeyData::EcP384 {
            private: Some(sk),
            public,
        }));
    }
    Err(Error::Key(
        "unable to parse PKCS#8 private key (tried RSA, P-256, P-384)".into(),
    ))
}

/// Load a public key from SubjectPublicKeyInfo DER bytes.
pub fn load_spki_der(spki_der: &[u8]) -> Result<Key, Error> {
    use spki::DecodePublicKey;

    if let Ok(public) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::Rsa {
            private: None,
            public,
        }));
    }
    if let Ok(public) = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::EcP256 {
            private: None,
            public,
        }));
    }
    if let Ok(public) = p384::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::EcP384 {
            private: None,
            public,
        }));
    }
    Err(Error::Key("unsupported public key algorithm in SPKI DER".into()))
}

/// Load the public key of a DER certificate. The certificate is attached
/// to the returned key.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    use der::{Decode, Encode};

    let cert = x509_cert::Certificate::from_der(data)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
    let key = load_spki_der(&spki_der)?;
    Ok(key.with_certificates(vec![data.to_vec()]))
}

pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let mut certs = load_certificates_pem(pem_data)?;
    if certs.is_empty() {
        return Err(Error::Certificate("no CERTIFICATE block in PEM data".into()));
    }
    let leaf = certs.remove(0);
    let key = load_x509_cert_der(&leaf)?;
    let mut chain = vec![leaf];
    chain.extend(certs);
    Ok(key.with_certificates(chain))
}

/// Decode every `CERTIFICATE` block in `pem_data`, in order.
pub fn load_certificates_pem(pem_data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    Ok(pem_blocks(pem_data)?
        .into_iter()
        .filter(|(label, _)| label == "CERTIFICATE")
        .map(|(_, der)| der)
        .collect())
}

/// Load a key from PEM data, dispatching on the block label.
///
/// A private key followed by `CERTIFICATE` blocks in the same input gets
/// those certificates attached.
pub fn load_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};

    let blocks = pem_blocks(pem_data)?;
    let certificates: Vec<Vec<u8>> = blocks
        .iter()
        .filter(|(label, _)| label == "CERTIFICATE")
        .map(|(_, der)| der.clone())
        .collect();

    for (label, der) in &blocks {
        let key = match label.as_str() {
            "PRIVATE KEY" => load_private_key_pkcs8_der(der)?,
            "RSA PRIVATE KEY" => {
                let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
                    .map_err(|e| Error::Key(format!("failed to parse RSA private key: {e}")))?;
                let public = pk.to_public_key();
                Key::new(KeyData::Rsa {
                    private: Some(pk),
                    public,
                })
            }
            "EC PRIVATE KEY" => load_sec1_private_der(der)?,
            "PUBLIC KEY" => load_spki_der(der)?,
            "RSA PUBLIC KEY" => {
                let public = rsa::RsaPublicKey::from_pkcs1_der(der)
                    .map_err(|e| Error::Key(format!("failed to parse RSA public key: {e}")))?;
                Key::new(KeyData::Rsa {
                    private: None,
                    public,
                })
            }
            _ => continue,
        };
        return Ok(key.with_certificates(certificates));
    }

    if certificates.is_empty() {
        return Err(Error::Key("no supported key found in PEM data".into()));
    }
    load_x509_cert_pem(pem_data)
}

fn load_sec1_private_der(der: &[u8]) -> Result<Key, Error> {
    if let Ok(secret) = p256::SecretKey::from_sec1_der(der) {
        let sk = p256::ecdsa::SigningKey::from(secret);
        let public = *sk.verifying_key();
        return Ok(Key::new(KeyData::EcP256 {
            private: Some(sk),
            public,
        }));
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_der(der) {
        let sk = p384::ecdsa::SigningKey::from(secret);
        let public = *sk.verifying_key();
        return Ok(Key::new(KeyData::EcP384 {
            private: Some(sk),
            public,
        }));
    }
    Err(Error::Key("unable to parse EC private key (tried P-256, P-384)".into()))
}

/// Load a key from a file. PEM is tried first, then DER as PKCS#8,
/// SubjectPublicKeyInfo and certificate in that order.
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let key = if looks_like_pem(&data) {
        load_pem(&data)?
    } else {
        load_private_key_pkcs8_der(&data)
            .or_else(|_| load_spki_der(&data))
            .or_else(|_| load_x509_cert_der(&data))?
    };
    tracing::debug!(path = %path.display(), data = ?key.data, "loaded key");
    Ok(match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if key.name.is_none() => key.with_name(stem),
        _ => key,
    })
}

/// Read every certificate in a PEM or DER file.
pub fn load_certificates_file(path: &std::path::Path) -> Result<Vec<Vec<u8>>, Error> {
    let data = std::fs::read(path)?;
    if looks_like_pem(&data) {
        load_certificates_pem(&data)
    } else {
        Ok(vec![data])
    }
}

fn looks_like_pem(data: &[u8]) -> bool {
    const MARKER: &[u8] = b"-----BEGIN ";
    data.windows(MARKER.len()).any(|w| w == MARKER)
}

/// Split concatenated PEM text into `(label, der)` pairs.
fn pem_blocks(pem_data: &[u8]) -> Result<Vec<(String, Vec<u8>)>, Error> {
    const END: &str = "-----END ";
    let text = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("-----BEGIN ") {
        let block = &rest[start..];
        let end = block
            .find(END)
            .and_then(|e| block[e + END.len()..].find("-----").map(|t| e + END.len() + t + 5))
            .ok_or_else(|| Error::Key("unterminated PEM block".into()))?;
        let (label, der) = pem_rfc7468::decode_vec(block[..end].as_bytes())
            .map_err(|e| Error::Key(format!("failed to decode PEM: {e}")))?;
        blocks.push((label.to_owned(), der));
        rest = &block[end..];
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_KEY: &str = include_str!("../testdata/rsa-key.pem");
    const RSA_CERT: &str = include_str!("../testdata/rsa-cert.pem");
    const CA_CERT: &str = include_str!("../testdata/ca-cert.pem");
    const LEAF_CERT: &str = include_str!("../testdata/leaf-cert.pem");

    #[test]
    fn pkcs8_rsa_private_key() {
        let key = load_pem(RSA_KEY.as_bytes()).unwrap();
        assert!(key.has_private());
        assert!(key.rsa_public_key().is_some());
        assert!(key.certificates.is_empty());
    }

    #[test]
    fn certificate_key_matches_private_key() {
        let private = load_pem(RSA_KEY.as_bytes()).unwrap();
        let cert = load_x509_cert_pem(RSA_CERT.as_bytes()).unwrap();
        assert!(!cert.has_private());
        assert_eq!(cert.certificates.len(), 1);
        assert!(private.same_public_key(&cert));
    }

    #[test]
    fn key_and_certificate_in_one_input() {
        let combined = format!("{RSA_KEY}{RSA_CERT}");
        let key = load_pem(combined.as_bytes()).unwrap();
        assert!(key.has_private());
        assert_eq!(key.certificates.len(), 1);
    }

    #[test]
    fn concatenated_certificates_keep_order() {
        let bundle = format!("{LEAF_CERT}{CA_CERT}");
        let certs = load_certificates_pem(bundle.as_bytes()).unwrap();
        assert_eq!(certs.len(), 2);
        let key = load_x509_cert_pem(bundle.as_bytes()).unwrap();
        assert_eq!(key.certificates, certs);
        assert!(matches!(key.data, KeyData::EcP256 { private: None, .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(load_pem(b"not a key").is_err());
        assert!(load_spki_der(&[0x30, 0x00]).is_err());
    }
}
