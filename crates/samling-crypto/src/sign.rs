#![forbid(unsafe_code)]

//! Signature algorithms (RSA PKCS#1 v1.5, ECDSA, HMAC).
//!
//! Every algorithm hashes the input with its [`DigestMethod`] first and
//! signs the prehash, so one code path serves each key family regardless
//! of the digest paired with it.

use crate::digest::DigestMethod;
use samling_core::{algorithm, Error};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

/// Key material for signature operations.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::SigningKey),
    EcP384Public(p384::ecdsa::VerifyingKey),
    Hmac(Vec<u8>),
}

impl SigningKey {
    pub fn family(&self) -> SignatureFamily {
        match self {
            Self::Rsa(_) | Self::RsaPublic(_) => SignatureFamily::RsaPkcs1,
            Self::EcP256(_) | Self::EcP256Public(_) | Self::EcP384(_) | Self::EcP384Public(_) => {
                SignatureFamily::Ecdsa
            }
            Self::Hmac(_) => SignatureFamily::Hmac,
        }
    }

    /// Whether this key can produce signatures.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Self::Rsa(_) | Self::EcP256(_) | Self::EcP384(_) | Self::Hmac(_)
        )
    }

    /// The verification half of this key. HMAC keys are returned as is.
    pub fn to_public(&self) -> SigningKey {
        match self {
            Self::Rsa(k) => Self::RsaPublic(k.to_public_key()),
            Self::EcP256(k) => Self::EcP256Public(*k.verifying_key()),
            Self::EcP384(k) => Self::EcP384Public(*k.verifying_key()),
            other => other.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rsa(_) => "Rsa",
            Self::RsaPublic(_) => "RsaPublic",
            Self::EcP256(_) => "EcP256",
            Self::EcP256Public(_) => "EcP256Public",
            Self::EcP384(_) => "EcP384",
            Self::EcP384Public(_) => "EcP384Public",
            Self::Hmac(_) => "Hmac",
        };
        write!(f, "SigningKey::{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFamily {
    RsaPkcs1,
    Ecdsa,
    Hmac,
}

/// A signature algorithm identified by its XML-DSig URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMethod {
    uri: &'static str,
    family: SignatureFamily,
    digest: DigestMethod,
}

/// Bind `$d` to the hash type for `$method` and evaluate `$body`.
macro_rules! with_digest {
    ($method:expr, $d:ident => $body:expr) => {
        match $method {
            DigestMethod::Sha1 => {
                type $d = sha1::Sha1;
                $body
            }
            DigestMethod::Sha224 => {
                type $d = sha2::Sha224;
                $body
            }
            DigestMethod::Sha256 => {
                type $d = sha2::Sha256;
                $body
            }
            DigestMethod::Sha384 => {
                type $d = sha2::Sha384;
                $body
            }
            DigestMethod::Sha512 => {
                type $d = sha2::Sha512;
                $body
            }
        }
    };
}

impl SignatureMethod {
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        use DigestMethod::*;
        use SignatureFamily::*;
        let (uri, family, digest) = match uri {
            algorithm::RSA_SHA1 => (algorithm::RSA_SHA1, RsaPkcs1, Sha1),
            algorithm::RSA_SHA256 => (algorithm::RSA_SHA256, RsaPkcs1, Sha256),
            algorithm::RSA_SHA384 => (algorithm::RSA_SHA384, RsaPkcs1, Sha384),
            algorithm::RSA_SHA512 => (algorithm::RSA_SHA512, RsaPkcs1, Sha512),
            algorithm::ECDSA_SHA1 => (algorithm::ECDSA_SHA1, Ecdsa, Sha1),
            algorithm::ECDSA_SHA256 => (algorithm::ECDSA_SHA256, Ecdsa, Sha256),
            algorithm::ECDSA_SHA384 => (algorithm::ECDSA_SHA384, Ecdsa, Sha384),
            algorithm::ECDSA_SHA512 => (algorithm::ECDSA_SHA512, Ecdsa, Sha512),
            algorithm::HMAC_SHA1 => (algorithm::HMAC_SHA1, Hmac, Sha1),
            algorithm::HMAC_SHA256 => (algorithm::HMAC_SHA256, Hmac, Sha256),
            algorithm::HMAC_SHA384 => (algorithm::HMAC_SHA384, Hmac, Sha384),
            algorithm::HMAC_SHA512 => (algorithm::HMAC_SHA512, Hmac, Sha512),
            _ => {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "signature algorithm: {uri}"
                )))
            }
        };
        Ok(Self { uri, family, digest })
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn family(&self) -> SignatureFamily {
        self.family
    }

    pub fn digest(&self) -> DigestMethod {
        self.digest
    }

    /// Whether `key` belongs to the family this algorithm signs with.
    pub fn accepts(&self, key: &SigningKey) -> bool {
        key.family() == self.family
    }

    pub fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        if !key.is_private() {
            return Err(Error::Key(format!("{} requires a private key", self.uri)));
        }
        self.check_family(key)?;
        if let SigningKey::Hmac(secret) = key {
            return hmac(self.digest, secret, data);
        }
        let hashed = self.digest.digest(data);
        match key {
            SigningKey::Rsa(k) => {
                let padding = with_digest!(self.digest, D => rsa::Pkcs1v15Sign::new::<D>());
                k.sign(padding, &hashed)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
            }
            SigningKey::EcP256(k) => {
                let sig: p256::ecdsa::Signature = k
                    .sign_prehash(&hashed)
                    .map_err(|e| Error::Crypto(format!("ECDSA signing failed: {e}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            SigningKey::EcP384(k) => {
                let sig: p384::ecdsa::Signature = k
                    .sign_prehash(&hashed)
                    .map_err(|e| Error::Crypto(format!("ECDSA signing failed: {e}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            _ => Err(Error::Key(format!("{} requires a private key", self.uri))),
        }
    }

    /// Verify `signature` over `data`.
    ///
    /// A malformed signature value is reported as `Ok(false)`; an
    /// unsuitable key is an error.
    pub fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error> {
        self.check_family(key)?;
        if let SigningKey::Hmac(secret) = key {
            return hmac_verify(self.digest, secret, data, signature);
        }
        let hashed = self.digest.digest(data);
        let valid = match key.to_public() {
            SigningKey::RsaPublic(k) => {
                let padding = with_digest!(self.digest, D => rsa::Pkcs1v15Sign::new::<D>());
                k.verify(padding, &hashed, signature).is_ok()
            }
            // XML-DSig carries ECDSA signatures as the fixed-width r || s
            // concatenation.
            SigningKey::EcP256Public(k) => match p256::ecdsa::Signature::from_slice(signature) {
                Ok(sig) => k.verify_prehash(&hashed, &sig).is_ok(),
                Err(_) => false,
            },
            SigningKey::EcP384Public(k) => match p384::ecdsa::Signature::from_slice(signature) {
                Ok(sig) => k.verify_prehash(&hashed, &sig).is_ok(),
                Err(_) => false,
            },
            _ => false,
        };
        Ok(valid)
    }

    fn check_family(&self, key: &SigningKey) -> Result<(), Error> {
        if self.accepts(key) {
            Ok(())
        } else {
            Err(Error::Key(format!(
                "{:?} key cannot be used with {}",
                key.family(),
                self.uri
            )))
        }
    }
}

fn hmac(digest: DigestMethod, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use hmac::{Hmac, Mac};
    with_digest!(digest, D => {
        let mut mac = <Hmac<D> as Mac>::new_from_slice(key)
            .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    })
}

/// Constant-time HMAC check. Truncated outputs are not accepted.
fn hmac_verify(digest: DigestMethod, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, Error> {
    use hmac::{Hmac, Mac};
    with_digest!(digest, D => {
        let mut mac = <Hmac<D> as Mac>::new_from_slice(key)
            .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
        mac.update(data);
        Ok(mac.verify_slice(expected).is_ok())
    })
}
