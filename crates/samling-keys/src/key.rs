#![forbid(unsafe_code)]

//! Key material and the certificates that travel with it.

use samling_crypto::SigningKey;

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    EcP384 {
        private: Option<p384::ecdsa::SigningKey>,
        public: p384::ecdsa::VerifyingKey,
    },
    Hmac(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, private) = match self {
            Self::Rsa { private, .. } => ("RSA", private.is_some()),
            Self::EcP256 { private, .. } => ("EC P-256", private.is_some()),
            Self::EcP384 { private, .. } => ("EC P-384", private.is_some()),
            Self::Hmac(k) => return write!(f, "HMAC key ({} bytes)", k.len()),
        };
        if private {
            write!(f, "{kind} private+public key")
        } else {
            write!(f, "{kind} public key")
        }
    }
}

/// A key, optionally named, with the DER certificates that vouch for it.
///
/// When certificates are present the first one is the entity certificate
/// for this key.
#[derive(Debug, Clone)]
pub struct Key {
    pub name: Option<String>,
    pub data: KeyData,
    pub certificates: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData) -> Self {
        Self {
            name: None,
            data,
            certificates: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = certificates;
        self
    }

    /// The entity certificate, if any.
    pub fn certificate(&self) -> Option<&[u8]> {
        self.certificates.first().map(Vec::as_slice)
    }

    pub fn has_private(&self) -> bool {
        match &self.data {
            KeyData::Rsa { private, .. } => private.is_some(),
            KeyData::EcP256 { private, .. } => private.is_some(),
            KeyData::EcP384 { private, .. } => private.is_some(),
            KeyData::Hmac(_) => true,
        }
    }

    /// Convert to a `SigningKey` for use with the signature algorithms.
    ///
    /// The private half is used whenever it is available.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::EcP256 { private: Some(sk), .. } => SigningKey::EcP256(sk.clone()),
            KeyData::EcP256 { public, .. } => SigningKey::EcP256Public(*public),
            KeyData::EcP384 { private: Some(sk), .. } => SigningKey::EcP384(sk.clone()),
            KeyData::EcP384 { public, .. } => SigningKey::EcP384Public(*public),
            KeyData::Hmac(k) => SigningKey::Hmac(k.clone()),
        }
    }

    /// A copy of this key with any private material removed.
    pub fn public(&self) -> Key {
        let data = match &self.data {
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::EcP256 { public, .. } => KeyData::EcP256 {
                private: None,
                public: *public,
            },
            KeyData::EcP384 { public, .. } => KeyData::EcP384 {
                private: None,
                public: *public,
            },
            KeyData::Hmac(k) => KeyData::Hmac(k.clone()),
        };
        Key {
            name: self.name.clone(),
            data,
            certificates: self.certificates.clone(),
        }
    }

    /// Whether both keys carry the same public (or secret) value.
    pub fn same_public_key(&self, other: &Key) -> bool {
        match (&self.data, &other.data) {
            (KeyData::Rsa { public: a, .. }, KeyData::Rsa { public: b, .. }) => a == b,
            (KeyData::EcP256 { public: a, .. }, KeyData::EcP256 { public: b, .. }) => {
                a.to_encoded_point(false) == b.to_encoded_point(false)
            }
            (KeyData::EcP384 { public: a, .. }, KeyData::EcP384 { public: b, .. }) => {
                a.to_encoded_point(false) == b.to_encoded_point(false)
            }
            (KeyData::Hmac(a), KeyData::Hmac(b)) => a == b,
            _ => false,
        }
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    /// The curve URI and uncompressed SEC1 point of an EC key.
    pub fn ec_public_point(&self) -> Option<(&'static str, Vec<u8>)> {
        match &self.data {
            KeyData::EcP256 { public, .. } => Some((
                samling_core::algorithm::CURVE_P256,
                public.to_encoded_point(false).as_bytes().to_vec(),
            )),
            KeyData::EcP384 { public, .. } => Some((
                samling_core::algorithm::CURVE_P384,
                public.to_encoded_point(false).as_bytes().to_vec(),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p256(seed: u8) -> Key {
        let sk = p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap();
        let public = *sk.verifying_key();
        Key::new(KeyData::EcP256 {
            private: Some(sk),
            public,
        })
    }

    #[test]
    fn public_strips_private_half() {
        let key = p256(3).with_name("k");
        assert!(key.has_private());
        let public = key.public();
        assert!(!public.has_private());
        assert_eq!(public.name.as_deref(), Some("k"));
        assert!(key.same_public_key(&public));
        assert!(!public.to_signing_key().is_private());
    }

    #[test]
    fn different_keys_differ() {
        assert!(!p256(3).same_public_key(&p256(4)));
        assert!(!p256(3).same_public_key(&Key::new(KeyData::Hmac(vec![1]))));
    }

    #[test]
    fn ec_point_is_uncompressed() {
        let (curve, point) = p256(5).ec_public_point().unwrap();
        assert_eq!(curve, samling_core::algorithm::CURVE_P256);
        assert_eq!(point.len(), 65);
        assert_eq!(point[0], 0x04);
    }
}
