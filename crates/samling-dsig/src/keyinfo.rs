#![forbid(unsafe_code)]

//! The typed `<ds:KeyInfo>` family.

use base64::Engine;
use samling_core::{ns, Error, QName, Result};
use samling_keys::{Key, KeyData};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    text_element, XmlHandle, XmlObject, XmlObjectBase, XmlObjectChildrenList,
    XmlObjectRef, XmlObjectType,
};

pub(crate) const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Decode base64 element content, ignoring embedded whitespace.
pub(crate) fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    B64.decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

fn dsig(local: &str) -> QName {
    QName::with_prefix(ns::DSIG, local, ns::prefix::DSIG)
}

text_element!(
    /// `<ds:KeyName>`
    KeyName, ns::DSIG, ns::node::KEY_NAME, ns::prefix::DSIG
);
text_element!(
    /// `<ds:Modulus>`, base64 big-endian.
    Modulus, ns::DSIG, ns::node::RSA_MODULUS, ns::prefix::DSIG
);
text_element!(
    /// `<ds:Exponent>`, base64 big-endian.
    Exponent, ns::DSIG, ns::node::RSA_EXPONENT, ns::prefix::DSIG
);
text_element!(
    /// `<dsig11:PublicKey>`, a base64 uncompressed curve point.
    PublicKey, ns::DSIG11, ns::node::PUBLIC_KEY, ns::prefix::DSIG11
);
text_element!(
    /// `<ds:X509Certificate>`, base64 DER.
    X509Certificate, ns::DSIG, ns::node::X509_CERTIFICATE, ns::prefix::DSIG
);
text_element!(
    /// `<ds:X509CRL>`, base64 DER.
    X509Crl, ns::DSIG, ns::node::X509_CRL, ns::prefix::DSIG
);

impl X509Certificate {
    pub fn der(&self) -> Result<Vec<u8>> {
        decode_base64(self.value().unwrap_or_default(), "X509Certificate")
    }
}

impl X509Crl {
    pub fn der(&self) -> Result<Vec<u8>> {
        decode_base64(self.value().unwrap_or_default(), "X509CRL")
    }
}

/// `<ds:KeyInfo>`: an ordered mix of key names, key values and X.509
/// data.
#[derive(Debug)]
pub struct KeyInfo {
    base: XmlObjectBase,
    id: Option<String>,
    children: XmlObjectChildrenList<XmlObjectRef>,
}

impl KeyInfo {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.id, id.map(str::to_owned));
    }

    pub fn children(&self) -> &XmlObjectChildrenList<XmlObjectRef> {
        &self.children
    }

    /// Append a `KeyName`, `KeyValue` or `X509Data`.
    pub fn push(&mut self, child: XmlObjectRef) -> Result<()> {
        if !accepts(&child) {
            return Err(Error::IllegalAdd(format!(
                "{} is not allowed in KeyInfo",
                child.element_name()
            )));
        }
        self.children.push(child)
    }

    pub fn remove(&mut self, child: &XmlObjectRef) -> bool {
        self.children.remove_item(child)
    }

    pub fn key_names(&self) -> Vec<XmlHandle<KeyName>> {
        self.children_of()
    }

    pub fn key_values(&self) -> Vec<XmlHandle<KeyValue>> {
        self.children_of()
    }

    pub fn x509_datas(&self) -> Vec<XmlHandle<X509Data>> {
        self.children_of()
    }

    fn children_of<T: XmlObject>(&self) -> Vec<XmlHandle<T>> {
        self.children.iter().filter_map(XmlObjectRef::downcast).collect()
    }

    /// A KeyInfo carrying `certificates` in one `X509Data`.
    pub fn from_certificates(certificates: &[Vec<u8>]) -> Result<XmlHandle<KeyInfo>> {
        let key_info = KeyInfo::build();
        if !certificates.is_empty() {
            let data = X509Data::build();
            for der in certificates {
                data.borrow_mut().push_certificate(der)?;
            }
            key_info.borrow_mut().push(data.erase())?;
        }
        Ok(key_info)
    }

    /// A KeyInfo describing `key`: its name, its public value and its
    /// certificates.
    pub fn from_key(key: &Key) -> Result<XmlHandle<KeyInfo>> {
        let key_info = KeyInfo::from_certificates(&key.certificates)?;
        let mut leading = Vec::new();
        if let Some(name) = &key.name {
            let key_name = KeyName::build();
            key_name.borrow_mut().set_value(Some(name));
            leading.push(key_name.erase());
        }
        if let Some(value) = KeyValue::from_key(key)? {
            leading.push(value.erase());
        }
        let mut info = key_info.borrow_mut();
        for (index, child) in leading.into_iter().enumerate() {
            info.children.insert(index, child)?;
        }
        drop(info);
        Ok(key_info)
    }
}

fn accepts(child: &XmlObjectRef) -> bool {
    child.is::<KeyName>() || child.is::<KeyValue>() || child.is::<X509Data>()
}

impl XmlObject for KeyInfo {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.children.as_slice().to_vec()
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(id) = &self.id {
            element.set_attribute_local(ns::attr::DSIG_ID, id.as_str());
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name == QName::local(ns::attr::DSIG_ID) {
            self.id = Some(attribute.value.clone());
            return Ok(true);
        }
        Ok(false)
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if !accepts(&child) {
            return Ok(false);
        }
        self.children.push(child)?;
        Ok(true)
    }
}

impl XmlObjectType for KeyInfo {
    fn default_element_name() -> QName {
        dsig(ns::node::KEY_INFO)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let children = XmlObjectChildrenList::new(&base);
        Self {
            base,
            id: None,
            children,
        }
    }
}

/// `<ds:KeyValue>` holding either an RSA or an EC key value.
#[derive(Debug)]
pub struct KeyValue {
    base: XmlObjectBase,
    value: Option<XmlObjectRef>,
}

impl KeyValue {
    pub fn value(&self) -> Option<&XmlObjectRef> {
        self.value.as_ref()
    }

    /// Set the key value: an `RsaKeyValue` or an `EcKeyValue`.
    pub fn set_value(&mut self, value: Option<XmlObjectRef>) -> Result<()> {
        if let Some(v) = &value {
            if !(v.is::<RsaKeyValue>() || v.is::<EcKeyValue>()) {
                return Err(Error::IllegalAdd(format!(
                    "{} is not a key value",
                    v.element_name()
                )));
            }
        }
        self.base.set_child(&mut self.value, value)
    }

    pub fn rsa_key_value(&self) -> Option<XmlHandle<RsaKeyValue>> {
        self.value.as_ref()?.downcast()
    }

    pub fn ec_key_value(&self) -> Option<XmlHandle<EcKeyValue>> {
        self.value.as_ref()?.downcast()
    }

    /// The public key this value describes.
    pub fn to_key(&self) -> Result<Option<Key>> {
        if let Some(rsa) = self.rsa_key_value() {
            return rsa.borrow().to_key().map(Some);
        }
        if let Some(ec) = self.ec_key_value() {
            return ec.borrow().to_key().map(Some);
        }
        Ok(None)
    }

    /// A KeyValue for an RSA or EC key; `None` for secret keys.
    pub fn from_key(key: &Key) -> Result<Option<XmlHandle<KeyValue>>> {
        let inner = match &key.data {
            KeyData::Rsa { public, .. } => {
                use rsa::traits::PublicKeyParts;
                let value = RsaKeyValue::build();
                {
                    let mut v = value.borrow_mut();
                    let modulus = Modulus::build();
                    modulus.borrow_mut().set_value(Some(&B64.encode(public.n().to_bytes_be())));
                    let exponent = Exponent::build();
                    exponent.borrow_mut().set_value(Some(&B64.encode(public.e().to_bytes_be())));
                    v.set_modulus(Some(modulus))?;
                    v.set_exponent(Some(exponent))?;
                }
                value.erase()
            }
            KeyData::EcP256 { .. } | KeyData::EcP384 { .. } => {
                let Some((curve, point)) = key.ec_public_point() else {
                    return Ok(None);
                };
                let value = EcKeyValue::build();
                {
                    let mut v = value.borrow_mut();
                    let named = NamedCurve::build();
                    named.borrow_mut().set_uri(Some(curve));
                    let public_key = PublicKey::build();
                    public_key.borrow_mut().set_value(Some(&B64.encode(point)));
                    v.set_named_curve(Some(named))?;
                    v.set_public_key(Some(public_key))?;
                }
                value.erase()
            }
            KeyData::Hmac(_) => return Ok(None),
        };
        let key_value = KeyValue::build();
        key_value.borrow_mut().set_value(Some(inner))?;
        Ok(Some(key_value))
    }
}

impl XmlObject for KeyValue {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.value.iter().cloned().collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if !(child.is::<RsaKeyValue>() || child.is::<EcKeyValue>()) {
            return Ok(false);
        }
        self.set_value(Some(child))?;
        Ok(true)
    }
}

impl XmlObjectType for KeyValue {
    fn default_element_name() -> QName {
        dsig(ns::node::KEY_VALUE)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            value: None,
        }
    }
}

/// `<ds:RSAKeyValue>`
#[derive(Debug)]
pub struct RsaKeyValue {
    base: XmlObjectBase,
    modulus: Option<XmlHandle<Modulus>>,
    exponent: Option<XmlHandle<Exponent>>,
}

impl RsaKeyValue {
    pub fn modulus(&self) -> Option<&XmlHandle<Modulus>> {
        self.modulus.as_ref()
    }

    pub fn set_modulus(&mut self, modulus: Option<XmlHandle<Modulus>>) -> Result<()> {
        self.base.set_child(&mut self.modulus, modulus)
    }

    pub fn exponent(&self) -> Option<&XmlHandle<Exponent>> {
        self.exponent.as_ref()
    }

    pub fn set_exponent(&mut self, exponent: Option<XmlHandle<Exponent>>) -> Result<()> {
        self.base.set_child(&mut self.exponent, exponent)
    }

    pub fn to_key(&self) -> Result<Key> {
        let modulus = self
            .modulus
            .as_ref()
            .and_then(|m| m.borrow().value().map(str::to_owned))
            .ok_or_else(|| Error::MissingElement("Modulus".into()))?;
        let exponent = self
            .exponent
            .as_ref()
            .and_then(|e| e.borrow().value().map(str::to_owned))
            .ok_or_else(|| Error::MissingElement("Exponent".into()))?;
        let n = rsa::BigUint::from_bytes_be(&decode_base64(&modulus, "Modulus")?);
        let e = rsa::BigUint::from_bytes_be(&decode_base64(&exponent, "Exponent")?);
        let public = rsa::RsaPublicKey::new(n, e)
            .map_err(|err| Error::Key(format!("invalid RSA public key: {err}")))?;
        Ok(Key::new(KeyData::Rsa {
            private: None,
            public,
        }))
    }
}

impl XmlObject for RsaKeyValue {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::new();
        children.extend(self.modulus.iter().map(XmlHandle::erase));
        children.extend(self.exponent.iter().map(XmlHandle::erase));
        children
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(modulus) = child.downcast::<Modulus>() {
            self.set_modulus(Some(modulus))?;
        } else if let Some(exponent) = child.downcast::<Exponent>() {
            self.set_exponent(Some(exponent))?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for RsaKeyValue {
    fn default_element_name() -> QName {
        dsig(ns::node::RSA_KEY_VALUE)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            modulus: None,
            exponent: None,
        }
    }
}

/// `<dsig11:NamedCurve URI="urn:oid:...">`
#[derive(Debug)]
pub struct NamedCurve {
    base: XmlObjectBase,
    uri: Option<String>,
}

impl NamedCurve {
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn set_uri(&mut self, uri: Option<&str>) {
        self.base.assign(&mut self.uri, uri.map(str::to_owned));
    }
}

impl XmlObject for NamedCurve {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn marshall_attributes(&self, element: &Element) -> Result<()> {
        if let Some(uri) = &self.uri {
            element.set_attribute_local(ns::attr::URI, uri.as_str());
        }
        Ok(())
    }

    fn process_attribute(&mut self, attribute: &Attribute) -> Result<bool> {
        if attribute.name == QName::local(ns::attr::URI) {
            self.uri = Some(attribute.value.clone());
            return Ok(true);
        }
        Ok(false)
    }
}

impl XmlObjectType for NamedCurve {
    fn default_element_name() -> QName {
        QName::with_prefix(ns::DSIG11, ns::node::NAMED_CURVE, ns::prefix::DSIG11)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            uri: None,
        }
    }
}

/// `<dsig11:ECKeyValue>` with a named curve.
#[derive(Debug)]
pub struct EcKeyValue {
    base: XmlObjectBase,
    named_curve: Option<XmlHandle<NamedCurve>>,
    public_key: Option<XmlHandle<PublicKey>>,
}

impl EcKeyValue {
    pub fn named_curve(&self) -> Option<&XmlHandle<NamedCurve>> {
        self.named_curve.as_ref()
    }

    pub fn set_named_curve(&mut self, curve: Option<XmlHandle<NamedCurve>>) -> Result<()> {
        self.base.set_child(&mut self.named_curve, curve)
    }

    pub fn public_key(&self) -> Option<&XmlHandle<PublicKey>> {
        self.public_key.as_ref()
    }

    pub fn set_public_key(&mut self, public_key: Option<XmlHandle<PublicKey>>) -> Result<()> {
        self.base.set_child(&mut self.public_key, public_key)
    }

    pub fn to_key(&self) -> Result<Key> {
        let curve = self
            .named_curve
            .as_ref()
            .and_then(|c| c.borrow().uri().map(str::to_owned))
            .ok_or_else(|| Error::MissingElement("NamedCurve".into()))?;
        let point = self
            .public_key
            .as_ref()
            .and_then(|p| p.borrow().value().map(str::to_owned))
            .ok_or_else(|| Error::MissingElement("PublicKey".into()))?;
        let point = decode_base64(&point, "PublicKey")?;
        let data = match curve.as_str() {
            samling_core::algorithm::CURVE_P256 => KeyData::EcP256 {
                private: None,
                public: p256::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                    .map_err(|e| Error::Key(format!("invalid P-256 point: {e}")))?,
            },
            samling_core::algorithm::CURVE_P384 => KeyData::EcP384 {
                private: None,
                public: p384::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                    .map_err(|e| Error::Key(format!("invalid P-384 point: {e}")))?,
            },
            other => return Err(Error::UnsupportedAlgorithm(format!("EC curve: {other}"))),
        };
        Ok(Key::new(data))
    }
}

impl XmlObject for EcKeyValue {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        let mut children = Vec::new();
        children.extend(self.named_curve.iter().map(XmlHandle::erase));
        children.extend(self.public_key.iter().map(XmlHandle::erase));
        children
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(curve) = child.downcast::<NamedCurve>() {
            self.set_named_curve(Some(curve))?;
        } else if let Some(public_key) = child.downcast::<PublicKey>() {
            self.set_public_key(Some(public_key))?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for EcKeyValue {
    fn default_element_name() -> QName {
        QName::with_prefix(ns::DSIG11, ns::node::EC_KEY_VALUE, ns::prefix::DSIG11)
    }

    fn with_name(element_name: QName) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            named_curve: None,
            public_key: None,
        }
    }
}

/// `<ds:X509Data>` with certificates and CRLs.
#[derive(Debug)]
pub struct X509Data {
    base: XmlObjectBase,
    certificates: XmlObjectChildrenList<XmlHandle<X509Certificate>>,
    crls: XmlObjectChildrenList<XmlHandle<X509Crl>>,
}

impl X509Data {
    pub fn certificates(&self) -> &XmlObjectChildrenList<XmlHandle<X509Certificate>> {
        &self.certificates
    }

    pub fn certificates_mut(&mut self) -> &mut XmlObjectChildrenList<XmlHandle<X509Certificate>> {
        &mut self.certificates
    }

    pub fn crls(&self) -> &XmlObjectChildrenList<XmlHandle<X509Crl>> {
        &self.crls
    }

    pub fn crls_mut(&mut self) -> &mut XmlObjectChildrenList<XmlHandle<X509Crl>> {
        &mut self.crls
    }

    /// Append a DER certificate.
    pub fn push_certificate(&mut self, der: &[u8]) -> Result<()> {
        let cert = X509Certificate::build();
        cert.borrow_mut().set_value(Some(&B64.encode(der)));
        self.certificates.push(cert)
    }

    /// Append a DER CRL.
    pub fn push_crl(&mut self, der: &[u8]) -> Result<()> {
        let crl = X509Crl::build();
        crl.borrow_mut().set_value(Some(&B64.encode(der)));
        self.crls.push(crl)
    }

    pub fn certificate_ders(&self) -> Result<Vec<Vec<u8>>> {
        self.certificates.iter().map(|c| c.borrow().der()).collect()
    }

    pub fn crl_ders(&self) -> Result<Vec<Vec<u8>>> {
        self.crls.iter().map(|c| c.borrow().der()).collect()
    }
}

impl XmlObject for X509Data {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.certificates
            .erased()
            .chain(self.crls.erased())
            .collect()
    }

    fn process_child(&mut self, child: XmlObjectRef) -> Result<bool> {
        if let Some(cert) = child.downcast::<X509Certificate>() {
            self.certificates.push(cert)?;
        } else if let Some(crl) = child.downcast::<X509Crl>() {
            self.crls.push(crl)?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}

impl XmlObjectType for X509Data {
    fn default_element_name() -> QName {
        dsig(ns::node::X509_DATA)
    }

    fn with_name(element_name: QName) -> Self {
        let base = XmlObjectBase::new(element_name);
        let certificates = XmlObjectChildrenList::new(&base);
        let crls = XmlObjectChildrenList::new(&base);
        Self {
            base,
            certificates,
            crls,
        }
    }
}
