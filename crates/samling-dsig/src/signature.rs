#![forbid(unsafe_code)]

//! The `<ds:Signature>` node.
//!
//! A signature built by the application carries a [`SigningContext`];
//! marshalling lays out the complete element with empty digest and
//! signature values, and [`crate::sign`] fills them in. A signature read
//! from a document keeps its source DOM and the algorithms found in it.

use crate::context::SigningContext;
use crate::keyinfo::{decode_base64, KeyInfo, KeyValue};
use crate::reference::{algorithm_of, dsig_child, inclusive_prefixes};
use samling_c14n::C14nMode;
use samling_core::{ns, Error, QName, Result};
use samling_xml::{Attribute, Element};
use samling_xmlobject::{
    build_for, create_element, ContextMap, Marshaller, ObjectProvider, Unmarshaller,
    UnmarshallingContext, XmlHandle, XmlObject, XmlObjectBase, XmlObjectBuilder,
    XmlObjectProviderRegistry, XmlObjectRef, XmlObjectType,
};
use std::sync::Arc;

pub fn element_name() -> QName {
    QName::with_prefix(ns::DSIG, ns::node::SIGNATURE, ns::prefix::DSIG)
}

fn dsig(local: &str) -> QName {
    QName::with_prefix(ns::DSIG, local, ns::prefix::DSIG)
}

#[derive(Debug)]
pub struct Signature {
    base: XmlObjectBase,
    id: Option<String>,
    context: SigningContext,
    key_info: Option<XmlHandle<KeyInfo>>,
    construct: Option<Element>,
}

impl Signature {
    /// A new signature to be signed with `context`.
    ///
    /// The KeyInfo carries the context's certificates, or the public
    /// value of its signing key when there are none.
    pub fn new(context: SigningContext) -> Result<XmlHandle<Signature>> {
        let key_info = if !context.certificates().is_empty() {
            Some(KeyInfo::from_certificates(context.certificates())?)
        } else if let Some(value) = context
            .signing_key()
            .map(KeyValue::from_key)
            .transpose()?
            .flatten()
        {
            let key_info = KeyInfo::build();
            key_info.borrow_mut().push(value.erase())?;
            Some(key_info)
        } else {
            None
        };
        let signature = XmlHandle::new(Self::with_context(element_name(), context));
        signature.borrow_mut().set_key_info(key_info)?;
        Ok(signature)
    }

    fn with_context(element_name: QName, context: SigningContext) -> Self {
        Self {
            base: XmlObjectBase::new(element_name),
            id: None,
            context,
            key_info: None,
            construct: None,
        }
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    /// Replace the signing parameters. The signature must be marshalled
    /// again before signing.
    pub fn set_context(&mut self, context: SigningContext) {
        self.context = context;
        self.construct = None;
        self.base.invalidate();
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: Option<&str>) {
        self.base.assign(&mut self.id, id.map(str::to_owned));
    }

    pub fn key_info(&self) -> Option<&XmlHandle<KeyInfo>> {
        self.key_info.as_ref()
    }

    pub fn set_key_info(&mut self, key_info: Option<XmlHandle<KeyInfo>>) -> Result<()> {
        self.base.set_child(&mut self.key_info, key_info)
    }

    /// The element laid out by the last marshalling, waiting to be
    /// signed. `None` for signatures read from a document.
    pub fn construct(&self) -> Option<&Element> {
        self.construct.as_ref()
    }

    /// The decoded `SignatureValue` of the cached DOM.
    pub fn signature_value(&self) -> Result<Option<Vec<u8>>> {
        let Some(dom) = self.base.dom() else {
            return Ok(None);
        };
        let Some(value) = dom.first_child(ns::DSIG, ns::node::SIGNATURE_VALUE) else {
            return Ok(None);
        };
        let text = value.text();
        if text.trim().is_empty() {
            return Ok(None);
        }
        decode_base64(&text, "SignatureValue").map(Some)
    }
}

impl XmlObject for Signature {
    fn base(&self) -> &XmlObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut XmlObjectBase {
        &mut self.base
    }

    fn ordered_children(&self) -> Vec<XmlObjectRef> {
        self.key_info.iter().map(XmlHandle::erase).collect()
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
}

/// Read the signing parameters back out of a `<ds:Signature>` element.
fn context_from_element(element: &Element) -> Result<SigningContext> {
    let signed_info = dsig_child(element, ns::node::SIGNED_INFO)?;
    let c14n = dsig_child(&signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let method = dsig_child(&signed_info, ns::node::SIGNATURE_METHOD)?;
    let reference = dsig_child(&signed_info, ns::node::REFERENCE)?;
    let digest = dsig_child(&reference, ns::node::DIGEST_METHOD)?;

    let mut prefixes = inclusive_prefixes(&c14n);
    let mut transforms = Vec::new();
    if let Some(list) = reference.first_child(ns::DSIG, ns::node::TRANSFORMS) {
        for transform in list.children_named(ns::DSIG, ns::node::TRANSFORM) {
            if prefixes.is_empty() {
                prefixes = inclusive_prefixes(&transform);
            }
            transforms.push(algorithm_of(&transform)?);
        }
    }
    Ok(SigningContext::new()
        .with_canonicalization_algorithm(algorithm_of(&c14n)?)
        .with_signature_algorithm(algorithm_of(&method)?)
        .with_digest_algorithm(algorithm_of(&digest)?)
        .with_transforms(transforms)
        .with_inclusive_prefixes(prefixes))
}

/// Signatures cannot be built without signing parameters; the
/// unmarshalling path recovers them from the source element.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureBuilder;

impl XmlObjectBuilder for SignatureBuilder {
    fn build(&self, element_name: &QName) -> Result<XmlObjectRef> {
        Err(Error::IllegalState(format!(
            "{element_name} needs a SigningContext; use Signature::new"
        )))
    }

    fn build_from_element(&self, element: &Element, _context: &mut ContextMap) -> Result<XmlObjectRef> {
        let context = context_from_element(element)
            .map_err(|e| Error::Unmarshalling(format!("malformed Signature: {e}")))?;
        Ok(XmlHandle::new(Signature::with_context(element.name(), context)).erase())
    }
}

/// The URI the signature's reference must carry: the parent's identifier,
/// or the whole document when the parent has none.
fn reference_uri(object: &XmlObjectRef) -> Result<String> {
    let Some(parent) = object.parent() else {
        return Ok(String::new());
    };
    let parent = parent.try_borrow()?;
    let id = parent
        .as_signable()
        .and_then(|s| s.signature_reference_id());
    Ok(id.map(|id| format!("#{id}")).unwrap_or_default())
}

fn cached_reference_uri(dom: &Element) -> Option<String> {
    dom.first_child(ns::DSIG, ns::node::SIGNED_INFO)?
        .first_child(ns::DSIG, ns::node::REFERENCE)?
        .attribute_local(ns::attr::URI)
}

fn append_method(parent: &Element, local: &str, uri: &str) -> Element {
    let method = parent.append_new(dsig(local));
    method.set_attribute_local(ns::attr::ALGORITHM, uri);
    method
}

fn append_prefix_list(method: &Element, prefixes: &[String]) {
    if prefixes.is_empty() {
        return;
    }
    let list = Element::new_declared(QName::with_prefix(
        ns::EXC_C14N,
        ns::node::INCLUSIVE_NAMESPACES,
        ns::prefix::EXC_C14N,
    ));
    list.set_attribute_local(ns::attr::PREFIX_LIST, prefixes.join(" "));
    method.append_child(list);
}

/// Lays out the full `<ds:Signature>` for signing.
///
/// A cached DOM is reused only while its reference still points at the
/// parent's current identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureMarshaller;

impl Marshaller for SignatureMarshaller {
    fn marshall(&self, object: &XmlObjectRef, registry: &XmlObjectProviderRegistry) -> Result<Element> {
        let handle = object
            .downcast::<Signature>()
            .ok_or_else(|| Error::Marshalling(format!("{} is not a Signature", object.element_name())))?;
        let uri = reference_uri(object)?;
        if let Some(cached) = object.dom() {
            if cached_reference_uri(&cached).unwrap_or_default() == uri {
                tracing::trace!("reusing cached Signature DOM");
                return Ok(cached);
            }
            object.node().release_dom();
        }

        let (element, key_info) = {
            let signature = handle.try_borrow()?;
            let context = signature.context();
            let element = create_element(&*signature);
            signature.marshall_attributes(&element)?;

            let signed_info = element.append_new(dsig(ns::node::SIGNED_INFO));
            let c14n = append_method(
                &signed_info,
                ns::node::CANONICALIZATION_METHOD,
                context.canonicalization_algorithm(),
            );
            let exclusive = |uri: &str| C14nMode::from_uri(uri).is_some_and(|m| m.is_exclusive());
            if exclusive(context.canonicalization_algorithm()) {
                append_prefix_list(&c14n, context.inclusive_prefixes());
            }
            append_method(
                &signed_info,
                ns::node::SIGNATURE_METHOD,
                context.signature_algorithm(),
            );

            let reference = signed_info.append_new(dsig(ns::node::REFERENCE));
            reference.set_attribute_local(ns::attr::URI, uri.as_str());
            if !context.transforms().is_empty() {
                let transforms = reference.append_new(dsig(ns::node::TRANSFORMS));
                for transform in context.transforms() {
                    let t = append_method(&transforms, ns::node::TRANSFORM, transform);
                    if exclusive(transform) {
                        append_prefix_list(&t, context.inclusive_prefixes());
                    }
                }
            }
            append_method(&reference, ns::node::DIGEST_METHOD, context.digest_algorithm());
            reference.append_new(dsig(ns::node::DIGEST_VALUE));
            element.append_new(dsig(ns::node::SIGNATURE_VALUE));
            (element, signature.key_info().cloned())
        };

        if let Some(key_info) = key_info {
            element.append_child(registry.marshall(&key_info.erase())?);
        }
        tracing::debug!(reference = %uri, "laid out Signature");
        handle.try_borrow_mut()?.construct = Some(element.clone());
        object.node().set_dom(element.clone());
        Ok(element)
    }
}

/// Reads a `<ds:Signature>`, unmarshalling its KeyInfo and keeping the
/// rest as DOM.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureUnmarshaller;

impl Unmarshaller for SignatureUnmarshaller {
    fn unmarshall(&self, element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef> {
        ctx.enter(element);
        let result = unmarshall_signature(element, ctx);
        ctx.leave();
        result
    }
}

fn unmarshall_signature(element: &Element, ctx: &mut UnmarshallingContext<'_>) -> Result<XmlObjectRef> {
    let object = build_for(element, ctx)?;
    let handle = object
        .downcast::<Signature>()
        .ok_or_else(|| Error::Unmarshalling(format!("{} is not a Signature", element.name())))?;

    for attribute in element.attributes() {
        if attribute.name.namespace_uri() == ns::XSI {
            continue;
        }
        if !handle.try_borrow_mut()?.process_attribute(&attribute)? {
            ctx.unknown_attribute(object.element_name(), &attribute.name)?;
        }
    }
    if let Some(key_info) = element.first_child(ns::DSIG, ns::node::KEY_INFO) {
        if let Some(child) = ctx.unmarshall_child(&key_info)? {
            let key_info = child.downcast::<KeyInfo>().ok_or_else(|| {
                Error::Unmarshalling(format!("{} is not a KeyInfo", child.element_name()))
            })?;
            handle.try_borrow_mut()?.set_key_info(Some(key_info))?;
        }
    }

    object.node().set_dom(element.clone());
    Ok(object)
}

/// The provider for `<ds:Signature>`.
pub fn provider() -> ObjectProvider {
    ObjectProvider {
        builder: Arc::new(SignatureBuilder),
        marshaller: Arc::new(SignatureMarshaller),
        unmarshaller: Arc::new(SignatureUnmarshaller),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{ec_key, registry};
    use samling_core::algorithm;
    use samling_xmlobject::UnmarshallingPolicy;

    fn context() -> SigningContext {
        SigningContext::new()
            .with_signature_algorithm(algorithm::ECDSA_SHA256)
            .with_digest_algorithm(algorithm::SHA256)
            .with_inclusive_prefixes(vec!["xs".into()])
            .with_signing_key(ec_key(1))
    }

    #[test]
    fn builder_refuses_plain_build() {
        let registry = registry();
        assert!(matches!(
            registry.build(&element_name()),
            Err(Error::IllegalState(_))
        ));
    }

    #[test]
    fn marshalls_complete_layout() {
        let registry = registry();
        let signature = Signature::new(context()).unwrap();
        let element = registry.marshall(&signature.erase()).unwrap();

        let signed_info = element.first_child(ns::DSIG, ns::node::SIGNED_INFO).unwrap();
        let c14n = signed_info
            .first_child(ns::DSIG, ns::node::CANONICALIZATION_METHOD)
            .unwrap();
        assert_eq!(c14n.attribute_local("Algorithm").as_deref(), Some(algorithm::EXC_C14N));
        assert_eq!(inclusive_prefixes(&c14n), ["xs"]);
        let reference = signed_info.first_child(ns::DSIG, ns::node::REFERENCE).unwrap();
        assert_eq!(reference.attribute_local("URI").as_deref(), Some(""));
        let transforms = reference
            .first_child(ns::DSIG, ns::node::TRANSFORMS)
            .unwrap()
            .children_named(ns::DSIG, ns::node::TRANSFORM);
        assert_eq!(transforms.len(), 2);
        assert!(element.first_child(ns::DSIG, ns::node::SIGNATURE_VALUE).is_some());
        let key_info = element.first_child(ns::DSIG, ns::node::KEY_INFO).unwrap();
        assert!(key_info.first_child(ns::DSIG, ns::node::KEY_VALUE).is_some());

        let signature = signature.borrow();
        assert!(signature.construct().unwrap().ptr_eq(&element));
        assert_eq!(signature.signature_value().unwrap(), None);
    }

    #[test]
    fn unmarshalled_signature_recovers_context() {
        let registry = registry();
        let signature = Signature::new(context()).unwrap();
        signature.borrow_mut().set_id(Some("sig-1"));
        let element = registry.marshall(&signature.erase()).unwrap();
        let xml = samling_xml::writer::to_string(&element);

        let back = registry
            .unmarshall(&samling_xml::parse(&xml).unwrap(), UnmarshallingPolicy::strict())
            .unwrap()
            .downcast::<Signature>()
            .unwrap();
        let back = back.borrow();
        assert_eq!(back.id(), Some("sig-1"));
        assert!(back.construct().is_none());
        let ctx = back.context();
        assert_eq!(ctx.signature_algorithm(), algorithm::ECDSA_SHA256);
        assert_eq!(ctx.digest_algorithm(), algorithm::SHA256);
        assert_eq!(ctx.inclusive_prefixes(), ["xs"]);
        assert_eq!(
            ctx.transforms(),
            [algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N]
        );
        assert_eq!(back.key_info().unwrap().borrow().key_values().len(), 1);
    }

    #[test]
    fn malformed_signature_is_an_unmarshalling_error() {
        let xml = r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>"#;
        let err = registry()
            .unmarshall(&samling_xml::parse(xml).unwrap(), UnmarshallingPolicy::lenient())
            .unwrap_err();
        assert!(matches!(err, Error::Unmarshalling(_)));
    }

    #[test]
    fn certificates_take_precedence_in_key_info() {
        let ctx = context().with_certificates(vec![vec![0x30, 0x00]]);
        let signature = Signature::new(ctx).unwrap();
        let signature = signature.borrow();
        let key_info = signature.key_info().unwrap().borrow();
        assert!(key_info.key_values().is_empty());
        assert_eq!(key_info.x509_datas().len(), 1);
    }
}
