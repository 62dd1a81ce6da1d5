#![forbid(unsafe_code)]

//! Typed XML objects.
//!
//! Every node of a SAML or XML-DSig document is a typed object bound to
//! an element name. Builders, marshallers and unmarshallers are looked up
//! by qname in an [`XmlObjectProviderRegistry`]. Marshalled DOM is cached
//! on each node and dropped, up to the root, whenever the node or any of
//! its descendants changes.

pub mod base;
pub mod builder;
pub mod collections;
pub mod context;
#[macro_use]
mod macros;
pub mod marshall;
pub mod object;
pub mod registry;
pub mod schema;
pub mod unmarshall;

pub use base::{NodeState, XmlChild, XmlObjectBase};
pub use builder::{TypedBuilder, XmlObjectBuilder};
pub use collections::{
    IndexedSubList, IndexedXmlObjectChildrenList, OrderedXmlObjectSet, XmlObjectChildrenList,
};
pub use context::ContextMap;
pub use marshall::{create_element, Marshaller, XmlObjectMarshaller};
pub use object::{SignableXmlObject, XmlHandle, XmlObject, XmlObjectRef, XmlObjectType};
pub use registry::{ObjectProvider, XmlObjectProviderRegistry};
pub use schema::{XsAny, XsString};
pub use unmarshall::{build_for, Unmarshaller, UnmarshallingContext, UnmarshallingPolicy, XmlObjectUnmarshaller};

#[doc(hidden)]
pub mod __private {
    pub use samling_core::{QName, Result};
    pub use samling_xml::Element;
}
