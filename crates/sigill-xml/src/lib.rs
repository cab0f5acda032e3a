#![forbid(unsafe_code)]

//! XML tree support for sigill.
//!
//! [`XmlDocument`] wraps the `uppsala` arena DOM with the pieces the
//! signature engine needs on top: ID attribute registration, validated tree
//! edits and namespace lookups. Prefixes and namespace declarations are kept
//! as written so documents can be canonicalized, extended with signature
//! elements and serialized again. [`NodeSet`] and the same-document URI
//! helpers select the parts of a document a Reference covers.

pub mod document;
pub mod nodeset;
pub mod xpath;

pub use document::{
    qname, Attribute, Element, IdAttribute, NodeId, NodeKind, ProcessingInstruction, QName,
    XmlDocument,
};
pub use nodeset::NodeSet;
