#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for sigill.
//!
//! Implements all six W3C canonicalization variants:
//! - Canonical XML 1.0 (with and without comments)
//! - Canonical XML 1.1 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! Output is produced incrementally by [`C14nReader`]; [`canonicalize`]
//! collects it into a buffer.

pub mod escape;
mod exclusive;
mod inclusive;
pub mod reader;
pub mod render;

use std::borrow::Cow;
use std::io::Read;

pub use reader::C14nReader;
pub use sigill_core::CanonicalizationMethod;
use sigill_core::Error;
use sigill_xml::{NodeSet, XmlDocument};

/// Canonicalize a document, or the part of it selected by `node_set`.
pub fn canonicalize(
    doc: &XmlDocument,
    method: CanonicalizationMethod,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    C14nReader::new(Cow::Borrowed(doc), method, node_set.cloned(), inclusive_prefixes)
        .read_to_end(&mut out)
        .map_err(Error::from_io)?;
    Ok(out)
}

/// Canonicalize the subtree rooted at `node`, without comments unless the
/// method keeps them.
pub fn canonicalize_subtree(
    doc: &XmlDocument,
    node: sigill_xml::NodeId,
    method: CanonicalizationMethod,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let set = NodeSet::tree_with_comments(node, doc);
    canonicalize(doc, method, Some(&set), inclusive_prefixes)
}
