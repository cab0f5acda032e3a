#![forbid(unsafe_code)]

//! Same-document URI references and XPath node selection.
//!
//! Only the forms XML-DSig defines for same-document references are
//! understood:
//! - `""`: the whole document without comments
//! - `#id`: the element with that ID, without comments
//! - `#xpointer(/)`: the whole document with comments
//! - `#xpointer(id('id'))`: the element with that ID, with comments
//!
//! [`select_nodes`] evaluates full XPath 1.0 with uppsala's evaluator.

use sigill_core::Error;
use uppsala::{XPathEvaluator, XPathValue};

use crate::document::{NodeId, XmlDocument};
use crate::nodeset::NodeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameDocumentRef<'a> {
    WholeDocument,
    Id(&'a str),
    XPointerRoot,
    XPointerId(&'a str),
}

/// Parse a Reference URI. Returns `None` for anything that is not a
/// same-document reference.
pub fn parse_same_document_ref(uri: &str) -> Option<SameDocumentRef<'_>> {
    if uri.is_empty() {
        return Some(SameDocumentRef::WholeDocument);
    }
    let fragment = uri.strip_prefix('#')?;
    if fragment == "xpointer(/)" {
        return Some(SameDocumentRef::XPointerRoot);
    }
    if let Some(id) = parse_xpointer_id(fragment) {
        return Some(SameDocumentRef::XPointerId(id));
    }
    if fragment.is_empty() || fragment.starts_with("xpointer(") {
        return None;
    }
    Some(SameDocumentRef::Id(fragment))
}

/// Parse an `xpointer(id('...'))` expression and return the ID value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}

/// Resolve a same-document reference to its node set.
pub fn select(doc: &XmlDocument, reference: SameDocumentRef<'_>) -> Result<NodeSet, Error> {
    Ok(match reference {
        SameDocumentRef::WholeDocument => NodeSet::all_without_comments(doc),
        SameDocumentRef::XPointerRoot => NodeSet::all(doc),
        SameDocumentRef::Id(id) => NodeSet::tree_without_comments(doc.find_by_id(id)?, doc),
        SameDocumentRef::XPointerId(id) => NodeSet::tree_with_comments(doc.find_by_id(id)?, doc),
    })
}

/// Evaluate an XPath expression that must yield a node set, with
/// `namespaces` as the prefix bindings. `id('x')` is resolved against the
/// document's registered ID attributes.
pub fn select_nodes(
    doc: &XmlDocument,
    context: NodeId,
    expression: &str,
    namespaces: &[(String, String)],
) -> Result<Vec<NodeId>, Error> {
    if let Some(id) = parse_id_call(expression.trim()) {
        return Ok(doc.lookup_id(id)?.into_iter().collect());
    }
    let mut evaluator = XPathEvaluator::new();
    for (prefix, uri) in namespaces.iter().filter(|(p, _)| !p.is_empty()) {
        evaluator.add_namespace(prefix.as_str(), uri.as_str());
    }
    match evaluator.evaluate(doc.dom(), context, expression) {
        Ok(XPathValue::NodeSet(nodes)) => Ok(nodes),
        Ok(_) => Err(Error::Transform(format!("XPath is not a node set: {expression}"))),
        Err(e) => Err(Error::Transform(format!("XPath {expression}: {e}"))),
    }
}

fn parse_id_call(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("id(")?.strip_suffix(')')?.trim();
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}
