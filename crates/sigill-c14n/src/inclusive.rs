#![forbid(unsafe_code)]

//! Namespace and `xml:*` attribute rules of Canonical XML 1.0 and 1.1.
//!
//! Every in-scope namespace of an output element is rendered unless the
//! nearest output ancestor already rendered the same binding. When a
//! document subset is canonicalized, `xml:*` attributes of omitted
//! ancestors are pulled down onto the first output element.

use std::collections::BTreeMap;

use sigill_core::ns;
use sigill_xml::{NodeId, XmlDocument};

use crate::render::{Attr, NsDecl};

/// Declarations to render on `id`, plus the bindings its children inherit.
pub(crate) fn namespace_axis(
    doc: &XmlDocument,
    id: NodeId,
    inherited: &BTreeMap<String, String>,
) -> (Vec<NsDecl>, BTreeMap<String, String>) {
    let in_scope = doc.in_scope_namespaces(id);
    let mut decls: Vec<NsDecl> = in_scope
        .iter()
        .filter(|(prefix, uri)| inherited.get(*prefix) != Some(*uri))
        .map(|(prefix, uri)| NsDecl::new(prefix, uri))
        .collect();

    // The output parent had a default namespace this element does not.
    if !in_scope.contains_key("") && inherited.get("").is_some_and(|u| !u.is_empty()) {
        decls.push(NsDecl::new("", ""));
    }
    decls.sort();
    (decls, in_scope)
}

/// `xml:*` attributes inherited from ancestors, for an element whose
/// parent is not part of the output. The nearest ancestor wins and the
/// element's own attributes take precedence.
///
/// Canonical XML 1.1 only inherits `xml:lang` and `xml:space`; `xml:id` is
/// not inheritable there and `xml:base` is left out rather than joined.
pub(crate) fn inherited_xml_attrs(
    doc: &XmlDocument,
    id: NodeId,
    existing: &[Attr],
    version_11: bool,
) -> Vec<Attr> {
    let mut inherited: BTreeMap<String, String> = BTreeMap::new();
    let mut current = doc.parent(id);
    while let Some(ancestor) = current {
        if let Some(element) = doc.element(ancestor) {
            for attr in &element.attributes {
                if attr.name.namespace_uri.as_deref() != Some(ns::XML) {
                    continue;
                }
                let name = &*attr.name.local_name;
                if version_11 && !matches!(name, "lang" | "space") {
                    continue;
                }
                inherited
                    .entry(name.to_owned())
                    .or_insert_with(|| attr.value.to_string());
            }
        }
        current = doc.parent(ancestor);
    }

    inherited
        .into_iter()
        .filter(|(name, _)| {
            !existing
                .iter()
                .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
        })
        .map(|(name, value)| Attr {
            ns_uri: ns::XML.to_owned(),
            qualified_name: format!("xml:{name}"),
            local_name: name,
            value,
        })
        .collect()
}
