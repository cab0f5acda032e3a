#![forbid(unsafe_code)]

//! Namespace rules of Exclusive Canonical XML 1.0.
//!
//! Only "visibly utilized" namespace declarations are output. A prefix is
//! visibly utilized if:
//! 1. it is the prefix of the element's name (the default namespace for an
//!    unprefixed element), or
//! 2. it is the prefix of one of the element's attributes, or
//! 3. it appears in the InclusiveNamespaces PrefixList (`#default` names
//!    the default namespace).

use std::collections::{BTreeMap, HashSet};

use sigill_xml::{NodeId, XmlDocument};

use crate::render::NsDecl;

/// Declarations to render on `id`, plus what is rendered for its children.
pub(crate) fn namespace_axis(
    doc: &XmlDocument,
    id: NodeId,
    rendered: &BTreeMap<String, String>,
    inclusive_prefixes: &HashSet<String>,
) -> (Vec<NsDecl>, BTreeMap<String, String>) {
    let mut utilized: HashSet<String> = HashSet::new();
    if let Some(element) = doc.element(id) {
        utilized.insert(element.name.prefix.as_deref().unwrap_or_default().to_owned());
        for attr in &element.attributes {
            if let Some(prefix) = &attr.name.prefix {
                utilized.insert(prefix.to_string());
            }
        }
    }
    for p in inclusive_prefixes {
        if p == "#default" {
            utilized.insert(String::new());
        } else {
            utilized.insert(p.clone());
        }
    }

    let in_scope = doc.in_scope_namespaces(id);
    let mut decls = Vec::new();
    for prefix in utilized.iter().filter(|p| p.as_str() != "xml") {
        match in_scope.get(prefix) {
            Some(uri) if rendered.get(prefix) != Some(uri) => {
                decls.push(NsDecl::new(prefix, uri));
            }
            None if prefix.is_empty() && rendered.get("").is_some_and(|u| !u.is_empty()) => {
                decls.push(NsDecl::new("", ""));
            }
            _ => {}
        }
    }
    decls.sort();

    let mut next = rendered.clone();
    for d in &decls {
        next.insert(d.prefix.clone(), d.uri.clone());
    }
    (decls, next)
}
