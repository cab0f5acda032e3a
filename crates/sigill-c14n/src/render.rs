#![forbid(unsafe_code)]

//! Namespace declarations and attributes in canonical order.

use crate::escape;
use sigill_xml::Element;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape::push_attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // The default namespace has an empty name and sorts first.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Namespace URI, "" for none.
    pub ns_uri: String,
    pub local_name: String,
    /// `prefix:local` or `local`, as written.
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    /// The attributes of an element, unsorted.
    pub fn collect(element: &Element) -> Vec<Attr> {
        element
            .attributes
            .iter()
            .map(|a| Attr {
                ns_uri: a.name.namespace_uri.as_deref().unwrap_or_default().to_owned(),
                local_name: a.name.local_name.to_string(),
                qualified_name: a.name.prefixed_name().into_owned(),
                value: a.value.to_string(),
            })
            .collect()
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::push_attr(out, &self.value);
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Unqualified attributes first, by local name; then by (namespace, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(ns: &str, local: &str) -> Attr {
        Attr {
            ns_uri: ns.into(),
            local_name: local.into(),
            qualified_name: local.into(),
            value: String::new(),
        }
    }

    #[test]
    fn test_attribute_order() {
        let mut attrs = vec![attr("urn:b", "a"), attr("", "z"), attr("urn:a", "z"), attr("", "b")];
        attrs.sort();
        let order: Vec<_> = attrs.iter().map(|a| (a.ns_uri.as_str(), a.local_name.as_str())).collect();
        assert_eq!(order, [("", "b"), ("", "z"), ("urn:a", "z"), ("urn:b", "a")]);
    }

    #[test]
    fn test_default_namespace_sorts_first() {
        let mut decls = vec![NsDecl::new("b", "u"), NsDecl::new("", "d"), NsDecl::new("a", "u")];
        decls.sort();
        let mut out = Vec::new();
        for d in &decls {
            d.write(&mut out);
        }
        assert_eq!(out, b" xmlns=\"d\" xmlns:a=\"u\" xmlns:b=\"u\"");
    }
}
