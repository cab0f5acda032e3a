#![forbid(unsafe_code)]

//! Mutable XML document with ID attribute registration, built on the
//! `uppsala` arena DOM.
//!
//! Nodes are addressed by [`NodeId`]. Detaching a node only unlinks it, so
//! ids handed out earlier never dangle. Element and attribute names keep
//! the prefix used in the source text together with the resolved namespace
//! URI, and every element remembers the namespace declarations written on
//! it. Canonicalization relies on both.

use std::borrow::Cow;
use std::collections::BTreeMap;

use sigill_core::{ns, Error};
use uppsala::Document;

pub use uppsala::NodeId;

pub type QName = uppsala::QName<'static>;
pub type Attribute = uppsala::Attribute<'static>;
pub type Element = uppsala::Element<'static>;
pub type NodeKind = uppsala::NodeKind<'static>;
pub type ProcessingInstruction = uppsala::ProcessingInstruction<'static>;

/// Build an owned name. Empty prefix or namespace strings mean "none".
pub fn qname(prefix: Option<&str>, local_name: &str, namespace_uri: Option<&str>) -> QName {
    QName {
        namespace_uri: namespace_uri
            .filter(|u| !u.is_empty())
            .map(|u| Cow::Owned(u.to_owned())),
        prefix: prefix.filter(|p| !p.is_empty()).map(|p| Cow::Owned(p.to_owned())),
        local_name: Cow::Owned(local_name.to_owned()),
    }
}

/// An attribute name that marks an element ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdAttribute {
    /// Matched by the name as written (`Id`, `wsu:Id`).
    Name(String),
    /// Matched by namespace URI and local name, whatever the prefix.
    Namespaced { namespace_uri: String, local_name: String },
}

impl IdAttribute {
    fn matches(&self, attr: &Attribute) -> bool {
        match self {
            IdAttribute::Name(qualified) => attr.name.prefixed_name() == qualified.as_str(),
            IdAttribute::Namespaced {
                namespace_uri,
                local_name,
            } => attr.name.matches(Some(namespace_uri.as_str()), local_name),
        }
    }
}

fn default_id_attributes() -> Vec<IdAttribute> {
    let mut attrs: Vec<IdAttribute> = ["Id", "ID", "id"]
        .iter()
        .map(|n| IdAttribute::Name((*n).to_owned()))
        .collect();
    attrs.push(IdAttribute::Namespaced {
        namespace_uri: ns::XML.to_owned(),
        local_name: "id".to_owned(),
    });
    attrs
}

/// An owned, mutable XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    inner: Document<'static>,
    id_attrs: Vec<IdAttribute>,
    id_by_attribute_name: bool,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// An empty document containing only the document node.
    pub fn new() -> Self {
        Self::from_document(Document::new())
    }

    fn from_document(inner: Document<'static>) -> Self {
        Self {
            inner,
            id_attrs: default_id_attributes(),
            id_by_attribute_name: true,
        }
    }

    /// Parse XML text into a document.
    ///
    /// Line endings are normalized to `\n`, and tabs and newlines written
    /// literally inside attribute values become spaces, as an XML processor
    /// must. Character references are untouched by either step. CDATA
    /// sections are merged into the surrounding text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let source = normalize_source(text)?;
        let parsed = uppsala::parse(&source).map_err(|e| Error::XmlParse(e.to_string()))?;
        let mut doc = Self::from_document(parsed.into_static());
        if doc.document_element().is_none() {
            return Err(Error::XmlParse("document has no root element".into()));
        }
        doc.coalesce_text();
        Ok(doc)
    }

    /// Parse XML from UTF-8 bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data).map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Turn CDATA sections into text and merge adjacent text siblings.
    fn coalesce_text(&mut self) {
        for id in self.inner.descendants(self.inner.root()) {
            if let Some(kind) = self.inner.node_kind_mut(id) {
                if let NodeKind::CData(text) = kind {
                    let text = std::mem::take(text);
                    *kind = NodeKind::Text(text);
                }
            }
        }
        for id in self.inner.descendants(self.inner.root()) {
            let Some(prev) = self.inner.previous_sibling(id) else {
                continue;
            };
            let tail = match (self.inner.node_kind(prev), self.inner.node_kind(id)) {
                (Some(NodeKind::Text(_)), Some(NodeKind::Text(tail))) => tail.to_string(),
                _ => continue,
            };
            if let Some(NodeKind::Text(head)) = self.inner.node_kind_mut(prev) {
                head.to_mut().push_str(&tail);
            }
            self.inner.detach(id);
        }
    }

    /// The underlying DOM, for XPath evaluation.
    pub(crate) fn dom(&self) -> &Document<'static> {
        &self.inner
    }

    fn check(&self, id: NodeId) -> Result<(), Error> {
        match self.inner.node_kind(id) {
            Some(NodeKind::Attribute(..)) | None => {
                Err(Error::Other(format!("node {} does not exist", id.index())))
            }
            Some(_) => Ok(()),
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    pub fn root(&self) -> NodeId {
        self.inner.root()
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.inner.document_element()
    }

    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.inner.node_kind(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.inner.element(id)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.inner.element_mut(id)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_comment(&self, id: NodeId) -> bool {
        matches!(self.node_kind(id), Some(NodeKind::Comment(_)))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.parent(id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.children(id)
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inner
            .children_iter(id)
            .filter(move |c| self.is_element(*c))
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.descendants(id)
    }

    /// Whether `id` is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_or_self(self.root(), id)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Whether the element is named `{ns}local_name`; `""` is no namespace.
    pub fn is_named(&self, id: NodeId, ns: &str, local_name: &str) -> bool {
        let ns = Some(ns).filter(|n| !n.is_empty());
        self.element(id).is_some_and(|e| e.name.matches(ns, local_name))
    }

    pub fn find_child_element(&self, parent: NodeId, ns: &str, local_name: &str) -> Option<NodeId> {
        self.element_children(parent)
            .find(|c| self.is_named(*c, ns, local_name))
    }

    pub fn find_child_elements(&self, parent: NodeId, ns: &str, local_name: &str) -> Vec<NodeId> {
        self.element_children(parent)
            .filter(|c| self.is_named(*c, ns, local_name))
            .collect()
    }

    /// First element named `{ns}local_name` at or below `from`, in document order.
    pub fn find_element(&self, from: NodeId, ns: &str, local_name: &str) -> Option<NodeId> {
        if self.is_named(from, ns, local_name) {
            return Some(from);
        }
        self.descendants(from)
            .into_iter()
            .find(|n| self.is_named(*n, ns, local_name))
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).next()
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.inner.next_sibling(id);
        while let Some(n) = current {
            if self.is_element(n) {
                return Some(n);
            }
            current = self.inner.next_sibling(n);
        }
        None
    }

    /// Attribute value by qualified name as written (`Id`, `xml:id`, `wsu:Id`).
    pub fn attribute(&self, id: NodeId, qualified: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|a| a.name.prefixed_name() == qualified)
            .map(|a| &*a.value)
    }

    /// Concatenated text of `id` and all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.inner.text_content_deep(id)
    }

    // ── Namespaces ───────────────────────────────────────────────────

    /// Resolve `prefix` (`""` for the default namespace) in the scope of `id`.
    pub fn lookup_namespace_uri(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(ns::XML);
        }
        let mut current = Some(id);
        while let Some(n) = current {
            if let Some(e) = self.element(n) {
                if let Some((_, uri)) = e.namespace_declarations.iter().find(|(p, _)| p == prefix) {
                    return Some(&**uri).filter(|u| !u.is_empty());
                }
            }
            current = self.parent(n);
        }
        None
    }

    /// All namespace bindings in scope at `id`, keyed by prefix. The `xml`
    /// prefix and undeclared defaults are omitted.
    pub fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            chain.push(n);
            current = self.parent(n);
        }
        let mut map = BTreeMap::new();
        for n in chain.into_iter().rev() {
            if let Some(e) = self.element(n) {
                for (p, uri) in &e.namespace_declarations {
                    if uri.is_empty() {
                        map.remove(&**p);
                    } else if p != "xml" {
                        map.insert(p.to_string(), uri.to_string());
                    }
                }
            }
        }
        map
    }

    /// Add or replace a namespace declaration on an element.
    pub fn declare_namespace(&mut self, id: NodeId, prefix: &str, uri: &str) -> Result<(), Error> {
        let prefix = Some(prefix).filter(|p| !p.is_empty());
        if self.inner.declare_namespace(id, prefix, uri.to_owned()) {
            Ok(())
        } else {
            Err(Error::Other("namespace declarations need an element".into()))
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Create a detached element.
    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.inner.create_element(name)
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.inner.create_text(text.to_owned())
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.inner.create_comment(text.to_owned())
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.check_link(parent, child)?;
        self.inner.append_child(parent, child);
        Ok(())
    }

    /// Insert a detached node immediately before `before`, a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) -> Result<(), Error> {
        self.check_link(parent, child)?;
        if self.parent(before) != Some(parent) {
            return Err(Error::Other("insertion point is not a child of the parent".into()));
        }
        self.inner.insert_before(parent, child, before);
        Ok(())
    }

    /// uppsala ignores invalid links silently; surface them as errors.
    fn check_link(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        self.check(parent)?;
        self.check(child)?;
        if self.parent(child).is_some() {
            return Err(Error::Other("node is already attached".into()));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(Error::Other("cannot attach a node below itself".into()));
        }
        match (self.node_kind(parent), self.node_kind(child)) {
            (_, Some(NodeKind::Document)) => {
                Err(Error::Other("the document node cannot be a child".into()))
            }
            (Some(NodeKind::Element(_)), _) => Ok(()),
            (Some(NodeKind::Document), Some(NodeKind::Element(_))) => {
                if self.document_element().is_some() {
                    Err(Error::Other("document already has a root element".into()))
                } else {
                    Ok(())
                }
            }
            (Some(NodeKind::Document), Some(NodeKind::Comment(_)))
            | (Some(NodeKind::Document), Some(NodeKind::ProcessingInstruction(_))) => Ok(()),
            _ => Err(Error::Other("node cannot have children of this kind".into())),
        }
    }

    /// Unlink a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) -> Result<(), Error> {
        self.check(id)?;
        self.inner.detach(id);
        Ok(())
    }

    /// Set an attribute, replacing an existing one with the same expanded name.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: &str) -> Result<(), Error> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| Error::Other("attributes need an element".into()))?;
        let value = Cow::Owned(value.to_owned());
        match element.attributes.iter_mut().find(|a| {
            a.name.local_name == name.local_name && a.name.namespace_uri == name.namespace_uri
        }) {
            Some(a) => {
                a.name = name;
                a.value = value;
            }
            None => element.attributes.push(Attribute { name, value }),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, qualified: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.retain(|a| a.name.prefixed_name() != qualified);
        }
    }

    /// Replace the children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        if !self.is_element(id) {
            return Err(Error::Other("text can only be set on elements".into()));
        }
        for child in self.children(id) {
            self.inner.detach(child);
        }
        let t = self.create_text(text);
        self.inner.append_child(id, t);
        Ok(())
    }

    /// Replace the contents of a text node.
    pub fn set_text_node(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        match self.inner.node_kind_mut(id) {
            Some(NodeKind::Text(t)) => {
                *t = Cow::Owned(text.to_owned());
                Ok(())
            }
            _ => Err(Error::Other("not a text node".into())),
        }
    }

    // ── ID attributes ────────────────────────────────────────────────

    /// Treat attributes with this qualified name as IDs (`Id`, `ID` and
    /// `id` are registered by default).
    pub fn register_id_attribute(&mut self, qualified: &str) {
        self.add_id_attribute(IdAttribute::Name(qualified.to_owned()));
    }

    /// Treat `{namespace_uri}local_name` attributes as IDs under any prefix.
    /// `xml:id` is registered by default.
    pub fn register_id_attribute_ns(&mut self, namespace_uri: &str, local_name: &str) {
        self.add_id_attribute(IdAttribute::Namespaced {
            namespace_uri: namespace_uri.to_owned(),
            local_name: local_name.to_owned(),
        });
    }

    fn add_id_attribute(&mut self, attr: IdAttribute) {
        if !self.id_attrs.contains(&attr) {
            self.id_attrs.push(attr);
        }
    }

    /// Stop treating an attribute name as an ID. Returns whether it was registered.
    pub fn deregister_id_attribute(&mut self, qualified: &str) -> bool {
        self.remove_id_attribute(&IdAttribute::Name(qualified.to_owned()))
    }

    pub fn deregister_id_attribute_ns(&mut self, namespace_uri: &str, local_name: &str) -> bool {
        self.remove_id_attribute(&IdAttribute::Namespaced {
            namespace_uri: namespace_uri.to_owned(),
            local_name: local_name.to_owned(),
        })
    }

    fn remove_id_attribute(&mut self, attr: &IdAttribute) -> bool {
        let before = self.id_attrs.len();
        self.id_attrs.retain(|a| a != attr);
        before != self.id_attrs.len()
    }

    /// Enable or disable ID matching by plain attribute name. Namespaced
    /// registrations (including `xml:id`) stay active either way.
    pub fn set_id_by_attribute_name(&mut self, enabled: bool) {
        self.id_by_attribute_name = enabled;
    }

    pub fn id_by_attribute_name(&self) -> bool {
        self.id_by_attribute_name
    }

    pub fn id_attributes(&self) -> &[IdAttribute] {
        &self.id_attrs
    }

    fn is_id_attribute(&self, attr: &Attribute) -> bool {
        self.id_attrs.iter().any(|id| {
            (self.id_by_attribute_name || matches!(id, IdAttribute::Namespaced { .. })) && id.matches(attr)
        })
    }

    /// Find the element carrying ID `value`.
    ///
    /// Two elements claiming the same ID make the lookup fail instead of
    /// silently picking one, since either could be the signed content.
    pub fn find_by_id(&self, value: &str) -> Result<NodeId, Error> {
        self.lookup_id(value)?
            .ok_or_else(|| Error::InvalidUri(format!("ID not found: {value}")))
    }

    /// Like [`find_by_id`](Self::find_by_id), but a missing ID is `None`.
    pub fn lookup_id(&self, value: &str) -> Result<Option<NodeId>, Error> {
        let mut found = None;
        for n in self.descendants(self.root()) {
            let Some(element) = self.element(n) else {
                continue;
            };
            if element
                .attributes
                .iter()
                .any(|a| a.value == value && self.is_id_attribute(a))
            {
                if found.is_some() {
                    return Err(Error::InvalidUri(format!("duplicate ID: {value}")));
                }
                found = Some(n);
            }
        }
        Ok(found)
    }

    /// Serialize the whole document.
    pub fn to_xml(&self) -> Result<String, Error> {
        let mut out = Vec::new();
        self.inner
            .write_to(&mut out)
            .map_err(|e| Error::XmlWrite(e.to_string()))?;
        String::from_utf8(out).map_err(|e| Error::XmlWrite(e.to_string()))
    }
}

// ── Source normalization ─────────────────────────────────────────────

/// End-of-line handling plus attribute-value whitespace normalization on
/// literal characters, applied before the parser expands references.
fn normalize_source(text: &str) -> Result<Cow<'_, str>, Error> {
    let text = if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    };
    let hits = attribute_whitespace(&text);
    if hits.is_empty() {
        return Ok(text);
    }
    let mut bytes = text.into_owned().into_bytes();
    for i in hits {
        bytes[i] = b' ';
    }
    String::from_utf8(bytes)
        .map(Cow::Owned)
        .map_err(|e| Error::XmlParse(e.to_string()))
}

/// Byte offsets of tabs and newlines inside quoted values of tags.
fn attribute_whitespace(s: &str) -> Vec<usize> {
    let b = s.as_bytes();
    let mut hits = Vec::new();
    let mut i = 0;
    while i < b.len() {
        if b[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &s[i..];
        if rest.starts_with("<!--") {
            i = skip_past(s, i, "-->");
        } else if rest.starts_with("<![CDATA[") {
            i = skip_past(s, i, "]]>");
        } else if rest.starts_with("<?") {
            i = skip_past(s, i, "?>");
        } else if rest.starts_with("<!") {
            i = skip_declaration(s, i);
        } else {
            i += 1;
            let mut quote = None;
            while i < b.len() {
                match (quote, b[i]) {
                    (None, b'>') => break,
                    (None, q @ (b'"' | b'\'')) => quote = Some(q),
                    (Some(q), c) if c == q => quote = None,
                    (Some(_), b'\t' | b'\n') => hits.push(i),
                    _ => {}
                }
                i += 1;
            }
        }
    }
    hits
}

fn skip_past(s: &str, from: usize, end: &str) -> usize {
    s[from..].find(end).map_or(s.len(), |p| from + p + end.len())
}

/// Skip a `<!DOCTYPE ...>` including any internal subset.
fn skip_declaration(s: &str, from: usize) -> usize {
    let b = s.as_bytes();
    let mut i = from + 2;
    let mut depth = 0usize;
    let mut quote = None;
    while i < b.len() {
        match (quote, b[i]) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'<') if s[i..].starts_with("<!--") => {
                i = skip_past(s, i, "-->");
                continue;
            }
            (None, q @ (b'"' | b'\'')) => quote = Some(q),
            (None, b'[') => depth += 1,
            (None, b']') => depth = depth.saturating_sub(1),
            (None, b'>') if depth == 0 => return i + 1,
            _ => {}
        }
        i += 1;
    }
    b.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<!-- lead -->
<root xmlns="urn:a" xmlns:b="urn:b" Id="r">
  <b:child attr="x&amp;y" b:q="1">text &lt;here&gt;<![CDATA[ & more]]></b:child>
  <plain xmlns="">inner</plain>
</root>"#;

    #[test]
    fn test_parse_names_and_namespaces() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let root = doc.document_element().unwrap();
        assert!(doc.is_named(root, "urn:a", "root"));
        let child = doc.find_child_element(root, "urn:b", "child").unwrap();
        let e = doc.element(child).unwrap();
        assert_eq!(e.name.prefix.as_deref(), Some("b"));
        assert_eq!(doc.attribute(child, "attr"), Some("x&y"));
        assert_eq!(doc.attribute(child, "b:q"), Some("1"));
        assert_eq!(doc.text_content(child), "text <here> & more");
        assert_eq!(doc.children(child).len(), 1);
        let plain = doc.find_child_element(root, "", "plain").unwrap();
        assert_eq!(doc.element(plain).unwrap().name.namespace_uri, None);
        assert_eq!(doc.lookup_namespace_uri(plain, ""), None);
        assert_eq!(doc.lookup_namespace_uri(plain, "b"), Some("urn:b"));
    }

    #[test]
    fn test_document_level_comment_kept() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let first = doc.children(doc.root())[0];
        assert!(doc.is_comment(first));
    }

    #[test]
    fn test_unbound_prefix_is_rejected() {
        assert!(matches!(
            XmlDocument::parse("<a:root/>"),
            Err(Error::XmlParse(_))
        ));
        assert!(XmlDocument::parse("<root>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn test_attribute_whitespace_normalized() {
        let doc = XmlDocument::parse("<r a=\"x\ny&#xA;z\" b='\t1'><!-- a=\"\n\" -->t\r\nu</r>").unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(doc.attribute(root, "a"), Some("x y\nz"));
        assert_eq!(doc.attribute(root, "b"), Some(" 1"));
        assert_eq!(doc.text_content(root), "t\nu");
    }

    #[test]
    fn test_find_by_id_and_registration() {
        let mut doc =
            XmlDocument::parse(r#"<r xmlns:w="urn:w"><a Id="one"/><b w:Id="two"/></r>"#).unwrap();
        assert!(doc.find_by_id("one").is_ok());
        assert!(doc.find_by_id("two").is_err());
        doc.register_id_attribute("w:Id");
        assert!(doc.find_by_id("two").is_ok());
        assert!(doc.deregister_id_attribute("w:Id"));
        assert!(doc.find_by_id("two").is_err());
    }

    #[test]
    fn test_namespaced_id_ignores_prefix() {
        let mut doc = XmlDocument::parse(
            r#"<r xmlns:p="urn:w" xmlns:q="urn:w"><a p:Id="one"/><b q:Id="two" Id="plain"/><c xml:id="three"/></r>"#,
        )
        .unwrap();
        doc.register_id_attribute_ns("urn:w", "Id");
        assert!(doc.find_by_id("one").is_ok());
        assert!(doc.find_by_id("two").is_ok());
        assert!(doc.find_by_id("three").is_ok());

        doc.set_id_by_attribute_name(false);
        assert!(doc.find_by_id("plain").is_err());
        assert!(doc.find_by_id("one").is_ok());
        assert!(doc.find_by_id("three").is_ok());

        assert!(doc.deregister_id_attribute_ns("urn:w", "Id"));
        assert!(doc.find_by_id("one").is_err());
    }

    #[test]
    fn test_duplicate_ids_fail() {
        let doc = XmlDocument::parse(r#"<r><a Id="x"/><b Id="x"/></r>"#).unwrap();
        assert!(matches!(doc.find_by_id("x"), Err(Error::InvalidUri(_))));
    }

    #[test]
    fn test_mutation() {
        let mut doc = XmlDocument::parse("<r><a/><c/></r>").unwrap();
        let root = doc.document_element().unwrap();
        let c = doc.find_child_element(root, "", "c").unwrap();
        let b = doc.create_element(QName::local("b"));
        doc.insert_before(root, b, c).unwrap();
        doc.set_text(b, "hi").unwrap();
        doc.set_attribute(b, QName::local("k"), "v").unwrap();
        assert_eq!(doc.next_element_sibling(b), Some(c));
        assert!(doc.append_child(root, b).is_err());
        let comment = doc.create_comment("x");
        assert!(doc.insert_before(root, comment, root).is_err());
        doc.detach(c).unwrap();
        assert!(!doc.is_attached(c));
        assert_eq!(doc.to_xml().unwrap(), r#"<r><a/><b k="v">hi</b></r>"#);
    }

    #[test]
    fn test_qname_builder_drops_empty_parts() {
        let name = qname(Some(""), "Signature", Some(ns::DSIG));
        assert_eq!(name.prefix, None);
        assert!(name.matches(Some(ns::DSIG), "Signature"));
        assert_eq!(qname(Some("ds"), "KeyInfo", Some(ns::DSIG)).prefixed_name(), "ds:KeyInfo");
    }
}
