#![forbid(unsafe_code)]

//! Element construction for signatures built or extended in place.

use sigill_core::{ns, Error};
use sigill_xml::{qname, NodeId, QName, XmlDocument};

/// Creates DSig-namespace elements with one prefix and one layout policy.
#[derive(Debug, Clone)]
pub(crate) struct Template {
    prefix: Option<String>,
    pretty: bool,
}

impl Template {
    pub(crate) fn new(prefix: Option<&str>, pretty: bool) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
            pretty,
        }
    }

    pub(crate) fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// A detached `<prefix:local>` element.
    pub(crate) fn element(&self, doc: &mut XmlDocument, local: &str) -> NodeId {
        doc.create_element(qname(self.prefix.as_deref(), local, Some(ns::DSIG)))
    }

    /// Append `child` to `parent`, surrounding it with line breaks when
    /// pretty printing.
    pub(crate) fn append(&self, doc: &mut XmlDocument, parent: NodeId, child: NodeId) -> Result<(), Error> {
        if self.pretty && doc.children(parent).is_empty() {
            self.newline(doc, parent)?;
        }
        doc.append_child(parent, child)?;
        if self.pretty {
            self.newline(doc, parent)?;
        }
        Ok(())
    }

    /// Insert `child` before `before`, followed by a line break when pretty
    /// printing.
    pub(crate) fn insert_before(
        &self,
        doc: &mut XmlDocument,
        parent: NodeId,
        child: NodeId,
        before: NodeId,
    ) -> Result<(), Error> {
        doc.insert_before(parent, child, before)?;
        if self.pretty {
            let nl = doc.create_text("\n");
            doc.insert_before(parent, nl, before)?;
        }
        Ok(())
    }

    /// Create and append `<prefix:local>`.
    pub(crate) fn child(&self, doc: &mut XmlDocument, parent: NodeId, local: &str) -> Result<NodeId, Error> {
        let node = self.element(doc, local);
        self.append(doc, parent, node)?;
        Ok(node)
    }

    /// Create and append `<prefix:local Algorithm="uri"/>`.
    pub(crate) fn algorithm_child(
        &self,
        doc: &mut XmlDocument,
        parent: NodeId,
        local: &str,
        uri: &str,
    ) -> Result<NodeId, Error> {
        let node = self.child(doc, parent, local)?;
        doc.set_attribute(node, QName::local(ns::attr::ALGORITHM), uri)?;
        Ok(node)
    }

    fn newline(&self, doc: &mut XmlDocument, parent: NodeId) -> Result<(), Error> {
        let nl = doc.create_text("\n");
        doc.append_child(parent, nl)
    }
}

/// Detach `node` together with the line break that follows it.
pub(crate) fn remove_with_trailing_newline(doc: &mut XmlDocument, node: NodeId) -> Result<(), Error> {
    if let Some(parent) = doc.parent(node) {
        let siblings = doc.children(parent);
        let next = siblings
            .iter()
            .position(|c| *c == node)
            .and_then(|i| siblings.get(i + 1).copied());
        if let Some(next) = next {
            if matches!(doc.node_kind(next), Some(sigill_xml::NodeKind::Text(t)) if t.trim().is_empty()) {
                doc.detach(next)?;
            }
        }
    }
    doc.detach(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_layout() {
        let mut doc = XmlDocument::parse(r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>"#)
            .unwrap();
        let sig = doc.document_element().unwrap();
        let t = Template::new(Some("ds"), true);
        t.algorithm_child(&mut doc, sig, "SignatureMethod", "urn:m").unwrap();
        t.child(&mut doc, sig, "SignatureValue").unwrap();
        assert_eq!(
            doc.to_xml().unwrap(),
            "<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">\n\
             <ds:SignatureMethod Algorithm=\"urn:m\"/>\n\
             <ds:SignatureValue/>\n</ds:Signature>"
        );
    }

    #[test]
    fn test_remove_takes_newline() {
        let mut doc = XmlDocument::parse("<r><a/>\n<b/>\n</r>").unwrap();
        let r = doc.document_element().unwrap();
        let a = doc.first_element_child(r).unwrap();
        remove_with_trailing_newline(&mut doc, a).unwrap();
        assert_eq!(doc.to_xml().unwrap(), "<r><b/>\n</r>");
    }
}
