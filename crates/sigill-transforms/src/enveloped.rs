#![forbid(unsafe_code)]

//! Enveloped signature transform and its XPath spelling.
//!
//! Both remove a `<Signature>` subtree from the node set. The
//! enveloped-signature transform removes the signature being processed;
//! the XPath form `not(ancestor-or-self::P:Signature)` removes every
//! signature element, where P is bound to the XML-DSig namespace.

use std::borrow::Cow;

use sigill_core::{algorithm, ns, Error};
use sigill_xml::{NodeId, XmlDocument};

use crate::pipeline::{Transform, TransformData};

/// Removes the `<Signature>` element that contains the reference.
pub struct EnvelopedSignatureTransform {
    signature: NodeId,
}

impl EnvelopedSignatureTransform {
    pub fn new(signature: NodeId) -> Self {
        Self { signature }
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let (doc, mut nodes) = match input {
            TransformData::NodeSet { doc, nodes } => (doc, nodes),
            TransformData::Octets(_) => {
                return Err(Error::Transform(
                    "enveloped-signature transform requires a node set".into(),
                ))
            }
        };
        // The signature node only identifies an element of the borrowed
        // source document.
        if matches!(doc, Cow::Owned(_)) || !doc.is_named(self.signature, ns::DSIG, ns::node::SIGNATURE) {
            return Err(Error::Transform(
                "enveloped-signature transform: signature element is not in the input document".into(),
            ));
        }
        nodes.remove_subtree(self.signature, &doc);
        Ok(TransformData::NodeSet { doc, nodes })
    }
}

/// The XPath filter. Only the enveloped-signature expression is
/// understood; any other expression is rejected when the transform is built.
pub struct XPathTransform {
    expression: String,
}

impl XPathTransform {
    /// Parse `expression`, with `namespaces` the prefix bindings in scope
    /// on the `<XPath>` element.
    pub fn new(expression: &str, namespaces: &[(String, String)]) -> Result<Self, Error> {
        let unsupported =
            || Error::UnsupportedAlgorithm(format!("XPath expression not supported: {expression}"));
        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        let name = compact
            .strip_prefix("not(ancestor-or-self::")
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(unsupported)?;
        let (prefix, local) = name.split_once(':').ok_or_else(unsupported)?;
        let bound = namespaces
            .iter()
            .any(|(p, uri)| p == prefix && uri == ns::DSIG);
        if local != ns::node::SIGNATURE || !bound {
            return Err(unsupported());
        }
        Ok(Self {
            expression: expression.to_owned(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl Transform for XPathTransform {
    fn uri(&self) -> &str {
        algorithm::XPATH
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let (doc, mut nodes) = input.into_node_set()?;
        for sig in signature_elements(&doc) {
            nodes.remove_subtree(sig, &doc);
        }
        Ok(TransformData::NodeSet { doc, nodes })
    }
}

fn signature_elements(doc: &XmlDocument) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|id| doc.is_named(*id, ns::DSIG, ns::node::SIGNATURE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_xml::NodeSet;

    const DOC: &str = r#"<r><a>1</a><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature></r>"#;

    fn ds_binding() -> Vec<(String, String)> {
        vec![("ds".to_owned(), ns::DSIG.to_owned())]
    }

    #[test]
    fn test_enveloped_removes_signature() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let sig = doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE).unwrap();
        let data = TransformData::NodeSet {
            doc: Cow::Borrowed(&doc),
            nodes: NodeSet::all_without_comments(&doc),
        };
        let out = EnvelopedSignatureTransform::new(sig)
            .execute(data)
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(out, b"<r><a>1</a></r>");
    }

    #[test]
    fn test_enveloped_rejects_octets() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let sig = doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE).unwrap();
        let data = TransformData::from_bytes(DOC.as_bytes().to_vec());
        assert!(EnvelopedSignatureTransform::new(sig).execute(data).is_err());
    }

    #[test]
    fn test_xpath_enveloped_pattern() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let xpath = XPathTransform::new(" not(ancestor-or-self::ds:Signature) ", &ds_binding()).unwrap();
        let data = TransformData::NodeSet {
            doc: Cow::Borrowed(&doc),
            nodes: NodeSet::all_without_comments(&doc),
        };
        let out = xpath.execute(data).unwrap().into_bytes().unwrap();
        assert_eq!(out, b"<r><a>1</a></r>");
    }

    #[test]
    fn test_xpath_other_expressions_unsupported() {
        assert!(matches!(
            XPathTransform::new("self::text()", &ds_binding()),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        // Prefix bound to a different namespace.
        let other = vec![("ds".to_owned(), "urn:other".to_owned())];
        assert!(XPathTransform::new("not(ancestor-or-self::ds:Signature)", &other).is_err());
    }
}
