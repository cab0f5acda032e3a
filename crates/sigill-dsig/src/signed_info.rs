#![forbid(unsafe_code)]

//! `<SignedInfo>`: the canonicalization and signature methods plus the
//! references the signature value covers.

use std::borrow::Cow;
use std::io::Read;

use sigill_c14n::C14nReader;
use sigill_core::uri::classify_canonicalization;
use sigill_core::{ns, CanonicalizationMethod, Error};
use sigill_xml::{NodeId, NodeSet, XmlDocument};

use crate::reference::{read_inclusive_prefixes, required_algorithm, Reference, ReferenceList};
use crate::template::Template;

#[derive(Debug, Clone)]
pub struct SignedInfo {
    pub node: NodeId,
    /// `CanonicalizationMethod/@Algorithm`.
    pub c14n_method: String,
    pub inclusive_prefixes: Vec<String>,
    /// `SignatureMethod/@Algorithm`.
    pub signature_method: String,
    pub signature_method_node: NodeId,
    /// `SignatureMethod/HMACOutputLength`, in bits.
    pub hmac_output_length: Option<u32>,
    pub references: ReferenceList,
}

fn expected(element: &str) -> Error {
    Error::Structure(format!("expected <{element}> in <{}>", ns::node::SIGNED_INFO))
}

fn read_hmac_output_length(doc: &XmlDocument, method: NodeId) -> Result<Option<u32>, Error> {
    let Some(node) = doc.find_child_element(method, ns::DSIG, ns::node::HMAC_OUTPUT_LENGTH) else {
        return Ok(None);
    };
    let text = doc.text_content(node);
    text.trim()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| Error::Structure(format!("HMACOutputLength is not a number: {:?}", text.trim())))
}

impl SignedInfo {
    /// Read `CanonicalizationMethod`, `SignatureMethod`, then zero or more
    /// `Reference` elements. Anything else is a structure error.
    pub fn load(doc: &XmlDocument, node: NodeId) -> Result<Self, Error> {
        let c14n_node = doc
            .first_element_child(node)
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::CANONICALIZATION_METHOD))
            .ok_or_else(|| expected(ns::node::CANONICALIZATION_METHOD))?;
        let c14n_method = required_algorithm(doc, c14n_node, ns::node::CANONICALIZATION_METHOD)?;
        let inclusive_prefixes = read_inclusive_prefixes(doc, c14n_node);

        let signature_method_node = doc
            .next_element_sibling(c14n_node)
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::SIGNATURE_METHOD))
            .ok_or_else(|| expected(ns::node::SIGNATURE_METHOD))?;
        let signature_method = required_algorithm(doc, signature_method_node, ns::node::SIGNATURE_METHOD)?;
        let hmac_output_length = read_hmac_output_length(doc, signature_method_node)?;

        let mut references = ReferenceList::new(node);
        let mut next = doc.next_element_sibling(signature_method_node);
        while let Some(child) = next {
            if !doc.is_named(child, ns::DSIG, ns::node::REFERENCE) {
                return Err(expected(ns::node::REFERENCE));
            }
            references.references.push(Reference::load(doc, child)?);
            next = doc.next_element_sibling(child);
        }

        Ok(Self {
            node,
            c14n_method,
            inclusive_prefixes,
            signature_method,
            signature_method_node,
            hmac_output_length,
            references,
        })
    }

    /// Build an empty `<SignedInfo>` under `signature`.
    pub(crate) fn create(
        doc: &mut XmlDocument,
        template: &Template,
        signature: NodeId,
        c14n_uri: &str,
        signature_uri: &str,
    ) -> Result<Self, Error> {
        let node = template.child(doc, signature, ns::node::SIGNED_INFO)?;
        template.algorithm_child(doc, node, ns::node::CANONICALIZATION_METHOD, c14n_uri)?;
        let signature_method_node =
            template.algorithm_child(doc, node, ns::node::SIGNATURE_METHOD, signature_uri)?;
        Ok(Self {
            node,
            c14n_method: c14n_uri.to_owned(),
            inclusive_prefixes: Vec::new(),
            signature_method: signature_uri.to_owned(),
            signature_method_node,
            hmac_output_length: None,
            references: ReferenceList::new(node),
        })
    }

    pub fn canonicalization(&self) -> Result<CanonicalizationMethod, Error> {
        classify_canonicalization(&self.c14n_method)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization: {}", self.c14n_method)))
    }

    /// Stream the canonical form of `<SignedInfo>`.
    pub fn canonical_reader<'d>(&self, doc: &'d XmlDocument) -> Result<Box<dyn Read + 'd>, Error> {
        let method = self.canonicalization()?;
        let nodes = NodeSet::tree_with_comments(self.node, doc);
        Ok(Box::new(C14nReader::new(
            Cow::Borrowed(doc),
            method,
            Some(nodes),
            &self.inclusive_prefixes,
        )))
    }

    pub fn canonical_bytes(&self, doc: &XmlDocument) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.canonical_reader(doc)?
            .read_to_end(&mut out)
            .map_err(Error::from_io)?;
        Ok(out)
    }

    /// Write `<HMACOutputLength>` under `<SignatureMethod>`.
    pub(crate) fn set_hmac_output_length(
        &mut self,
        doc: &mut XmlDocument,
        template: &Template,
        bits: u32,
    ) -> Result<(), Error> {
        let method = self.signature_method_node;
        let node = match doc.find_child_element(method, ns::DSIG, ns::node::HMAC_OUTPUT_LENGTH) {
            Some(n) => n,
            None => template.child(doc, method, ns::node::HMAC_OUTPUT_LENGTH)?,
        };
        doc.set_text(node, &bits.to_string())?;
        self.hmac_output_length = Some(bits);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::algorithm;

    fn load(xml: &str) -> Result<SignedInfo, Error> {
        let doc = XmlDocument::parse(xml).unwrap();
        SignedInfo::load(&doc, doc.document_element().unwrap())
    }

    #[test]
    fn test_load_minimal() {
        let si = load(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"><ec:InclusiveNamespaces xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#" PrefixList="soap"/></CanonicalizationMethod><SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#hmac-sha1"><HMACOutputLength>128</HMACOutputLength></SignatureMethod></SignedInfo>"#,
        )
        .unwrap();
        assert_eq!(si.c14n_method, algorithm::EXC_C14N);
        assert_eq!(si.inclusive_prefixes, vec!["soap"]);
        assert_eq!(si.hmac_output_length, Some(128));
        assert!(si.references.is_empty());
    }

    #[test]
    fn test_out_of_order_children() {
        let err = load(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><SignatureMethod Algorithm="x"/><CanonicalizationMethod Algorithm="y"/></SignedInfo>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Structure(msg) if msg.contains("CanonicalizationMethod")));

        let err = load(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><CanonicalizationMethod Algorithm="y"/><SignatureMethod Algorithm="x"/><Object/></SignedInfo>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Structure(msg) if msg.contains("Reference")));
    }

    #[test]
    fn test_bad_hmac_length() {
        let err = load(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><CanonicalizationMethod Algorithm="y"/><SignatureMethod Algorithm="x"><HMACOutputLength>lots</HMACOutputLength></SignatureMethod></SignedInfo>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
    }

    #[test]
    fn test_canonical_form_drops_comments() {
        let doc = XmlDocument::parse(
            r#"<r xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><!-- note --><ds:CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/><ds:SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#hmac-sha1"/></ds:SignedInfo></r>"#,
        )
        .unwrap();
        let node = doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNED_INFO).unwrap();
        let si = SignedInfo::load(&doc, node).unwrap();
        let out = String::from_utf8(si.canonical_bytes(&doc).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"></ds:CanonicalizationMethod><ds:SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#hmac-sha1"></ds:SignatureMethod></ds:SignedInfo>"#
        );
    }

    #[test]
    fn test_unknown_canonicalization_deferred_to_use() {
        let doc = XmlDocument::parse(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><CanonicalizationMethod Algorithm="urn:c14n"/><SignatureMethod Algorithm="urn:sig"/></SignedInfo>"#,
        )
        .unwrap();
        let si = SignedInfo::load(&doc, doc.document_element().unwrap()).unwrap();
        assert!(matches!(si.canonical_bytes(&doc), Err(Error::UnsupportedAlgorithm(_))));
    }
}
