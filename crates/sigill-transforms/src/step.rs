#![forbid(unsafe_code)]

//! Declarative transform descriptions, as read from `<Transform>` elements.

use sigill_core::uri::classify_canonicalization;
use sigill_core::{algorithm, Error};
use sigill_xml::NodeId;

use crate::base64_transform::Base64DecodeTransform;
use crate::enveloped::{EnvelopedSignatureTransform, XPathTransform};
use crate::filter2::{Filter2Expr, XPathFilter2Transform};
use crate::pipeline::{C14nTransform, Transform, TransformPipeline};

/// The `<XPath>` parameter of an XPath transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathParam {
    pub expression: String,
    /// Prefix bindings in scope on the `<XPath>` element.
    pub namespaces: Vec<(String, String)>,
}

/// One `<Transform>`: its algorithm URI and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformStep {
    pub algorithm: String,
    /// `InclusiveNamespaces/@PrefixList`, exclusive c14n only.
    pub inclusive_prefixes: Vec<String>,
    pub xpath: Option<XPathParam>,
    /// XPath Filter 2.0 expressions, in document order.
    pub filters: Vec<Filter2Expr>,
}

impl TransformStep {
    pub fn new(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_owned(),
            inclusive_prefixes: Vec::new(),
            xpath: None,
            filters: Vec::new(),
        }
    }

    pub fn with_inclusive_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.inclusive_prefixes = prefixes;
        self
    }

    pub fn with_xpath(mut self, expression: &str, namespaces: Vec<(String, String)>) -> Self {
        self.xpath = Some(XPathParam {
            expression: expression.to_owned(),
            namespaces,
        });
        self
    }

    pub fn with_filter(mut self, filter: Filter2Expr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Instantiate the transform. `signature` is the `<Signature>` element
    /// the enveloped-signature transform removes.
    pub fn instantiate(&self, signature: NodeId) -> Result<Box<dyn Transform>, Error> {
        let uri = self.algorithm.as_str();
        if classify_canonicalization(uri).is_some() {
            return Ok(Box::new(C14nTransform::from_uri(
                uri,
                self.inclusive_prefixes.clone(),
            )?));
        }
        match uri {
            algorithm::ENVELOPED_SIGNATURE => Ok(Box::new(EnvelopedSignatureTransform::new(signature))),
            algorithm::BASE64 => Ok(Box::new(Base64DecodeTransform)),
            algorithm::XPATH => {
                let param = self
                    .xpath
                    .as_ref()
                    .ok_or_else(|| Error::MissingElement("XPath".into()))?;
                Ok(Box::new(XPathTransform::new(&param.expression, &param.namespaces)?))
            }
            algorithm::XPATH2 => Ok(Box::new(XPathFilter2Transform::new(self.filters.clone())?)),
            other => Err(Error::UnsupportedAlgorithm(format!("transform: {other}"))),
        }
    }
}

/// Build a pipeline from a `<Transforms>` list.
pub fn build_pipeline(steps: &[TransformStep], signature: NodeId) -> Result<TransformPipeline, Error> {
    let mut pipeline = TransformPipeline::new();
    for step in steps {
        pipeline.push(step.instantiate(signature)?);
    }
    tracing::debug!(transforms = ?pipeline.uris(), "built transform pipeline");
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_xml::XmlDocument;

    #[test]
    fn test_build_known_transforms() {
        let doc = XmlDocument::parse("<r/>").unwrap();
        let steps = vec![
            TransformStep::new(algorithm::ENVELOPED_SIGNATURE),
            TransformStep::new(algorithm::EXC_C14N).with_inclusive_prefixes(vec!["a".into()]),
            TransformStep::new(algorithm::BASE64),
        ];
        let pipeline = build_pipeline(&steps, doc.root()).unwrap();
        assert_eq!(
            pipeline.uris(),
            vec![algorithm::ENVELOPED_SIGNATURE, algorithm::EXC_C14N, algorithm::BASE64]
        );
    }

    #[test]
    fn test_unknown_transform_rejected() {
        let doc = XmlDocument::parse("<r/>").unwrap();
        let steps = vec![TransformStep::new(algorithm::XSLT)];
        assert!(matches!(
            build_pipeline(&steps, doc.root()),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        let no_param = vec![TransformStep::new(algorithm::XPATH)];
        assert!(matches!(
            build_pipeline(&no_param, doc.root()),
            Err(Error::MissingElement(_))
        ));
        let no_filter = vec![TransformStep::new(algorithm::XPATH2)];
        assert!(matches!(
            build_pipeline(&no_filter, doc.root()),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn test_build_filter2_step() {
        use crate::filter2::Filter2Op;

        let doc = XmlDocument::parse("<r/>").unwrap();
        let step = TransformStep::new(algorithm::XPATH2)
            .with_filter(Filter2Expr::new(Filter2Op::Subtract, "//x", vec![]));
        let pipeline = build_pipeline(&[step], doc.root()).unwrap();
        assert_eq!(pipeline.uris(), vec![algorithm::XPATH2]);
    }
}
