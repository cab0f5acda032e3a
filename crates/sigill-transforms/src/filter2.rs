#![forbid(unsafe_code)]

//! XPath Filter 2.0 transform.
//!
//! Each `<dsig-xpath:XPath Filter="...">` selects nodes; the subtrees of
//! those nodes are combined into a filter set by intersection, subtraction
//! or union, in document order of the filters. The filter set starts as
//! every node, and the output is the input node set intersected with it.

use sigill_core::{algorithm, ns, Error};
use sigill_xml::{xpath, NodeSet};

use crate::pipeline::{Transform, TransformData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter2Op {
    Intersect,
    Subtract,
    Union,
}

impl Filter2Op {
    pub fn from_attr(value: &str) -> Result<Self, Error> {
        match value {
            ns::XPATH2_FILTER_INTERSECT => Ok(Self::Intersect),
            ns::XPATH2_FILTER_SUBTRACT => Ok(Self::Subtract),
            ns::XPATH2_FILTER_UNION => Ok(Self::Union),
            other => Err(Error::Transform(format!("unknown XPath Filter 2.0 filter: {other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intersect => ns::XPATH2_FILTER_INTERSECT,
            Self::Subtract => ns::XPATH2_FILTER_SUBTRACT,
            Self::Union => ns::XPATH2_FILTER_UNION,
        }
    }
}

/// One `<XPath Filter="...">` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter2Expr {
    pub op: Filter2Op,
    pub expression: String,
    /// Prefix bindings in scope on the `<XPath>` element.
    pub namespaces: Vec<(String, String)>,
}

impl Filter2Expr {
    pub fn new(op: Filter2Op, expression: &str, namespaces: Vec<(String, String)>) -> Self {
        Self {
            op,
            expression: expression.to_owned(),
            namespaces,
        }
    }
}

pub struct XPathFilter2Transform {
    filters: Vec<Filter2Expr>,
}

impl XPathFilter2Transform {
    pub fn new(filters: Vec<Filter2Expr>) -> Result<Self, Error> {
        if filters.is_empty() {
            return Err(Error::MissingElement("XPath".into()));
        }
        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[Filter2Expr] {
        &self.filters
    }
}

impl Transform for XPathFilter2Transform {
    fn uri(&self) -> &str {
        algorithm::XPATH2
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let (doc, mut nodes) = input.into_node_set()?;
        let mut filter = NodeSet::all(&doc);
        for expr in &self.filters {
            let selected = xpath::select_nodes(&doc, doc.root(), &expr.expression, &expr.namespaces)?;
            let subtrees = NodeSet::subtrees(&selected, &doc);
            tracing::trace!(filter = expr.op.as_str(), selected = selected.len(), "XPath Filter 2.0 step");
            match expr.op {
                Filter2Op::Intersect => filter.intersect(&subtrees),
                Filter2Op::Subtract => filter.subtract(&subtrees),
                Filter2Op::Union => filter.union(&subtrees),
            }
        }
        nodes.intersect(&filter);
        Ok(TransformData::NodeSet { doc, nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use sigill_xml::XmlDocument;

    const DOC: &str = r##"<r><a Id="x">1<b>2</b></a><c>3</c><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature></r>"##;

    fn run(filters: Vec<Filter2Expr>) -> Vec<u8> {
        let doc = XmlDocument::parse(DOC).unwrap();
        let data = TransformData::NodeSet {
            doc: Cow::Borrowed(&doc),
            nodes: NodeSet::all_without_comments(&doc),
        };
        XPathFilter2Transform::new(filters)
            .unwrap()
            .execute(data)
            .unwrap()
            .into_bytes()
            .unwrap()
    }

    fn ds_binding() -> Vec<(String, String)> {
        vec![("ds".to_owned(), ns::DSIG.to_owned())]
    }

    #[test]
    fn test_subtract_signature() {
        let out = run(vec![Filter2Expr::new(Filter2Op::Subtract, "//ds:Signature", ds_binding())]);
        assert_eq!(out, b"<r><a Id=\"x\">1<b>2</b></a><c>3</c></r>");
    }

    #[test]
    fn test_intersect_by_id() {
        let out = run(vec![Filter2Expr::new(Filter2Op::Intersect, "id('x')", vec![])]);
        assert_eq!(out, b"<a Id=\"x\">1<b>2</b></a>");
    }

    #[test]
    fn test_filters_apply_in_order() {
        let out = run(vec![
            Filter2Expr::new(Filter2Op::Intersect, "id('x')", vec![]),
            Filter2Expr::new(Filter2Op::Subtract, "//b", vec![]),
            Filter2Expr::new(Filter2Op::Union, "//c", vec![]),
        ]);
        assert_eq!(out, b"<a Id=\"x\">1</a><c>3</c>");
    }

    #[test]
    fn test_filter_attribute_values() {
        assert_eq!(Filter2Op::from_attr("subtract").unwrap(), Filter2Op::Subtract);
        assert_eq!(Filter2Op::Union.as_str(), "union");
        assert!(matches!(Filter2Op::from_attr("xor"), Err(Error::Transform(_))));
        assert!(matches!(XPathFilter2Transform::new(vec![]), Err(Error::MissingElement(_))));
    }
}
