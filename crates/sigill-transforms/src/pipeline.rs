#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.
//!
//! Data between stages is either a node set over a document or a pull-based
//! octet stream. Octet stages wrap the reader they receive, so nothing is
//! materialized until the final consumer (usually a digest) reads.

use std::borrow::Cow;
use std::io::Read;

use sigill_c14n::C14nReader;
use sigill_core::uri::classify_canonicalization;
use sigill_core::{CanonicalizationMethod, Error};
use sigill_xml::{NodeSet, XmlDocument};

/// Data flowing through the transform pipeline.
pub enum TransformData<'a> {
    /// XML node set (input of XML-aware transforms such as C14N).
    NodeSet {
        doc: Cow<'a, XmlDocument>,
        nodes: NodeSet,
    },
    /// Octet stream.
    Octets(Box<dyn Read + 'a>),
}

impl<'a> TransformData<'a> {
    /// Wrap an in-memory buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        TransformData::Octets(Box::new(std::io::Cursor::new(bytes)))
    }

    pub fn is_node_set(&self) -> bool {
        matches!(self, TransformData::NodeSet { .. })
    }

    /// Convert to an octet stream. A node set is serialized with
    /// Canonical XML 1.0 without comments.
    pub fn into_reader(self) -> Box<dyn Read + 'a> {
        match self {
            TransformData::Octets(reader) => reader,
            TransformData::NodeSet { doc, nodes } => Box::new(C14nReader::new(
                doc,
                CanonicalizationMethod::Inclusive,
                Some(nodes),
                &[],
            )),
        }
    }

    /// Drain the data into a buffer.
    pub fn into_bytes(self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.into_reader()
            .read_to_end(&mut out)
            .map_err(Error::from_io)?;
        Ok(out)
    }

    /// Convert to a node set. Octets are parsed into a new document whose
    /// whole content, comments excluded, forms the set.
    pub fn into_node_set(self) -> Result<(Cow<'a, XmlDocument>, NodeSet), Error> {
        match self {
            TransformData::NodeSet { doc, nodes } => Ok((doc, nodes)),
            TransformData::Octets(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes).map_err(Error::from_io)?;
                let doc = XmlDocument::parse_bytes(&bytes)?;
                let nodes = NodeSet::all_without_comments(&doc);
                Ok((Cow::Owned(doc), nodes))
            }
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Wrap `input` with this stage.
    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform to the end of the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Chain all stages over `input`. Octet stages are lazy: the bytes
    /// are produced when the returned data is read.
    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    /// Chain all stages and convert the result to an octet stream.
    pub fn execute_to_reader<'a>(&self, input: TransformData<'a>) -> Result<Box<dyn Read + 'a>, Error> {
        Ok(self.execute(input)?.into_reader())
    }

    /// Algorithm URIs of the stages, in order.
    pub fn uris(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.uri()).collect()
    }

    /// Number of transforms in the pipeline.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    method: CanonicalizationMethod,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(method: CanonicalizationMethod, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            method,
            inclusive_prefixes,
        }
    }

    /// Build from a canonicalization URI. An unknown URI is rejected here,
    /// before any data flows.
    pub fn from_uri(uri: &str, inclusive_prefixes: Vec<String>) -> Result<Self, Error> {
        let method = classify_canonicalization(uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("canonicalization method: {uri}")))?;
        Ok(Self::new(method, inclusive_prefixes))
    }

    pub fn method(&self) -> CanonicalizationMethod {
        self.method
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.method.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let (doc, nodes) = match input {
            TransformData::NodeSet { doc, nodes } => (doc, Some(nodes)),
            // A parsed octet stream is canonicalized as a whole document.
            octets => (octets.into_node_set()?.0, None),
        };
        Ok(TransformData::Octets(Box::new(C14nReader::new(
            doc,
            self.method,
            nodes,
            &self.inclusive_prefixes,
        ))))
    }
}
