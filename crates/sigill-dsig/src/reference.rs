#![forbid(unsafe_code)]

//! `<Reference>` processing: digest calculation, digest checking, and the
//! recursion into `<Manifest>` reference lists.
//!
//! A reference's digest is produced by dereferencing its URI, running the
//! declared transforms, and finishing with the hash stage supplied by the
//! handler registered for its `DigestMethod`. Manifests are reference lists
//! kept inside `<Object>`; a reference whose `Type` is the Manifest type and
//! whose URI designates a `<Manifest>` element is followed into that list.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use sigill_core::uri::classify_canonicalization;
use sigill_core::{algorithm, ns, Error};
use sigill_crypto::sign::constant_time_eq;
use sigill_transforms::{build_pipeline, dereference, Filter2Expr, Filter2Op, TransformStep, UriResolver};
use sigill_xml::xpath::{parse_same_document_ref, SameDocumentRef};
use sigill_xml::{qname, NodeId, QName, XmlDocument};

use crate::context::DsigContext;
use crate::template::Template;

// ── Model ────────────────────────────────────────────────────────────

/// One `<Reference>`.
#[derive(Debug, Clone)]
pub struct Reference {
    pub node: NodeId,
    pub id: Option<String>,
    /// Absent when the element has no `URI` attribute.
    pub uri: Option<String>,
    pub type_uri: Option<String>,
    pub transforms: Vec<TransformStep>,
    pub digest_method: String,
    /// `None` until hashed when the template carries an empty DigestValue.
    pub digest_value: Option<Vec<u8>>,
}

/// The `<Reference>` children of a `<SignedInfo>` or `<Manifest>`.
#[derive(Debug, Clone)]
pub struct ReferenceList {
    /// The element holding the references.
    pub parent: NodeId,
    pub references: Vec<Reference>,
}

/// Everything reference processing needs from the signature.
pub struct ReferenceEnv<'c> {
    ctx: &'c DsigContext,
    resolver: Arc<dyn UriResolver>,
    signature: NodeId,
}

impl<'c> ReferenceEnv<'c> {
    /// `signature` is the `<Signature>` element enveloped-signature
    /// transforms remove.
    pub fn new(ctx: &'c DsigContext, signature: NodeId) -> Self {
        Self {
            ctx,
            resolver: ctx.uri_resolver(),
            signature,
        }
    }
}

// ── Verification report ──────────────────────────────────────────────

/// Why a reference did not validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The recomputed digest differs from the stored one.
    DigestMismatch,
    /// The URI could not be dereferenced.
    Unresolved(String),
    /// The reference carries no digest value to compare against.
    MissingDigest,
    /// A transform or the digest stage failed.
    Processing(String),
}

/// A failed reference. `path` holds the index in `<SignedInfo>` followed by
/// the index in each manifest descended into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFailure {
    pub path: Vec<usize>,
    pub uri: Option<String>,
    pub reason: FailureReason,
}

impl fmt::Display for ReferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.path.iter().map(usize::to_string).collect();
        write!(
            f,
            "reference {} (URI {:?}): ",
            path.join("/"),
            self.uri.as_deref().unwrap_or("<absent>")
        )?;
        match &self.reason {
            FailureReason::DigestMismatch => f.write_str("digest mismatch"),
            FailureReason::Unresolved(msg) => write!(f, "could not resolve URI: {msg}"),
            FailureReason::MissingDigest => f.write_str("no DigestValue"),
            FailureReason::Processing(msg) => write!(f, "processing failed: {msg}"),
        }
    }
}

/// Accumulated outcome of reference validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub failures: Vec<ReferenceFailure>,
    /// Set when the signature value over SignedInfo did not verify.
    pub signature_failure: Option<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.signature_failure.is_none()
    }

    /// Human-readable messages, references first.
    pub fn messages(&self) -> Vec<String> {
        let mut out: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        if let Some(msg) = &self.signature_failure {
            out.push(msg.clone());
        }
        out
    }

    pub fn clear(&mut self) {
        self.failures.clear();
        self.signature_failure = None;
    }
}

// ── Loading ──────────────────────────────────────────────────────────

fn structure(expected: &str, parent: &str) -> Error {
    Error::Structure(format!("expected <{expected}> in <{parent}>"))
}

/// Decode base64 element text, ignoring whitespace.
pub(crate) fn decode_base64_text(text: &str) -> Result<Vec<u8>, Error> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    B64.decode(compact.as_bytes())
        .map_err(|e| Error::Base64(e.to_string()))
}

pub(crate) fn required_algorithm(doc: &XmlDocument, node: NodeId, element: &str) -> Result<String, Error> {
    doc.attribute(node, ns::attr::ALGORITHM)
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {element}")))
}

/// The `PrefixList` of an `<ec:InclusiveNamespaces>` child, if any.
pub(crate) fn read_inclusive_prefixes(doc: &XmlDocument, node: NodeId) -> Vec<String> {
    doc.find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|inc| doc.attribute(inc, ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

fn read_transform(doc: &XmlDocument, node: NodeId) -> Result<TransformStep, Error> {
    let uri = required_algorithm(doc, node, ns::node::TRANSFORM)?;
    let mut step = TransformStep::new(&uri);
    if classify_canonicalization(&uri).is_some_and(|m| m.is_exclusive()) {
        step = step.with_inclusive_prefixes(read_inclusive_prefixes(doc, node));
    }
    if uri == algorithm::XPATH {
        if let Some(xpath) = doc.find_child_element(node, ns::DSIG, ns::node::XPATH) {
            let namespaces = doc.in_scope_namespaces(xpath).into_iter().collect();
            step = step.with_xpath(doc.text_content(xpath).trim(), namespaces);
        }
    }
    if uri == algorithm::XPATH2 {
        for xpath in doc.find_child_elements(node, ns::XPATH2, ns::node::XPATH) {
            let op = doc
                .attribute(xpath, ns::attr::FILTER)
                .ok_or_else(|| Error::MissingAttribute("Filter on XPath".into()))?;
            let namespaces = doc.in_scope_namespaces(xpath).into_iter().collect();
            let text = doc.text_content(xpath);
            step = step.with_filter(Filter2Expr::new(Filter2Op::from_attr(op)?, text.trim(), namespaces));
        }
    }
    Ok(step)
}

fn read_transforms(doc: &XmlDocument, node: NodeId) -> Result<Vec<TransformStep>, Error> {
    doc.element_children(node)
        .map(|child| {
            if doc.is_named(child, ns::DSIG, ns::node::TRANSFORM) {
                read_transform(doc, child)
            } else {
                Err(structure(ns::node::TRANSFORM, ns::node::TRANSFORMS))
            }
        })
        .collect()
}

impl Reference {
    /// Read a `<Reference>` element: `Transforms?`, `DigestMethod`,
    /// `DigestValue`, in that order.
    pub fn load(doc: &XmlDocument, node: NodeId) -> Result<Self, Error> {
        if !doc.is_named(node, ns::DSIG, ns::node::REFERENCE) {
            return Err(Error::Structure("not a <Reference> element".into()));
        }
        let attr = |name: &str| doc.attribute(node, name).map(str::to_owned);

        let mut child = doc.first_element_child(node);
        let mut transforms = Vec::new();
        if let Some(t) = child.filter(|c| doc.is_named(*c, ns::DSIG, ns::node::TRANSFORMS)) {
            transforms = read_transforms(doc, t)?;
            child = doc.next_element_sibling(t);
        }

        let method_node = child
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::DIGEST_METHOD))
            .ok_or_else(|| structure(ns::node::DIGEST_METHOD, ns::node::REFERENCE))?;
        let digest_method = required_algorithm(doc, method_node, ns::node::DIGEST_METHOD)?;

        let value_node = doc
            .next_element_sibling(method_node)
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::DIGEST_VALUE))
            .ok_or_else(|| structure(ns::node::DIGEST_VALUE, ns::node::REFERENCE))?;
        let text = doc.text_content(value_node);
        let digest_value = if text.trim().is_empty() {
            None
        } else {
            Some(decode_base64_text(&text)?)
        };

        Ok(Self {
            node,
            id: attr(ns::attr::ID),
            uri: attr(ns::attr::URI),
            type_uri: attr(ns::attr::TYPE),
            transforms,
            digest_method,
            digest_value,
        })
    }

    pub fn is_manifest(&self) -> bool {
        self.type_uri.as_deref() == Some(algorithm::MANIFEST_TYPE)
    }

    /// The `<Manifest>` element this reference points at, when it is a
    /// manifest reference with a same-document ID URI.
    pub fn manifest_target(&self, doc: &XmlDocument) -> Option<NodeId> {
        if !self.is_manifest() {
            return None;
        }
        let id = match parse_same_document_ref(self.uri.as_deref()?)? {
            SameDocumentRef::Id(id) | SameDocumentRef::XPointerId(id) => id,
            _ => return None,
        };
        doc.find_by_id(id)
            .ok()
            .filter(|m| doc.is_named(*m, ns::DSIG, ns::node::MANIFEST))
    }

    /// Dereference, transform, and digest.
    pub fn calculate_digest(&self, doc: &XmlDocument, env: &ReferenceEnv<'_>) -> Result<Vec<u8>, Error> {
        let handler = env
            .ctx
            .registry
            .lookup(&self.digest_method)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest method: {}", self.digest_method)))?;
        let mut pipeline = build_pipeline(&self.transforms, env.signature)?;
        let input = dereference(doc, self.uri.as_deref(), env.resolver.as_ref())?;

        if env.ctx.debug {
            let pre_digest = pipeline.execute(input)?.into_bytes()?;
            tracing::debug!(
                uri = self.uri.as_deref().unwrap_or(""),
                data = %String::from_utf8_lossy(&pre_digest),
                "pre-digest data"
            );
            let mut hash = sigill_transforms::TransformPipeline::new();
            handler.append_hash_transform(&mut hash, &self.digest_method)?;
            return hash
                .execute(sigill_transforms::TransformData::from_bytes(pre_digest))?
                .into_bytes();
        }

        handler.append_hash_transform(&mut pipeline, &self.digest_method)?;
        pipeline.execute(input)?.into_bytes()
    }

    /// Store `digest` in the model and in `<DigestValue>`.
    fn set_digest_value(&mut self, doc: &mut XmlDocument, digest: Vec<u8>) -> Result<(), Error> {
        let value_node = match doc.find_child_element(self.node, ns::DSIG, ns::node::DIGEST_VALUE) {
            Some(n) => n,
            None => {
                let prefix = doc.element(self.node).and_then(|e| e.name.prefix.as_deref().map(str::to_owned));
                let n = doc.create_element(qname(prefix.as_deref(), ns::node::DIGEST_VALUE, Some(ns::DSIG)));
                doc.append_child(self.node, n)?;
                n
            }
        };
        doc.set_text(value_node, &B64.encode(&digest))?;
        self.digest_value = Some(digest);
        Ok(())
    }

    /// Recompute and compare. Errors are returned only for conditions that
    /// abort the whole verification.
    fn check(&self, doc: &XmlDocument, env: &ReferenceEnv<'_>) -> Result<Option<FailureReason>, Error> {
        // An unknown DigestMethod aborts even when DigestValue is empty.
        env.ctx
            .registry
            .lookup(&self.digest_method)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest method: {}", self.digest_method)))?;
        let Some(expected) = &self.digest_value else {
            return Ok(Some(FailureReason::MissingDigest));
        };
        match self.calculate_digest(doc, env) {
            Ok(actual) if constant_time_eq(&actual, expected) => Ok(None),
            Ok(_) => Ok(Some(FailureReason::DigestMismatch)),
            Err(e @ Error::UnsupportedAlgorithm(_)) => Err(e),
            Err(Error::InvalidUri(msg)) | Err(Error::ResourceNotFound(msg)) => {
                Ok(Some(FailureReason::Unresolved(msg)))
            }
            Err(e) => Ok(Some(FailureReason::Processing(e.to_string()))),
        }
    }
}

// ── Manifest recursion ───────────────────────────────────────────────

/// Manifests entered on the current path, bounding depth and rejecting
/// cycles.
struct Walk {
    max_depth: usize,
    path: Vec<NodeId>,
}

impl Walk {
    fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            path: Vec::new(),
        }
    }

    fn enter(&mut self, manifest: NodeId) -> Result<(), Error> {
        if self.path.contains(&manifest) {
            return Err(Error::Structure("manifest references itself".into()));
        }
        if self.path.len() >= self.max_depth {
            return Err(Error::Structure(format!(
                "manifests nested deeper than {}",
                self.max_depth
            )));
        }
        self.path.push(manifest);
        Ok(())
    }

    fn leave(&mut self) {
        self.path.pop();
    }
}

impl ReferenceList {
    /// An empty list for `parent`.
    pub fn new(parent: NodeId) -> Self {
        Self {
            parent,
            references: Vec::new(),
        }
    }

    /// Read every `<Reference>` child of a `<Manifest>`.
    pub fn load_manifest(doc: &XmlDocument, manifest: NodeId) -> Result<Self, Error> {
        let references = doc
            .element_children(manifest)
            .map(|child| {
                if doc.is_named(child, ns::DSIG, ns::node::REFERENCE) {
                    Reference::load(doc, child)
                } else {
                    Err(structure(ns::node::REFERENCE, ns::node::MANIFEST))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            parent: manifest,
            references,
        })
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Reference> {
        self.references.get(index)
    }

    /// Compute and store every digest in document order. With
    /// `recurse_into_manifests`, manifest references are hashed after the
    /// manifests they point at, depth first.
    pub fn hash(
        &mut self,
        doc: &mut XmlDocument,
        env: &ReferenceEnv<'_>,
        recurse_into_manifests: bool,
    ) -> Result<(), Error> {
        let mut walk = Walk::new(env.ctx.max_manifest_depth);
        self.hash_with(doc, env, recurse_into_manifests, &mut walk)
    }

    fn hash_with(
        &mut self,
        doc: &mut XmlDocument,
        env: &ReferenceEnv<'_>,
        recurse: bool,
        walk: &mut Walk,
    ) -> Result<(), Error> {
        for reference in &mut self.references {
            if recurse {
                if let Some(manifest) = reference.manifest_target(doc) {
                    walk.enter(manifest)?;
                    let mut inner = ReferenceList::load_manifest(doc, manifest)?;
                    inner.hash_with(doc, env, true, walk)?;
                    walk.leave();
                }
            }
            let digest = reference.calculate_digest(doc, env)?;
            tracing::debug!(
                uri = reference.uri.as_deref().unwrap_or(""),
                digest = %B64.encode(&digest),
                "computed reference digest"
            );
            reference.set_digest_value(doc, digest)?;
        }
        Ok(())
    }

    /// Check every reference, descending into manifests, and record the
    /// failures in `report`. Only an unsupported algorithm or a malformed
    /// manifest stops the walk.
    pub fn verify(
        &self,
        doc: &XmlDocument,
        env: &ReferenceEnv<'_>,
        report: &mut VerifyReport,
    ) -> Result<(), Error> {
        let mut walk = Walk::new(env.ctx.max_manifest_depth);
        let mut path = Vec::new();
        self.verify_with(doc, env, report, &mut path, &mut walk)
    }

    fn verify_with(
        &self,
        doc: &XmlDocument,
        env: &ReferenceEnv<'_>,
        report: &mut VerifyReport,
        path: &mut Vec<usize>,
        walk: &mut Walk,
    ) -> Result<(), Error> {
        for (index, reference) in self.references.iter().enumerate() {
            path.push(index);
            if let Some(reason) = reference.check(doc, env)? {
                tracing::warn!(uri = reference.uri.as_deref().unwrap_or(""), ?reason, "reference failed");
                report.failures.push(ReferenceFailure {
                    path: path.clone(),
                    uri: reference.uri.clone(),
                    reason,
                });
            }
            if let Some(manifest) = reference.manifest_target(doc) {
                walk.enter(manifest)?;
                let inner = ReferenceList::load_manifest(doc, manifest)?;
                inner.verify_with(doc, env, report, path, walk)?;
                walk.leave();
            }
            path.pop();
        }
        Ok(())
    }
}

// ── Building ─────────────────────────────────────────────────────────

/// Append a `<Reference>` skeleton (DigestMethod plus empty DigestValue)
/// to `parent`.
pub(crate) fn create_reference_element(
    doc: &mut XmlDocument,
    template: &Template,
    parent: NodeId,
    uri: Option<&str>,
    digest_uri: &str,
    type_uri: Option<&str>,
) -> Result<NodeId, Error> {
    let node = template.child(doc, parent, ns::node::REFERENCE)?;
    if let Some(uri) = uri {
        doc.set_attribute(node, QName::local(ns::attr::URI), uri)?;
    }
    if let Some(type_uri) = type_uri {
        doc.set_attribute(node, QName::local(ns::attr::TYPE), type_uri)?;
    }
    template.algorithm_child(doc, node, ns::node::DIGEST_METHOD, digest_uri)?;
    template.child(doc, node, ns::node::DIGEST_VALUE)?;
    Ok(node)
}

impl Reference {
    pub(crate) fn unhashed(node: NodeId, uri: Option<&str>, digest_uri: &str, type_uri: Option<&str>) -> Self {
        Self {
            node,
            id: None,
            uri: uri.map(str::to_owned),
            type_uri: type_uri.map(str::to_owned),
            transforms: Vec::new(),
            digest_method: digest_uri.to_owned(),
            digest_value: None,
        }
    }
}

/// Adds transforms to a freshly created reference. Changes go to the
/// document and, for SignedInfo references, to the loaded model.
pub struct ReferenceBuilder<'s> {
    doc: &'s mut XmlDocument,
    template: Template,
    node: NodeId,
    transforms: Option<NodeId>,
    model: Option<&'s mut Reference>,
    xpf_prefix: String,
}

impl<'s> ReferenceBuilder<'s> {
    pub(crate) fn new(
        doc: &'s mut XmlDocument,
        template: Template,
        node: NodeId,
        model: Option<&'s mut Reference>,
    ) -> Self {
        Self {
            doc,
            template,
            node,
            transforms: None,
            model,
            xpf_prefix: ns::DEFAULT_XPATH2_PREFIX.to_owned(),
        }
    }

    /// Prefix used for XPath Filter 2.0 `<XPath>` elements.
    pub fn with_xpf_prefix(mut self, prefix: &str) -> Self {
        self.xpf_prefix = prefix.to_owned();
        self
    }

    /// The `<Reference>` element.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn set_id(&mut self, id: &str) -> Result<&mut Self, Error> {
        self.doc.set_attribute(self.node, QName::local(ns::attr::ID), id)?;
        if let Some(model) = self.model.as_deref_mut() {
            model.id = Some(id.to_owned());
        }
        Ok(self)
    }

    fn transforms_node(&mut self) -> Result<NodeId, Error> {
        if let Some(t) = self
            .transforms
            .or_else(|| self.doc.find_child_element(self.node, ns::DSIG, ns::node::TRANSFORMS))
        {
            self.transforms = Some(t);
            return Ok(t);
        }
        let t = self.template.element(self.doc, ns::node::TRANSFORMS);
        match self.doc.find_child_element(self.node, ns::DSIG, ns::node::DIGEST_METHOD) {
            Some(before) => self.template.insert_before(self.doc, self.node, t, before)?,
            None => self.template.append(self.doc, self.node, t)?,
        }
        self.transforms = Some(t);
        Ok(t)
    }

    /// Append a `<Transform>`. Unknown algorithms and unsupported XPath
    /// expressions are rejected before the tree changes.
    pub fn append_transform(&mut self, step: TransformStep) -> Result<&mut Self, Error> {
        step.instantiate(self.node)?;
        let parent = self.transforms_node()?;
        let t = self
            .template
            .algorithm_child(self.doc, parent, ns::node::TRANSFORM, &step.algorithm)?;

        if !step.inclusive_prefixes.is_empty() {
            let inc = self.doc.create_element(qname(
                Some("ec"),
                ns::node::INCLUSIVE_NAMESPACES,
                Some(ns::EXC_C14N),
            ));
            self.doc.declare_namespace(inc, "ec", ns::EXC_C14N)?;
            self.doc.set_attribute(
                inc,
                QName::local(ns::attr::PREFIX_LIST),
                &step.inclusive_prefixes.join(" "),
            )?;
            self.doc.append_child(t, inc)?;
        }
        if let Some(xpath) = &step.xpath {
            let x = self.template.element(self.doc, ns::node::XPATH);
            for (prefix, uri) in &xpath.namespaces {
                self.doc.declare_namespace(x, prefix, uri)?;
            }
            self.doc.set_text(x, &xpath.expression)?;
            self.doc.append_child(t, x)?;
        }
        for filter in &step.filters {
            let prefix = Some(self.xpf_prefix.as_str()).filter(|p| !p.is_empty());
            let x = self.doc.create_element(qname(prefix, ns::node::XPATH, Some(ns::XPATH2)));
            self.doc.declare_namespace(x, &self.xpf_prefix, ns::XPATH2)?;
            for (p, uri) in &filter.namespaces {
                self.doc.declare_namespace(x, p, uri)?;
            }
            self.doc.set_attribute(x, QName::local(ns::attr::FILTER), filter.op.as_str())?;
            self.doc.set_text(x, &filter.expression)?;
            self.doc.append_child(t, x)?;
        }

        if let Some(model) = self.model.as_deref_mut() {
            model.transforms.push(step);
        }
        Ok(self)
    }

    pub fn append_enveloped_signature_transform(&mut self) -> Result<&mut Self, Error> {
        self.append_transform(TransformStep::new(algorithm::ENVELOPED_SIGNATURE))
    }

    pub fn append_base64_transform(&mut self) -> Result<&mut Self, Error> {
        self.append_transform(TransformStep::new(algorithm::BASE64))
    }

    /// Append any canonicalization transform by URI.
    pub fn append_c14n_transform(&mut self, uri: &str) -> Result<&mut Self, Error> {
        if classify_canonicalization(uri).is_none() {
            return Err(Error::UnsupportedAlgorithm(format!("canonicalization: {uri}")));
        }
        self.append_transform(TransformStep::new(uri))
    }

    /// Append exclusive canonicalization with an inclusive prefix list.
    pub fn append_exclusive_c14n_transform(
        &mut self,
        with_comments: bool,
        inclusive_prefixes: &[&str],
    ) -> Result<&mut Self, Error> {
        let uri = if with_comments {
            algorithm::EXC_C14N_WITH_COMMENTS
        } else {
            algorithm::EXC_C14N
        };
        let prefixes = inclusive_prefixes.iter().map(|p| (*p).to_owned()).collect();
        self.append_transform(TransformStep::new(uri).with_inclusive_prefixes(prefixes))
    }

    /// Append an XPath transform; `namespaces` are declared on `<XPath>`.
    pub fn append_xpath_transform(
        &mut self,
        expression: &str,
        namespaces: &[(&str, &str)],
    ) -> Result<&mut Self, Error> {
        let namespaces = namespaces
            .iter()
            .map(|(p, u)| ((*p).to_owned(), (*u).to_owned()))
            .collect();
        self.append_transform(TransformStep::new(algorithm::XPATH).with_xpath(expression, namespaces))
    }

    /// Append an XPath Filter 2.0 transform with one `<XPath>` per filter.
    pub fn append_xpath_filter2_transform(&mut self, filters: Vec<Filter2Expr>) -> Result<&mut Self, Error> {
        let step = filters
            .into_iter()
            .fold(TransformStep::new(algorithm::XPATH2), TransformStep::with_filter);
        self.append_transform(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"<root xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><data Id="d">payload</data><ds:Signature Id="sig"><ds:Object><ds:Manifest Id="m"><ds:Reference URI="#d"><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><ds:DigestValue/></ds:Reference></ds:Manifest></ds:Object></ds:Signature></root>"##;

    fn signature_node(doc: &XmlDocument) -> NodeId {
        doc.find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE).unwrap()
    }

    fn outer(doc: &mut XmlDocument, uri: &str, type_uri: Option<&str>) -> ReferenceList {
        let parent = doc.create_element(qname(Some("ds"), "SignedInfo", Some(ns::DSIG)));
        let sig = signature_node(doc);
        doc.append_child(sig, parent).unwrap();
        let template = Template::new(Some("ds"), false);
        let node = create_reference_element(doc, &template, parent, Some(uri), algorithm::SHA256, type_uri)
            .unwrap();
        let mut list = ReferenceList::new(parent);
        list.references.push(Reference::load(doc, node).unwrap());
        list
    }

    #[test]
    fn test_load_reference() {
        let doc = XmlDocument::parse(
            r#"<ds:Reference xmlns:ds="http://www.w3.org/2000/09/xmldsig#" URI="" Id="r1"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/><ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"><ec:InclusiveNamespaces xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#" PrefixList="a #default"/></ds:Transform></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><ds:DigestValue>AAEC</ds:DigestValue></ds:Reference>"#,
        )
        .unwrap();
        let node = doc.document_element().unwrap();
        let reference = Reference::load(&doc, node).unwrap();
        assert_eq!(reference.uri.as_deref(), Some(""));
        assert_eq!(reference.id.as_deref(), Some("r1"));
        assert_eq!(reference.transforms.len(), 2);
        assert_eq!(reference.transforms[1].inclusive_prefixes, vec!["a", "#default"]);
        assert_eq!(reference.digest_value, Some(vec![0, 1, 2]));
        assert!(!reference.is_manifest());
    }

    #[test]
    fn test_missing_digest_method_is_structure_error() {
        let doc = XmlDocument::parse(
            r#"<ds:Reference xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:DigestValue/></ds:Reference>"#,
        )
        .unwrap();
        let err = Reference::load(&doc, doc.document_element().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Structure(msg) if msg.contains("DigestMethod")));
    }

    #[test]
    fn test_hash_then_verify() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#d", None);
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        list.hash(&mut doc, &env, false).unwrap();
        assert_eq!(list.references[0].digest_value.as_ref().map(Vec::len), Some(32));

        let mut report = VerifyReport::default();
        list.verify(&doc, &env, &mut report).unwrap();
        assert!(report.is_ok(), "{:?}", report.messages());
    }

    #[test]
    fn test_unresolved_reference_is_recorded() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#nowhere", None);
        list.references[0].digest_value = Some(vec![0; 32]);
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        let mut report = VerifyReport::default();
        list.verify(&doc, &env, &mut report).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].reason, FailureReason::Unresolved(_)));
    }

    #[test]
    fn test_unknown_digest_aborts_verify() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#d", None);
        list.references[0].digest_method = "urn:no-such-digest".into();
        list.references[0].digest_value = Some(vec![0; 32]);
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        let mut report = VerifyReport::default();
        assert!(matches!(
            list.verify(&doc, &env, &mut report),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_digest_without_value_aborts_verify() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#d", None);
        list.references[0].digest_method = "urn:no-such-digest".into();
        list.references[0].digest_value = None;
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        let mut report = VerifyReport::default();
        assert!(matches!(
            list.verify(&doc, &env, &mut report),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_manifest_interlocking() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#m", Some(algorithm::MANIFEST_TYPE));
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));

        // Without recursion the inner reference never gets a digest.
        list.hash(&mut doc, &env, false).unwrap();
        let mut report = VerifyReport::default();
        list.verify(&doc, &env, &mut report).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, vec![0, 0]);
        assert_eq!(report.failures[0].reason, FailureReason::MissingDigest);

        list.hash(&mut doc, &env, true).unwrap();
        let mut report = VerifyReport::default();
        list.verify(&doc, &env, &mut report).unwrap();
        assert!(report.is_ok(), "{:?}", report.messages());
    }

    #[test]
    fn test_manifest_cycle_rejected() {
        let xml = r##"<root xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Signature><ds:Object><ds:Manifest Id="m"><ds:Reference URI="#m" Type="http://www.w3.org/2000/09/xmldsig#Manifest"><ds:DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1"/><ds:DigestValue/></ds:Reference></ds:Manifest></ds:Object></ds:Signature></root>"##;
        let mut doc = XmlDocument::parse(xml).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "#m", Some(algorithm::MANIFEST_TYPE));
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        assert!(matches!(
            list.hash(&mut doc, &env, true),
            Err(Error::Structure(msg)) if msg.contains("itself")
        ));
    }

    #[test]
    fn test_builder_writes_transforms() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let parent = doc.document_element().unwrap();
        let template = Template::new(Some("ds"), false);
        let node =
            create_reference_element(&mut doc, &template, parent, Some(""), algorithm::SHA1, None).unwrap();
        let mut model = Reference::unhashed(node, Some(""), algorithm::SHA1, None);
        ReferenceBuilder::new(&mut doc, template, node, Some(&mut model))
            .append_enveloped_signature_transform()
            .unwrap()
            .append_exclusive_c14n_transform(false, &["a"])
            .unwrap();
        assert!(matches!(
            ReferenceBuilder::new(&mut doc, Template::new(None, false), node, None)
                .append_transform(TransformStep::new("urn:bogus")),
            Err(Error::UnsupportedAlgorithm(_))
        ));

        let loaded = Reference::load(&doc, node).unwrap();
        assert_eq!(loaded.transforms, model.transforms);
        assert_eq!(loaded.transforms[1].inclusive_prefixes, vec!["a"]);
    }

    #[test]
    fn test_filter2_transform_written_and_read() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let parent = doc.document_element().unwrap();
        let template = Template::new(Some("ds"), false);
        let node =
            create_reference_element(&mut doc, &template, parent, Some(""), algorithm::SHA256, None).unwrap();
        let mut model = Reference::unhashed(node, Some(""), algorithm::SHA256, None);
        let ds = vec![("ds".to_owned(), ns::DSIG.to_owned())];
        ReferenceBuilder::new(&mut doc, template, node, Some(&mut model))
            .with_xpf_prefix("xf")
            .append_xpath_filter2_transform(vec![
                Filter2Expr::new(Filter2Op::Subtract, "//ds:Signature", ds),
                Filter2Expr::new(Filter2Op::Union, "id('d')", vec![]),
            ])
            .unwrap();

        let xml = doc.to_xml().unwrap();
        assert!(xml.contains(r#"<xf:XPath xmlns:xf="http://www.w3.org/2002/06/xmldsig-filter2""#));
        assert!(xml.contains(r#"Filter="subtract">//ds:Signature</xf:XPath>"#));

        let loaded = Reference::load(&doc, node).unwrap();
        let filters = &loaded.transforms[0].filters;
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].op, Filter2Op::Subtract);
        assert_eq!(filters[1].expression, "id('d')");
        assert!(filters[0].namespaces.iter().any(|(p, u)| p == "ds" && u == ns::DSIG));
    }

    #[test]
    fn test_filter2_subtract_digest_ignores_signature() {
        let mut doc = XmlDocument::parse(DOC).unwrap();
        let ctx = DsigContext::new();
        let mut list = outer(&mut doc, "", None);
        list.references[0].transforms = vec![TransformStep::new(algorithm::XPATH2).with_filter(Filter2Expr::new(
            Filter2Op::Subtract,
            "//ds:Signature",
            vec![("ds".to_owned(), ns::DSIG.to_owned())],
        ))];
        let env = ReferenceEnv::new(&ctx, signature_node(&doc));
        list.hash(&mut doc, &env, false).unwrap();

        // Digest values inside the signature do not feed the reference.
        let mut report = VerifyReport::default();
        list.verify(&doc, &env, &mut report).unwrap();
        assert!(report.is_ok(), "{:?}", report.messages());
    }

    #[test]
    fn test_report_messages() {
        let report = VerifyReport {
            failures: vec![ReferenceFailure {
                path: vec![1, 0],
                uri: Some("#x".into()),
                reason: FailureReason::DigestMismatch,
            }],
            signature_failure: None,
        };
        assert_eq!(report.messages(), vec![r##"reference 1/0 (URI "#x"): digest mismatch"##]);
    }
}
