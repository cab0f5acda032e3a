#![forbid(unsafe_code)]

//! The `<Signature>` engine: loading, building, signing, and verifying a
//! signature held in an owned document.
//!
//! A [`Signature`] owns its document for the duration of processing. It is
//! either loaded from an existing `<Signature>` element or built with
//! [`Signature::create_blank`], then signed or verified:
//!
//! ```text
//! Unloaded --load--> Loaded --sign--> Signed
//!                       \--verify--> VerifiedOk | VerifiedFailed
//! ```
//!
//! Signing writes every `<DigestValue>` and the `<SignatureValue>`; if any
//! step fails the document is restored to its state before the call.

use std::io::Read;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use sigill_core::{algorithm, ns, Error};
use sigill_keys::keyinfo::{DsaKeyValue, KeyInfoWriter, X509Data};
use sigill_keys::{Key, KeyInfoItem, KeyInfoList, KeyInfoResolver};
use sigill_transforms::{TransformData, TransformPipeline};
use sigill_xml::{NodeId, QName, XmlDocument};

use crate::context::DsigContext;
use crate::reference::{
    create_reference_element, decode_base64_text, Reference, ReferenceBuilder, ReferenceEnv, VerifyReport,
};
use crate::signed_info::SignedInfo;
use crate::template::{remove_with_trailing_newline, Template};

/// Text of `<SignatureValue>` before the first signing.
pub const UNSIGNED_PLACEHOLDER: &str = "Not yet signed";

/// Lifecycle of a [`Signature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    Unloaded,
    Loaded,
    Signed,
    VerifiedOk,
    VerifiedFailed,
}

/// One `<Object>` child of the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsigObject {
    pub node: NodeId,
    pub id: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
}

impl DsigObject {
    fn read(doc: &XmlDocument, node: NodeId) -> Self {
        let attr = |name: &str| doc.attribute(node, name).map(str::to_owned);
        Self {
            node,
            id: attr(ns::attr::ID),
            mime_type: attr(ns::attr::MIME_TYPE),
            encoding: attr(ns::attr::ENCODING),
        }
    }
}

fn expected(element: &str) -> Error {
    Error::Structure(format!("expected <{element}> in <{}>", ns::node::SIGNATURE))
}

/// An XML signature bound to its document.
pub struct Signature {
    doc: XmlDocument,
    node: NodeId,
    ctx: DsigContext,
    state: SignatureState,
    prefix: Option<String>,
    signed_info: Option<SignedInfo>,
    signature_value_node: Option<NodeId>,
    key_info_node: Option<NodeId>,
    key_info: KeyInfoList,
    objects: Vec<DsigObject>,
    key: Option<Key>,
    key_info_resolver: Option<Arc<dyn KeyInfoResolver>>,
    report: VerifyReport,
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signature")
            .field("node", &self.node)
            .field("state", &self.state)
            .field("references", &self.references().len())
            .field("objects", &self.objects.len())
            .finish_non_exhaustive()
    }
}

impl Signature {
    /// Wrap the `<Signature>` element `node` of `doc`. Call [`load`](Self::load)
    /// before anything else.
    pub fn new(mut doc: XmlDocument, node: NodeId, ctx: DsigContext) -> Self {
        for name in &ctx.id_attrs {
            doc.register_id_attribute(name);
        }
        for (uri, local) in &ctx.id_attrs_ns {
            doc.register_id_attribute_ns(uri, local);
        }
        doc.set_id_by_attribute_name(ctx.id_by_attribute_name);
        Self {
            doc,
            node,
            ctx,
            state: SignatureState::Unloaded,
            prefix: None,
            signed_info: None,
            signature_value_node: None,
            key_info_node: None,
            key_info: KeyInfoList::new(),
            objects: Vec::new(),
            key: None,
            key_info_resolver: None,
            report: VerifyReport::default(),
        }
    }

    /// Wrap the first `<Signature>` element of `doc`.
    pub fn find(doc: XmlDocument, ctx: DsigContext) -> Result<Self, Error> {
        let node = doc
            .find_element(doc.root(), ns::DSIG, ns::node::SIGNATURE)
            .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE.into()))?;
        Ok(Self::new(doc, node, ctx))
    }

    /// Parse `xml`, then find and load its first signature.
    pub fn parse(xml: &str, ctx: DsigContext) -> Result<Self, Error> {
        let mut signature = Self::find(XmlDocument::parse(xml)?, ctx)?;
        signature.load()?;
        Ok(signature)
    }

    /// Build an unsigned `<Signature>` with an empty `<SignedInfo>` and
    /// append it to `parent`, or make it the document element when `parent`
    /// is `None`.
    pub fn create_blank(
        mut doc: XmlDocument,
        parent: Option<NodeId>,
        c14n_uri: &str,
        signature_uri: &str,
        ctx: DsigContext,
    ) -> Result<Self, Error> {
        let template = Template::new(Some(ctx.dsig_prefix.as_str()), ctx.pretty_print);
        let node = template.element(&mut doc, ns::node::SIGNATURE);
        doc.declare_namespace(node, template.prefix().unwrap_or(""), ns::DSIG)?;
        let parent = parent.unwrap_or_else(|| doc.root());
        doc.append_child(parent, node)?;

        let signed_info = SignedInfo::create(&mut doc, &template, node, c14n_uri, signature_uri)?;
        let value = template.child(&mut doc, node, ns::node::SIGNATURE_VALUE)?;
        doc.set_text(value, UNSIGNED_PLACEHOLDER)?;

        let mut signature = Self::new(doc, node, ctx);
        signature.prefix = template.prefix().map(str::to_owned);
        signature.signed_info = Some(signed_info);
        signature.signature_value_node = Some(value);
        signature.state = SignatureState::Loaded;
        Ok(signature)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Read the signature from the document: `SignedInfo`,
    /// `SignatureValue`, an optional `KeyInfo`, then `Object` elements.
    pub fn load(&mut self) -> Result<(), Error> {
        let doc = &self.doc;
        let node = self.node;
        if !doc.is_named(node, ns::DSIG, ns::node::SIGNATURE) {
            return Err(Error::Structure("not a <Signature> element".into()));
        }
        let prefix = doc.element(node).and_then(|e| e.name.prefix.as_deref().map(str::to_owned));

        let si_node = doc
            .first_element_child(node)
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::SIGNED_INFO))
            .ok_or_else(|| expected(ns::node::SIGNED_INFO))?;
        let signed_info = SignedInfo::load(doc, si_node)?;

        let value = doc
            .next_element_sibling(si_node)
            .filter(|c| doc.is_named(*c, ns::DSIG, ns::node::SIGNATURE_VALUE))
            .ok_or_else(|| expected(ns::node::SIGNATURE_VALUE))?;
        if doc.text_content(value).trim().is_empty() {
            return Err(Error::Structure("expected text in <SignatureValue>".into()));
        }

        let mut next = doc.next_element_sibling(value);
        let mut key_info_node = None;
        let mut key_info = KeyInfoList::new();
        if let Some(ki) = next.filter(|c| doc.is_named(*c, ns::DSIG, ns::node::KEY_INFO)) {
            key_info = KeyInfoList::from_element(doc, ki)?;
            key_info_node = Some(ki);
            next = doc.next_element_sibling(ki);
        }

        let mut objects = Vec::new();
        while let Some(child) = next {
            if !doc.is_named(child, ns::DSIG, ns::node::OBJECT) {
                return Err(expected(ns::node::OBJECT));
            }
            objects.push(DsigObject::read(doc, child));
            next = doc.next_element_sibling(child);
        }

        tracing::debug!(
            references = signed_info.references.len(),
            objects = objects.len(),
            key_info = key_info.items.len(),
            "loaded signature"
        );
        self.prefix = prefix;
        self.signed_info = Some(signed_info);
        self.signature_value_node = Some(value);
        self.key_info_node = key_info_node;
        self.key_info = key_info;
        self.objects = objects;
        self.report.clear();
        self.state = SignatureState::Loaded;
        Ok(())
    }

    fn require_loaded(&self, operation: &str) -> Result<(), Error> {
        if self.state == SignatureState::Unloaded {
            return Err(Error::State(format!("cannot {operation}: signature is not loaded")));
        }
        Ok(())
    }

    fn signed_info(&self) -> Result<&SignedInfo, Error> {
        self.signed_info
            .as_ref()
            .ok_or_else(|| Error::State("signature is not loaded".into()))
    }

    fn template(&self) -> Template {
        Template::new(self.prefix.as_deref(), self.ctx.pretty_print)
    }

    // ── Building ─────────────────────────────────────────────────────

    /// Add a `<Reference>` to `<SignedInfo>`. Transforms are added through
    /// the returned builder.
    pub fn create_reference(
        &mut self,
        uri: Option<&str>,
        digest_uri: &str,
        type_uri: Option<&str>,
    ) -> Result<ReferenceBuilder<'_>, Error> {
        self.require_loaded("create a reference")?;
        let template = self.template();
        let si = self
            .signed_info
            .as_mut()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let node = create_reference_element(&mut self.doc, &template, si.node, uri, digest_uri, type_uri)?;
        si.references
            .references
            .push(Reference::unhashed(node, uri, digest_uri, type_uri));
        let model = si.references.references.last_mut();
        Ok(ReferenceBuilder::new(&mut self.doc, template, node, model).with_xpf_prefix(&self.ctx.xpf_prefix))
    }

    /// Remove the `index`th `<SignedInfo>` reference.
    pub fn remove_reference(&mut self, index: usize) -> Result<Reference, Error> {
        self.require_loaded("remove a reference")?;
        let si = self
            .signed_info
            .as_mut()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        if index >= si.references.len() {
            return Err(Error::Other(format!(
                "no reference at index {index} ({} present)",
                si.references.len()
            )));
        }
        let reference = si.references.references.remove(index);
        remove_with_trailing_newline(&mut self.doc, reference.node)?;
        Ok(reference)
    }

    /// Append an empty `<Object>` and return its index.
    pub fn append_object(&mut self, id: Option<&str>) -> Result<usize, Error> {
        self.require_loaded("append an object")?;
        let template = self.template();
        let node = template.child(&mut self.doc, self.node, ns::node::OBJECT)?;
        if let Some(id) = id {
            self.doc.set_attribute(node, QName::local(ns::attr::ID), id)?;
        }
        self.objects.push(DsigObject::read(&self.doc, node));
        Ok(self.objects.len() - 1)
    }

    pub fn objects(&self) -> &[DsigObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Result<&DsigObject, Error> {
        self.objects.get(index).ok_or_else(|| {
            Error::Other(format!("no object at index {index} ({} present)", self.objects.len()))
        })
    }

    /// Add a `<Manifest Id="id">` to the `object`th `<Object>` and a
    /// `<SignedInfo>` reference of the Manifest type pointing at it.
    pub fn create_manifest(&mut self, object: usize, id: &str, digest_uri: &str) -> Result<NodeId, Error> {
        let object_node = self.object(object)?.node;
        let template = self.template();
        let manifest = template.child(&mut self.doc, object_node, ns::node::MANIFEST)?;
        self.doc.set_attribute(manifest, QName::local(ns::attr::ID), id)?;
        self.create_reference(Some(&format!("#{id}")), digest_uri, Some(algorithm::MANIFEST_TYPE))?;
        Ok(manifest)
    }

    /// Add a `<Reference>` to a manifest created with
    /// [`create_manifest`](Self::create_manifest).
    pub fn create_manifest_reference(
        &mut self,
        manifest: NodeId,
        uri: Option<&str>,
        digest_uri: &str,
        type_uri: Option<&str>,
    ) -> Result<ReferenceBuilder<'_>, Error> {
        self.require_loaded("create a manifest reference")?;
        if !self.doc.is_named(manifest, ns::DSIG, ns::node::MANIFEST) {
            return Err(Error::Structure("not a <Manifest> element".into()));
        }
        let template = self.template();
        let node = create_reference_element(&mut self.doc, &template, manifest, uri, digest_uri, type_uri)?;
        Ok(ReferenceBuilder::new(&mut self.doc, template, node, None).with_xpf_prefix(&self.ctx.xpf_prefix))
    }

    /// Truncate an HMAC signature to `bits`.
    pub fn set_hmac_output_length(&mut self, bits: u32) -> Result<(), Error> {
        self.require_loaded("set the HMAC output length")?;
        let template = self.template();
        let si = self
            .signed_info
            .as_mut()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        si.set_hmac_output_length(&mut self.doc, &template, bits)
    }

    // ── KeyInfo ──────────────────────────────────────────────────────

    /// The `<KeyInfo>` element, created after `<SignatureValue>` if absent.
    fn key_info_element(&mut self) -> Result<NodeId, Error> {
        if let Some(ki) = self.key_info_node {
            return Ok(ki);
        }
        let value = self
            .signature_value_node
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let template = self.template();
        let ki = template.element(&mut self.doc, ns::node::KEY_INFO);
        match self.doc.next_element_sibling(value) {
            Some(before) => template.insert_before(&mut self.doc, self.node, ki, before)?,
            None => template.append(&mut self.doc, self.node, ki)?,
        }
        self.key_info_node = Some(ki);
        Ok(ki)
    }

    /// Append a descriptor to `<KeyInfo>`, creating it if needed.
    pub fn append_key_info_item(&mut self, item: KeyInfoItem) -> Result<NodeId, Error> {
        self.require_loaded("modify KeyInfo")?;
        let ki = self.key_info_element()?;
        let template = self.template();
        let node = KeyInfoWriter::new(&mut self.doc, template.prefix()).write(&item)?;
        template.append(&mut self.doc, ki, node)?;
        self.key_info.items.push(item);
        Ok(node)
    }

    /// Append a key name. A distinguished name (`is_dname`) is written as
    /// `<X509Data><X509SubjectName>` rather than `<KeyName>`.
    pub fn append_key_name(&mut self, name: &str, is_dname: bool) -> Result<NodeId, Error> {
        if is_dname {
            return self.append_x509_data(X509Data {
                subject_names: vec![name.to_owned()],
                ..X509Data::default()
            });
        }
        self.append_key_info_item(KeyInfoItem::KeyName(name.to_owned()))
    }

    /// Append `<KeyValue><RSAKeyValue>` from big-endian modulus and exponent.
    pub fn append_rsa_key_value(&mut self, modulus: &[u8], exponent: &[u8]) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::RsaKeyValue {
            modulus: modulus.to_vec(),
            exponent: exponent.to_vec(),
        })
    }

    pub fn append_dsa_key_value(&mut self, value: DsaKeyValue) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::DsaKeyValue(value))
    }

    pub fn append_x509_data(&mut self, data: X509Data) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::X509Data(data))
    }

    pub fn append_pgp_data(&mut self, key_id: Option<&[u8]>, key_packet: Option<&[u8]>) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::PgpData {
            key_id: key_id.map(<[u8]>::to_vec),
            key_packet: key_packet.map(<[u8]>::to_vec),
        })
    }

    pub fn append_spki_data(&mut self, sexps: Vec<Vec<u8>>) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::SpkiData(sexps))
    }

    pub fn append_mgmt_data(&mut self, data: &str) -> Result<NodeId, Error> {
        self.append_key_info_item(KeyInfoItem::MgmtData(data.to_owned()))
    }

    /// Remove `<KeyInfo>` and everything in it.
    pub fn clear_key_info(&mut self) -> Result<(), Error> {
        if let Some(ki) = self.key_info_node.take() {
            remove_with_trailing_newline(&mut self.doc, ki)?;
        }
        self.key_info = KeyInfoList::new();
        Ok(())
    }

    pub fn key_info(&self) -> &KeyInfoList {
        &self.key_info
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// Bind the key used to sign, or to verify without consulting KeyInfo.
    pub fn set_signing_key(&mut self, key: Key) {
        self.key = Some(key);
    }

    pub fn signing_key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Resolve the verification key from KeyInfo when none is bound.
    pub fn set_key_info_resolver(&mut self, resolver: Arc<dyn KeyInfoResolver>) {
        self.key_info_resolver = Some(resolver);
    }

    /// The bound key, or the resolver's answer. The first resolved key is
    /// stored in `self.key` and reused by later verifications and by
    /// [`sign`](Self::sign); bind another key with
    /// [`set_signing_key`](Self::set_signing_key) to replace it.
    fn verification_key(&mut self) -> Result<Key, Error> {
        if let Some(key) = &self.key {
            return Ok(key.clone());
        }
        let resolver = self
            .key_info_resolver
            .as_ref()
            .ok_or_else(|| Error::Key("no key set and no KeyInfo resolver installed".into()))?;
        let key = resolver.resolve_key(&self.key_info)?;
        tracing::debug!(key = ?key.data, "resolved verification key from KeyInfo");
        self.key = Some(key.clone());
        Ok(key)
    }

    // ── Signing ──────────────────────────────────────────────────────

    /// Reject HMAC truncation below the configured floor or to a partial byte.
    fn check_hmac_output_length(&self) -> Result<(), Error> {
        let Some(bits) = self.signed_info()?.hmac_output_length else {
            return Ok(());
        };
        let floor = self.ctx.hmac_floor();
        if bits < floor {
            return Err(Error::SecurityPolicy(format!(
                "HMACOutputLength {bits} is below the minimum of {floor} bits"
            )));
        }
        if bits % 8 != 0 {
            return Err(Error::SecurityPolicy(format!(
                "HMACOutputLength {bits} is not a whole number of bytes"
            )));
        }
        Ok(())
    }

    /// Hash every reference, then sign canonical `<SignedInfo>` with the
    /// bound key.
    pub fn sign(&mut self) -> Result<(), Error> {
        self.require_loaded("sign")?;
        let key = self
            .key
            .clone()
            .ok_or_else(|| Error::Key("no signing key set".into()))?;
        let snapshot = (self.doc.clone(), self.signed_info.clone());
        match self.sign_with(&key) {
            Ok(()) => {
                self.state = SignatureState::Signed;
                Ok(())
            }
            Err(e) => {
                self.doc = snapshot.0;
                self.signed_info = snapshot.1;
                Err(e)
            }
        }
    }

    fn sign_with(&mut self, key: &Key) -> Result<(), Error> {
        self.check_hmac_output_length()?;
        let value_node = self
            .signature_value_node
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let si = self
            .signed_info
            .as_mut()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let handler = self
            .ctx
            .registry
            .lookup(&si.signature_method)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature method: {}", si.signature_method)))?;

        let env = ReferenceEnv::new(&self.ctx, self.node);
        si.references.hash(&mut self.doc, &env, self.ctx.interlocking)?;

        let value = if self.ctx.debug {
            let canonical = si.canonical_bytes(&self.doc)?;
            tracing::debug!(data = %String::from_utf8_lossy(&canonical), "canonical SignedInfo");
            handler.sign(&mut canonical.as_slice(), &si.signature_method, key, si.hmac_output_length)?
        } else {
            let mut input = si.canonical_reader(&self.doc)?;
            handler.sign(&mut *input, &si.signature_method, key, si.hmac_output_length)?
        };
        self.doc.set_text(value_node, &B64.encode(&value))?;
        tracing::debug!(method = %si.signature_method, "signed");
        Ok(())
    }

    // ── Verification ─────────────────────────────────────────────────

    /// Check every reference digest, descending into manifests. Failures
    /// are recorded in [`report`](Self::report).
    pub fn verify_references(&mut self) -> Result<bool, Error> {
        self.require_loaded("verify")?;
        self.report.failures.clear();
        let si = self
            .signed_info
            .as_ref()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let env = ReferenceEnv::new(&self.ctx, self.node);
        si.references.verify(&self.doc, &env, &mut self.report)?;
        Ok(self.report.failures.is_empty())
    }

    /// Check `<SignatureValue>` over canonical `<SignedInfo>` without
    /// looking at the references.
    pub fn verify_signature_only(&mut self) -> Result<bool, Error> {
        self.require_loaded("verify")?;
        self.report.signature_failure = None;
        self.check_hmac_output_length()?;
        let key = self.verification_key()?;

        let ok = {
            let si = self.signed_info()?;
            let value_node = self
                .signature_value_node
                .ok_or_else(|| Error::State("signature is not loaded".into()))?;
            let signature_value = decode_base64_text(&self.doc.text_content(value_node))?;
            let handler = self.ctx.registry.lookup(&si.signature_method).ok_or_else(|| {
                Error::UnsupportedAlgorithm(format!("signature method: {}", si.signature_method))
            })?;
            let mut input = si.canonical_reader(&self.doc)?;
            handler.verify(
                &mut *input,
                &si.signature_method,
                &signature_value,
                si.hmac_output_length,
                &key,
            )?
        };
        if !ok {
            tracing::warn!(method = %self.signed_info()?.signature_method, "signature value mismatch");
            self.report.signature_failure = Some("Validation of <SignedInfo> failed".into());
        }
        Ok(ok)
    }

    /// Verify references and the signature value. Both always run, so the
    /// report lists every problem.
    pub fn verify(&mut self) -> Result<bool, Error> {
        self.require_loaded("verify")?;
        let references_ok = self.verify_references()?;
        let signature_ok = self.verify_signature_only()?;
        let ok = references_ok && signature_ok;
        self.state = if ok {
            SignatureState::VerifiedOk
        } else {
            SignatureState::VerifiedFailed
        };
        tracing::debug!(references_ok, signature_ok, "verified signature");
        Ok(ok)
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Canonical `<SignedInfo>` run through the signature method's hash
    /// stage (the MAC for HMAC methods).
    pub fn calculate_signed_info_hash(&self) -> Result<Vec<u8>, Error> {
        self.require_loaded("hash SignedInfo")?;
        let si = self.signed_info()?;
        let handler = self
            .ctx
            .registry
            .lookup(&si.signature_method)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature method: {}", si.signature_method)))?;
        let mut pipeline = TransformPipeline::new();
        handler.append_signature_hash_transform(&mut pipeline, &si.signature_method, self.key.as_ref())?;
        let input = TransformData::Octets(si.canonical_reader(&self.doc)?);
        pipeline.execute(input)?.into_bytes()
    }

    /// Hash every reference into the document, then return
    /// [`calculate_signed_info_hash`](Self::calculate_signed_info_hash).
    /// Nothing is signed, so the hash can be signed elsewhere and written
    /// back as the `<SignatureValue>`.
    pub fn calculate_signed_info_and_reference_hash(&mut self) -> Result<Vec<u8>, Error> {
        self.require_loaded("hash SignedInfo")?;
        let si = self
            .signed_info
            .as_mut()
            .ok_or_else(|| Error::State("signature is not loaded".into()))?;
        let env = ReferenceEnv::new(&self.ctx, self.node);
        si.references.hash(&mut self.doc, &env, self.ctx.interlocking)?;
        self.calculate_signed_info_hash()
    }

    pub fn signed_info_canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        self.require_loaded("canonicalize SignedInfo")?;
        self.signed_info()?.canonical_bytes(&self.doc)
    }

    /// A stream over canonical `<SignedInfo>`.
    pub fn signed_info_reader(&self) -> Result<Box<dyn Read + '_>, Error> {
        self.require_loaded("canonicalize SignedInfo")?;
        self.signed_info()?.canonical_reader(&self.doc)
    }

    /// The `<SignatureValue>` text, whitespace trimmed.
    pub fn signature_value(&self) -> Option<String> {
        self.signature_value_node
            .map(|n| self.doc.text_content(n).trim().to_owned())
    }

    pub fn references(&self) -> &[Reference] {
        self.signed_info
            .as_ref()
            .map(|si| si.references.references.as_slice())
            .unwrap_or(&[])
    }

    pub fn signature_method(&self) -> Option<&str> {
        self.signed_info.as_ref().map(|si| si.signature_method.as_str())
    }

    pub fn canonicalization_method(&self) -> Option<&str> {
        self.signed_info.as_ref().map(|si| si.c14n_method.as_str())
    }

    pub fn state(&self) -> SignatureState {
        self.state
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn report(&self) -> &VerifyReport {
        &self.report
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.report.messages()
    }

    pub fn context(&self) -> &DsigContext {
        &self.ctx
    }

    /// Hash manifests before the references pointing at them when signing.
    pub fn set_interlocking_references(&mut self, interlocking: bool) {
        self.ctx.interlocking = interlocking;
    }

    pub fn set_pretty_print(&mut self, pretty: bool) {
        self.ctx.pretty_print = pretty;
    }

    /// Use `prefix` for elements added from now on, declaring it on
    /// `<Signature>` if needed. Empty selects the default namespace.
    pub fn set_dsig_prefix(&mut self, prefix: &str) -> Result<(), Error> {
        if self.doc.lookup_namespace_uri(self.node, prefix) != Some(ns::DSIG) {
            self.doc.declare_namespace(self.node, prefix, ns::DSIG)?;
        }
        self.prefix = Some(prefix).filter(|p| !p.is_empty()).map(str::to_owned);
        Ok(())
    }

    pub fn register_id_attribute(&mut self, name: &str) {
        self.doc.register_id_attribute(name);
    }

    pub fn deregister_id_attribute(&mut self, name: &str) -> bool {
        self.doc.deregister_id_attribute(name)
    }

    /// Register an ID attribute by namespace URI and local name, whatever
    /// prefix it is written with.
    pub fn register_id_attribute_ns(&mut self, namespace_uri: &str, local_name: &str) {
        self.doc.register_id_attribute_ns(namespace_uri, local_name);
    }

    pub fn deregister_id_attribute_ns(&mut self, namespace_uri: &str, local_name: &str) -> bool {
        self.doc.deregister_id_attribute_ns(namespace_uri, local_name)
    }

    /// Toggle matching ID attributes by plain name (`Id`, `ID`, `id` and
    /// names from [`register_id_attribute`](Self::register_id_attribute)).
    pub fn set_id_by_attribute_name(&mut self, enabled: bool) {
        self.ctx.id_by_attribute_name = enabled;
        self.doc.set_id_by_attribute_name(enabled);
    }

    /// Prefix for XPath Filter 2.0 elements added from now on.
    pub fn set_xpf_prefix(&mut self, prefix: &str) {
        self.ctx.xpf_prefix = prefix.to_owned();
    }

    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    /// Mutable access for adding content, for example inside an `<Object>`.
    pub fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.doc
    }

    pub fn into_document(self) -> XmlDocument {
        self.doc
    }

    pub fn to_xml(&self) -> Result<String, Error> {
        self.doc.to_xml()
    }
}
