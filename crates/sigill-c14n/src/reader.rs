#![forbid(unsafe_code)]

//! Pull-based canonicalization.
//!
//! [`C14nReader`] walks the tree with an explicit stack and renders one node
//! per refill, so the canonical form is produced only as fast as the
//! consumer reads it and never exists in full.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Read};
use std::rc::Rc;

use sigill_core::{CanonicalizationMethod, Error};
use sigill_xml::{NodeId, NodeKind, NodeSet, XmlDocument};

use crate::escape;
use crate::render::Attr;
use crate::{exclusive, inclusive};

type Bindings = Rc<BTreeMap<String, String>>;

enum Step {
    Enter(NodeId, Bindings),
    Close(String),
}

struct Canonicalizer<'a> {
    doc: Cow<'a, XmlDocument>,
    method: CanonicalizationMethod,
    node_set: Option<NodeSet>,
    inclusive_prefixes: HashSet<String>,
}

impl Canonicalizer<'_> {
    fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.as_ref().map_or(true, |set| set.contains(id))
    }

    fn render(&self, step: Step, stack: &mut Vec<Step>, out: &mut Vec<u8>) -> Result<(), Error> {
        let (id, bindings) = match step {
            Step::Close(name) => {
                out.extend_from_slice(b"</");
                out.extend_from_slice(name.as_bytes());
                out.push(b'>');
                return Ok(());
            }
            Step::Enter(id, bindings) => (id, bindings),
        };
        let doc: &XmlDocument = &self.doc;
        let kind = doc
            .node_kind(id)
            .ok_or_else(|| Error::Canonicalization(format!("node {} does not exist", id.index())))?;

        match kind {
            NodeKind::Document => push_children(doc, id, &bindings, stack),
            NodeKind::Element(element) => {
                if !self.is_visible(id) {
                    push_children(doc, id, &bindings, stack);
                    return Ok(());
                }

                let (decls, child_bindings) = if self.method.is_exclusive() {
                    exclusive::namespace_axis(doc, id, &bindings, &self.inclusive_prefixes)
                } else {
                    inclusive::namespace_axis(doc, id, &bindings)
                };

                let mut attrs = Attr::collect(element);
                if self.node_set.is_some() && !self.method.is_exclusive() {
                    let parent_visible = doc
                        .parent(id)
                        .is_some_and(|p| doc.is_element(p) && self.is_visible(p));
                    if !parent_visible {
                        let extra = inclusive::inherited_xml_attrs(doc, id, &attrs, self.method.is_11());
                        attrs.extend(extra);
                    }
                }
                attrs.sort();

                let name = element.name.prefixed_name().into_owned();
                out.push(b'<');
                out.extend_from_slice(name.as_bytes());
                for d in &decls {
                    d.write(out);
                }
                for a in &attrs {
                    a.write(out);
                }
                out.push(b'>');

                stack.push(Step::Close(name));
                push_children(doc, id, &Rc::new(child_bindings), stack);
            }
            NodeKind::Text(text) | NodeKind::CData(text) => {
                if self.is_visible(id) {
                    escape::push_text(out, text);
                }
            }
            NodeKind::Comment(text) => {
                if self.method.with_comments() && self.is_visible(id) {
                    let (before, after) = document_level_breaks(doc, id);
                    if before {
                        out.push(b'\n');
                    }
                    out.extend_from_slice(b"<!--");
                    out.extend_from_slice(text.as_bytes());
                    out.extend_from_slice(b"-->");
                    if after {
                        out.push(b'\n');
                    }
                }
            }
            NodeKind::ProcessingInstruction(pi) => {
                if self.is_visible(id) {
                    let (before, after) = document_level_breaks(doc, id);
                    if before {
                        out.push(b'\n');
                    }
                    out.extend_from_slice(b"<?");
                    out.extend_from_slice(pi.target.as_bytes());
                    if let Some(data) = pi.data.as_deref().filter(|d| !d.is_empty()) {
                        out.push(b' ');
                        escape::push_pi(out, data);
                    }
                    out.extend_from_slice(b"?>");
                    if after {
                        out.push(b'\n');
                    }
                }
            }
            NodeKind::Attribute(..) => {}
        }
        Ok(())
    }
}

fn push_children(doc: &XmlDocument, id: NodeId, bindings: &Bindings, stack: &mut Vec<Step>) {
    for child in doc.children(id).iter().rev() {
        stack.push(Step::Enter(*child, Rc::clone(bindings)));
    }
}

/// Comments and PIs outside the document element are separated from it by
/// a line break: after the node if the element follows, before it if the
/// element precedes.
fn document_level_breaks(doc: &XmlDocument, id: NodeId) -> (bool, bool) {
    let Some(parent) = doc.parent(id) else {
        return (false, false);
    };
    if parent != doc.root() {
        return (false, false);
    }
    let siblings = doc.children(parent);
    let Some(pos) = siblings.iter().position(|c| *c == id) else {
        return (false, false);
    };
    let before = siblings[..pos].iter().any(|c| doc.is_element(*c));
    let after = siblings[pos + 1..].iter().any(|c| doc.is_element(*c));
    (before, after)
}

/// A `Read` adapter producing the canonical form of a document or node set.
pub struct C14nReader<'a> {
    canon: Canonicalizer<'a>,
    stack: Vec<Step>,
    buf: Vec<u8>,
    pos: usize,
}

impl<'a> C14nReader<'a> {
    /// Canonicalize `doc`, restricted to `node_set` when given.
    /// `inclusive_prefixes` is the InclusiveNamespaces PrefixList and only
    /// matters for exclusive canonicalization.
    pub fn new(
        doc: Cow<'a, XmlDocument>,
        method: CanonicalizationMethod,
        node_set: Option<NodeSet>,
        inclusive_prefixes: &[String],
    ) -> Self {
        let root = doc.root();
        Self {
            canon: Canonicalizer {
                doc,
                method,
                node_set,
                inclusive_prefixes: inclusive_prefixes.iter().cloned().collect(),
            },
            stack: vec![Step::Enter(root, Rc::new(BTreeMap::new()))],
            buf: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for C14nReader<'_> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.buf.len() {
            let Some(step) = self.stack.pop() else {
                return Ok(0);
            };
            self.buf.clear();
            self.pos = 0;
            self.canon
                .render(step, &mut self.stack, &mut self.buf)
                .map_err(Error::into_io)?;
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
