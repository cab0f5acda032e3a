#![forbid(unsafe_code)]

//! DSig context: configuration shared by signature operations.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use sigill_core::ns;
use sigill_transforms::{FileUriResolver, UriResolver};

use crate::registry::HandlerRegistry;

/// HMAC outputs shorter than this are never accepted.
pub const HMAC_MIN_OUTPUT_BITS: u32 = 80;

/// Default nesting limit for manifests referencing manifests.
pub const DEFAULT_MAX_MANIFEST_DEPTH: usize = 8;

/// Context for XML-DSig operations.
#[derive(Clone)]
pub struct DsigContext {
    /// Handlers for digest and signature algorithm URIs.
    pub registry: HandlerRegistry,
    /// Additional ID attribute names to register.
    pub id_attrs: Vec<String>,
    /// Additional ID attributes matched by namespace URI and local name.
    pub id_attrs_ns: Vec<(String, String)>,
    /// Match ID attributes by qualified name. When off, only namespaced
    /// registrations and `xml:id` identify elements.
    pub id_by_attribute_name: bool,
    /// URL-to-file mappings for external URI resolution.
    pub url_maps: Vec<(String, String)>,
    /// Base directory for resolving relative external URI references.
    pub base_dir: Option<String>,
    /// Replaces the file resolver built from `url_maps` and `base_dir`.
    pub uri_resolver: Option<Arc<dyn UriResolver>>,
    /// Minimum HMAC output length in bits (0 = only the built-in floor).
    pub hmac_min_out_len: u32,
    /// Hash manifests before the references that point at them.
    pub interlocking: bool,
    pub max_manifest_depth: usize,
    /// Prefix for the DSig namespace in signatures built from scratch;
    /// empty means the default namespace.
    pub dsig_prefix: String,
    /// Prefix for XPath Filter 2.0 `<XPath>` elements.
    pub xpf_prefix: String,
    /// Put line breaks around synthesized elements.
    pub pretty_print: bool,
    /// Log pre-digest and pre-signature data at debug level.
    pub debug: bool,
}

impl DsigContext {
    /// Create a context with the default algorithm handlers.
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::with_defaults(),
            id_attrs: Vec::new(),
            id_attrs_ns: Vec::new(),
            id_by_attribute_name: true,
            url_maps: Vec::new(),
            base_dir: None,
            uri_resolver: None,
            hmac_min_out_len: 0,
            interlocking: false,
            max_manifest_depth: DEFAULT_MAX_MANIFEST_DEPTH,
            dsig_prefix: ns::DEFAULT_DSIG_PREFIX.to_owned(),
            xpf_prefix: ns::DEFAULT_XPATH2_PREFIX.to_owned(),
            pretty_print: true,
            debug: false,
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    pub fn add_id_attr_ns(&mut self, namespace_uri: &str, local_name: &str) {
        self.id_attrs_ns
            .push((namespace_uri.to_owned(), local_name.to_owned()));
    }

    /// Map an external URI to a local file path.
    pub fn add_url_map(&mut self, url: &str, file_path: &str) {
        self.url_maps.push((url.to_owned(), file_path.to_owned()));
    }

    /// The effective HMAC output floor in bits.
    pub fn hmac_floor(&self) -> u32 {
        self.hmac_min_out_len.max(HMAC_MIN_OUTPUT_BITS)
    }

    /// The resolver for external references.
    pub fn uri_resolver(&self) -> Arc<dyn UriResolver> {
        if let Some(resolver) = &self.uri_resolver {
            return Arc::clone(resolver);
        }
        let maps: HashMap<String, PathBuf> = self
            .url_maps
            .iter()
            .map(|(url, path)| (url.clone(), PathBuf::from(path)))
            .collect();
        Arc::new(FileUriResolver::new(self.base_dir.as_ref().map(PathBuf::from), maps))
    }
}

impl Default for DsigContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::algorithm;

    #[test]
    fn test_defaults() {
        let ctx = DsigContext::new();
        assert_eq!(ctx.hmac_floor(), 80);
        assert_eq!(ctx.max_manifest_depth, DEFAULT_MAX_MANIFEST_DEPTH);
        assert_eq!(ctx.dsig_prefix, "ds");
        assert_eq!(ctx.xpf_prefix, "dsig-xpath");
        assert!(ctx.id_by_attribute_name);
        assert!(ctx.registry.lookup(algorithm::RSA_SHA256).is_some());
    }

    #[test]
    fn test_hmac_floor_respects_configured_minimum() {
        let mut ctx = DsigContext::new();
        ctx.hmac_min_out_len = 40;
        assert_eq!(ctx.hmac_floor(), 80);
        ctx.hmac_min_out_len = 160;
        assert_eq!(ctx.hmac_floor(), 160);
    }
}
