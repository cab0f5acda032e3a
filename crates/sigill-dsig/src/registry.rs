#![forbid(unsafe_code)]

//! URI-keyed registry of algorithm handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sigill_core::algorithm;

use crate::handler::{AlgorithmHandler, DefaultHandler};

/// Digest URIs the default handler serves.
const DIGEST_URIS: &[&str] = &[
    algorithm::SHA1,
    algorithm::SHA224,
    algorithm::SHA256,
    algorithm::SHA384,
    algorithm::SHA512,
    algorithm::SHA3_224,
    algorithm::SHA3_256,
    algorithm::SHA3_384,
    algorithm::SHA3_512,
    algorithm::MD5,
    algorithm::RIPEMD160,
];

/// Signature URIs the default handler serves.
const SIGNATURE_URIS: &[&str] = &[
    algorithm::RSA_SHA1,
    algorithm::RSA_SHA224,
    algorithm::RSA_SHA256,
    algorithm::RSA_SHA384,
    algorithm::RSA_SHA512,
    algorithm::RSA_SHA256_11,
    algorithm::RSA_PSS_SHA1,
    algorithm::RSA_PSS_SHA224,
    algorithm::RSA_PSS_SHA256,
    algorithm::RSA_PSS_SHA384,
    algorithm::RSA_PSS_SHA512,
    algorithm::RSA_PSS_SHA3_256,
    algorithm::RSA_PSS_SHA3_512,
    algorithm::ECDSA_SHA1,
    algorithm::ECDSA_SHA224,
    algorithm::ECDSA_SHA256,
    algorithm::ECDSA_SHA384,
    algorithm::ECDSA_SHA512,
    algorithm::ECDSA_SHA256_11,
    algorithm::ECDSA_SHA3_256,
    algorithm::ECDSA_SHA3_384,
    algorithm::HMAC_SHA1,
    algorithm::HMAC_SHA224,
    algorithm::HMAC_SHA256,
    algorithm::HMAC_SHA384,
    algorithm::HMAC_SHA512,
];

/// Maps algorithm URIs to handlers.
///
/// Registration replaces any earlier handler for the same URI, so
/// applications can override a built-in algorithm. Lookup is read-only and
/// safe to share once registration is done.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn AlgorithmHandler>>,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`DefaultHandler`] bound to every built-in digest and
    /// signature URI.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let handler: Arc<dyn AlgorithmHandler> = Arc::new(DefaultHandler);
        for uri in DIGEST_URIS.iter().chain(SIGNATURE_URIS) {
            registry.register(uri, Arc::clone(&handler));
        }
        registry
    }

    /// Bind `uri` to `handler`. The last registration wins.
    pub fn register(&mut self, uri: &str, handler: Arc<dyn AlgorithmHandler>) {
        if self.handlers.insert(uri.to_owned(), handler).is_some() {
            tracing::debug!(uri, "replaced algorithm handler");
        }
    }

    pub fn lookup(&self, uri: &str) -> Option<Arc<dyn AlgorithmHandler>> {
        self.handlers.get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut uris: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        uris.sort_unstable();
        f.debug_struct("HandlerRegistry").field("uris", &uris).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::Error;
    use sigill_keys::Key;
    use sigill_transforms::TransformPipeline;
    use std::io::Read;

    struct Fixed(Vec<u8>);

    impl AlgorithmHandler for Fixed {
        fn append_hash_transform(&self, _: &mut TransformPipeline, _: &str) -> Result<(), Error> {
            Ok(())
        }

        fn append_signature_hash_transform(
            &self,
            _: &mut TransformPipeline,
            _: &str,
            _: Option<&Key>,
        ) -> Result<(), Error> {
            Ok(())
        }

        fn sign(&self, _: &mut dyn Read, _: &str, _: &Key, _: Option<u32>) -> Result<Vec<u8>, Error> {
            Ok(self.0.clone())
        }

        fn verify(
            &self,
            _: &mut dyn Read,
            _: &str,
            signature: &[u8],
            _: Option<u32>,
            _: &Key,
        ) -> Result<bool, Error> {
            Ok(signature == self.0)
        }
    }

    #[test]
    fn test_defaults_cover_builtin_uris() {
        let registry = HandlerRegistry::with_defaults();
        assert_eq!(registry.len(), DIGEST_URIS.len() + SIGNATURE_URIS.len());
        assert!(registry.lookup(algorithm::SHA256).is_some());
        assert!(registry.lookup(algorithm::HMAC_SHA1).is_some());
        assert!(registry.lookup(algorithm::DSA_SHA1).is_none());
        assert!(registry.lookup("urn:unknown").is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = HandlerRegistry::new();
        registry.register("urn:alg", Arc::new(Fixed(vec![1])));
        registry.register("urn:alg", Arc::new(Fixed(vec![2])));
        assert_eq!(registry.len(), 1);

        let handler = registry.lookup("urn:alg").unwrap();
        let key = Key::hmac(b"k");
        assert_eq!(handler.sign(&mut &b""[..], "urn:alg", &key, None).unwrap(), vec![2]);
    }
}
