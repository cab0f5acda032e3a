#![forbid(unsafe_code)]

//! Key manager with named key store.

use sigill_core::Error;

use crate::key::{Key, KeyData};

/// An in-memory collection of keys consulted during signature processing.
#[derive(Debug, Clone, Default)]
pub struct KeysManager {
    keys: Vec<Key>,
}

impl KeysManager {
    /// Create an empty keys manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the manager.
    pub fn add_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// Insert a key at the front (takes priority for `first_key`).
    pub fn insert_key_first(&mut self, key: Key) {
        self.keys.insert(0, key);
    }

    /// Find a key by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.as_deref() == Some(name))
    }

    /// Find the key whose leaf certificate is `cert_der`.
    pub fn find_by_certificate(&self, cert_der: &[u8]) -> Option<&Key> {
        self.keys
            .iter()
            .find(|k| k.x509_chain.first().is_some_and(|c| c.as_slice() == cert_der))
    }

    /// Find the first RSA key with the given public modulus and exponent.
    pub fn find_rsa_by_components(&self, public: &rsa::RsaPublicKey) -> Option<&Key> {
        self.keys.iter().find(|k| match &k.data {
            KeyData::Rsa { public: p, .. } => p == public,
            _ => false,
        })
    }

    /// Find the first HMAC key.
    pub fn find_hmac(&self) -> Option<&Key> {
        self.keys.iter().find(|k| matches!(&k.data, KeyData::Hmac(_)))
    }

    /// Iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Get the first key available (for simple single-key scenarios).
    pub fn first_key(&self) -> Result<&Key, Error> {
        self.keys
            .first()
            .ok_or_else(|| Error::KeyNotFound("no keys in manager".into()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        let mut manager = KeysManager::new();
        assert!(matches!(manager.first_key(), Err(Error::KeyNotFound(_))));

        manager.add_key(Key::hmac(b"one").with_name("a"));
        manager.insert_key_first(Key::hmac(b"two").with_name("b"));
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.first_key().unwrap().name.as_deref(), Some("b"));
        assert_eq!(
            manager.find_by_name("a").unwrap().symmetric_key_bytes(),
            Some(&b"one"[..])
        );
        assert!(manager.find_by_name("c").is_none());
        assert!(manager.find_hmac().is_some());
    }
}
