#![forbid(unsafe_code)]

//! Turning KeyInfo descriptors into keys.

use sigill_core::Error;

use crate::key::Key;
use crate::keyinfo::{rsa_key_from_value, KeyInfoItem, KeyInfoList};
use crate::loader::load_x509_cert_der;
use crate::manager::KeysManager;

/// Resolves the key a `<KeyInfo>` describes.
pub trait KeyInfoResolver: Send + Sync {
    /// Produce the verification key. Failure is `KeyNotFound`.
    fn resolve_key(&self, key_info: &KeyInfoList) -> Result<Key, Error>;
}

/// Resolves against a [`KeysManager`]: a named key first, then an inline
/// RSA key value, then an inline certificate, then the manager's first key.
///
/// Inline `KeyValue` and `X509Certificate` keys are used as found. Nothing
/// checks them against the manager or a certificate chain, so a document
/// signed with any embedded key verifies. Callers that need a trust policy
/// must check the key afterwards or supply their own [`KeyInfoResolver`].
#[derive(Debug, Clone, Default)]
pub struct KeysManagerResolver {
    manager: KeysManager,
}

impl KeysManagerResolver {
    pub fn new(manager: KeysManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &KeysManager {
        &self.manager
    }
}

impl KeyInfoResolver for KeysManagerResolver {
    fn resolve_key(&self, key_info: &KeyInfoList) -> Result<Key, Error> {
        for name in key_info.key_names() {
            if let Some(key) = self.manager.find_by_name(name) {
                tracing::debug!(key_name = name, "resolved key by name");
                return Ok(key.clone());
            }
        }

        for item in &key_info.items {
            if let KeyInfoItem::RsaKeyValue { modulus, exponent } = item {
                let key = rsa_key_from_value(modulus, exponent)?;
                tracing::debug!("resolved inline RSA key value");
                return Ok(key);
            }
        }

        for item in &key_info.items {
            if let KeyInfoItem::X509Data(data) = item {
                for cert in &data.certificates {
                    if let Some(key) = self.manager.find_by_certificate(cert) {
                        return Ok(key.clone());
                    }
                    if let Ok(key) = load_x509_cert_der(cert) {
                        tracing::debug!("resolved key from inline certificate");
                        return Ok(key);
                    }
                }
            }
        }

        self.manager
            .first_key()
            .cloned()
            .map_err(|_| Error::KeyNotFound("no key matches the KeyInfo descriptors".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyData;

    #[test]
    fn test_name_beats_first_key() {
        let mut manager = KeysManager::new();
        manager.add_key(Key::hmac(b"first").with_name("x"));
        manager.add_key(Key::hmac(b"second").with_name("y"));
        let resolver = KeysManagerResolver::new(manager);

        let mut info = KeyInfoList::new();
        info.items.push(KeyInfoItem::KeyName("y".into()));
        let key = resolver.resolve_key(&info).unwrap();
        assert_eq!(key.symmetric_key_bytes(), Some(&b"second"[..]));

        let fallback = resolver.resolve_key(&KeyInfoList::new()).unwrap();
        assert_eq!(fallback.symmetric_key_bytes(), Some(&b"first"[..]));
    }

    #[test]
    fn test_inline_rsa_value() {
        let resolver = KeysManagerResolver::default();
        let mut info = KeyInfoList::new();
        info.items.push(KeyInfoItem::RsaKeyValue {
            modulus: vec![0xc5; 128],
            exponent: vec![1, 0, 1],
        });
        let key = resolver.resolve_key(&info).unwrap();
        assert!(matches!(key.data, KeyData::Rsa { private: None, .. }));
    }

    #[test]
    fn test_inline_key_wins_over_managed_key() {
        let mut manager = KeysManager::new();
        manager.add_key(Key::hmac(b"managed"));
        let resolver = KeysManagerResolver::new(manager);
        let mut info = KeyInfoList::new();
        info.items.push(KeyInfoItem::RsaKeyValue {
            modulus: vec![0xc5; 128],
            exponent: vec![1, 0, 1],
        });
        // The embedded key is returned even though the manager never saw it.
        let key = resolver.resolve_key(&info).unwrap();
        assert!(matches!(key.data, KeyData::Rsa { .. }));
    }

    #[test]
    fn test_nothing_resolves() {
        let resolver = KeysManagerResolver::default();
        let mut info = KeyInfoList::new();
        info.items.push(KeyInfoItem::KeyName("nobody".into()));
        assert!(matches!(
            resolver.resolve_key(&info),
            Err(Error::KeyNotFound(_))
        ));
    }
}
