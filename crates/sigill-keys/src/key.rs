#![forbid(unsafe_code)]

//! Key types and data structures.

use sigill_core::Error;
use sigill_crypto::sign::SigningKey;

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    EcP384 {
        private: Option<p384::ecdsa::SigningKey>,
        public: p384::ecdsa::VerifyingKey,
    },
    Hmac(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pair = |has_private: bool| if has_private { "private+public" } else { "public" };
        match self {
            Self::Rsa { private, .. } => write!(f, "RSA {} key", pair(private.is_some())),
            Self::EcP256 { private, .. } => write!(f, "EC P-256 {} key", pair(private.is_some())),
            Self::EcP384 { private, .. } => write!(f, "EC P-384 {} key", pair(private.is_some())),
            Self::Hmac(k) => write!(f, "HMAC key ({} bytes)", k.len()),
        }
    }
}

/// A named key with associated data.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name for key lookup.
    pub name: Option<String>,
    pub data: KeyData,
    pub usage: KeyUsage,
    /// X.509 certificate chain (DER-encoded), leaf first.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// An HMAC key from raw bytes.
    pub fn hmac(secret: &[u8]) -> Self {
        Self::new(KeyData::Hmac(secret.to_vec()), KeyUsage::Any)
    }

    /// Convert to a `SigningKey` for use with crypto algorithms. Keys
    /// holding a private half yield the private form.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::EcP256 { private: Some(sk), .. } => SigningKey::EcP256(sk.clone()),
            KeyData::EcP256 { public, .. } => SigningKey::EcP256Public(*public),
            KeyData::EcP384 { private: Some(sk), .. } => SigningKey::EcP384(sk.clone()),
            KeyData::EcP384 { public, .. } => SigningKey::EcP384Public(*public),
            KeyData::Hmac(k) => SigningKey::Hmac(k.clone()),
        }
    }

    /// The public-only form of this key, for verification.
    pub fn to_public(&self) -> Result<Key, Error> {
        let data = match &self.data {
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::EcP256 { public, .. } => KeyData::EcP256 {
                private: None,
                public: *public,
            },
            KeyData::EcP384 { public, .. } => KeyData::EcP384 {
                private: None,
                public: *public,
            },
            KeyData::Hmac(_) => {
                return Err(Error::Key("an HMAC key has no public form".into()));
            }
        };
        Ok(Key {
            name: self.name.clone(),
            data,
            usage: KeyUsage::Verify,
            x509_chain: self.x509_chain.clone(),
        })
    }

    pub fn has_private(&self) -> bool {
        matches!(
            &self.data,
            KeyData::Rsa { private: Some(_), .. }
                | KeyData::EcP256 { private: Some(_), .. }
                | KeyData::EcP384 { private: Some(_), .. }
                | KeyData::Hmac(_)
        )
    }

    /// Get the RSA public key if available.
    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    /// Get the raw symmetric key bytes.
    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Hmac(k) => Some(k),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_conversion() {
        let sk = p256::ecdsa::SigningKey::from_slice(&[3u8; 32]).unwrap();
        let key = Key::new(
            KeyData::EcP256 {
                public: *sk.verifying_key(),
                private: Some(sk),
            },
            KeyUsage::Any,
        )
        .with_name("ec");
        assert!(key.has_private());
        assert!(matches!(key.to_signing_key(), SigningKey::EcP256(_)));

        let public = key.to_public().unwrap();
        assert_eq!(public.name.as_deref(), Some("ec"));
        assert!(!public.has_private());
        assert!(matches!(public.to_signing_key(), SigningKey::EcP256Public(_)));
    }

    #[test]
    fn test_hmac_key() {
        let key = Key::hmac(b"secret");
        assert_eq!(key.symmetric_key_bytes(), Some(&b"secret"[..]));
        assert!(key.to_public().is_err());
        assert_eq!(format!("{:?}", key.data), "HMAC key (6 bytes)");
    }
}
