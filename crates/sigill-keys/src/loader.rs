#![forbid(unsafe_code)]

//! Key loading from PEM and DER (PKCS#8, PKCS#1, SEC1, SPKI, X.509) and
//! raw HMAC secrets.

use std::path::Path;

use der::{Decode, Encode};
use pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use pkcs8::DecodePrivateKey;
use spki::DecodePublicKey;

use sigill_core::Error;

use crate::key::{Key, KeyData, KeyUsage};

fn rsa_private(pk: rsa::RsaPrivateKey) -> Key {
    let public = pk.to_public_key();
    Key::new(
        KeyData::Rsa {
            private: Some(pk),
            public,
        },
        KeyUsage::Any,
    )
}

fn rsa_public(public: rsa::RsaPublicKey) -> Key {
    Key::new(KeyData::Rsa { private: None, public }, KeyUsage::Verify)
}

fn p256_private(sk: p256::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(
        KeyData::EcP256 {
            private: Some(sk),
            public,
        },
        KeyUsage::Any,
    )
}

fn p384_private(sk: p384::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(
        KeyData::EcP384 {
            private: Some(sk),
            public,
        },
        KeyUsage::Any,
    )
}

/// Load an HMAC key from raw binary data.
pub fn load_hmac_key(data: &[u8]) -> Key {
    Key::hmac(data)
}

/// Load a private key from PKCS#8 DER. Tries RSA, then P-256, then P-384.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<Key, Error> {
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(rsa_private(pk));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p256_private(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p384_private(sk));
    }
    Err(Error::Key(
        "unable to parse PKCS#8 private key (tried RSA, P-256, P-384)".into(),
    ))
}

/// Load an EC private key from SEC1 DER (`EC PRIVATE KEY`).
pub fn load_ec_private_sec1_der(der: &[u8]) -> Result<Key, Error> {
    if let Ok(secret) = p256::SecretKey::from_sec1_der(der) {
        return Ok(p256_private(p256::ecdsa::SigningKey::from(secret)));
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_der(der) {
        return Ok(p384_private(p384::ecdsa::SigningKey::from(secret)));
    }
    Err(Error::Key("unable to parse SEC1 EC private key".into()))
}

/// Load a key from raw SubjectPublicKeyInfo DER bytes.
pub fn load_spki_der(spki_der: &[u8]) -> Result<Key, Error> {
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        return Ok(rsa_public(pk));
    }
    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(
            KeyData::EcP256 {
                private: None,
                public: vk,
            },
            KeyUsage::Verify,
        ));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(
            KeyData::EcP384 {
                private: None,
                public: vk,
            },
            KeyUsage::Verify,
        ));
    }
    Err(Error::Key("unsupported public key algorithm in SPKI".into()))
}

/// Load the public key of a DER-encoded X.509 certificate. The
/// certificate becomes the key's chain.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    let cert = x509_cert::Certificate::from_der(data)
        .map_err(|e| Error::Key(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;
    let mut key = load_spki_der(&spki_der)?;
    key.x509_chain = vec![data.to_vec()];
    Ok(key)
}

/// Load a key from PEM, dispatching on the PEM label.
pub fn load_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let text = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;
    let (label, der_bytes) = der::pem::decode_vec(text.trim().as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode PEM: {e}")))?;
    match label {
        "PRIVATE KEY" => load_private_key_pkcs8_der(&der_bytes),
        "RSA PRIVATE KEY" => rsa::RsaPrivateKey::from_pkcs1_der(&der_bytes)
            .map(rsa_private)
            .map_err(|e| Error::Key(format!("failed to parse RSA private key: {e}"))),
        "EC PRIVATE KEY" => load_ec_private_sec1_der(&der_bytes),
        "PUBLIC KEY" => load_spki_der(&der_bytes),
        "RSA PUBLIC KEY" => rsa::RsaPublicKey::from_pkcs1_der(&der_bytes)
            .map(rsa_public)
            .map_err(|e| Error::Key(format!("failed to parse RSA public key: {e}"))),
        "CERTIFICATE" => load_x509_cert_der(&der_bytes),
        other => Err(Error::Key(format!("unsupported PEM label: {other}"))),
    }
}

/// Load a key from DER, trying private key, public key and certificate
/// encodings in turn.
pub fn load_der(data: &[u8]) -> Result<Key, Error> {
    if let Ok(key) = load_private_key_pkcs8_der(data) {
        return Ok(key);
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(data) {
        return Ok(rsa_private(pk));
    }
    if let Ok(key) = load_spki_der(data) {
        return Ok(key);
    }
    load_x509_cert_der(data)
        .map_err(|_| Error::Key("unable to detect DER key format".into()))
}

/// Load a key from a file, auto-detecting PEM or DER.
pub fn load_key_file(path: &Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let result = if data.starts_with(b"-----BEGIN") {
        load_pem(&data)
    } else {
        load_der(&data)
    };
    result.map_err(|e| Error::Key(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    fn p256_signing_key() -> p256::ecdsa::SigningKey {
        p256::ecdsa::SigningKey::from_slice(&[5u8; 32]).unwrap()
    }

    #[test]
    fn test_pkcs8_pem_and_der() {
        let sk = p256_signing_key();
        let pem = sk.to_pkcs8_pem(LineEnding::LF).unwrap();
        let key = load_pem(pem.as_bytes()).unwrap();
        assert!(matches!(key.data, KeyData::EcP256 { private: Some(_), .. }));

        let der = sk.to_pkcs8_der().unwrap();
        let key = load_der(der.as_bytes()).unwrap();
        assert!(key.has_private());
    }

    #[test]
    fn test_spki_pem_is_public() {
        let vk = *p256_signing_key().verifying_key();
        let pem = vk.to_public_key_pem(LineEnding::LF).unwrap();
        let key = load_pem(pem.as_bytes()).unwrap();
        assert!(matches!(key.data, KeyData::EcP256 { private: None, .. }));
        assert_eq!(key.usage, KeyUsage::Verify);
    }

    #[test]
    fn test_unknown_label_and_garbage() {
        let pem = "-----BEGIN NOTHING-----\nAAAA\n-----END NOTHING-----\n";
        assert!(matches!(load_pem(pem.as_bytes()), Err(Error::Key(_))));
        assert!(load_der(b"not a key").is_err());
    }

    #[test]
    fn test_key_file() {
        let path = std::env::temp_dir().join(format!("sigill-key-{}.pem", std::process::id()));
        let pem = p256_signing_key().to_pkcs8_pem(LineEnding::LF).unwrap();
        std::fs::write(&path, pem.as_bytes()).unwrap();
        let key = load_key_file(&path).unwrap();
        assert!(key.has_private());
        std::fs::remove_file(&path).unwrap();
    }
}
