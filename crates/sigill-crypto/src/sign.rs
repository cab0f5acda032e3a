#![forbid(unsafe_code)]

//! Signature algorithm implementations (RSA PKCS#1 v1.5, RSA-PSS, ECDSA, HMAC).
//!
//! Every algorithm consumes its input as a stream. Public key algorithms
//! hash the stream and sign the prehash; HMAC feeds the stream to the MAC.

use std::io::Read;

use hmac::{Hmac, Mac};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use sigill_core::uri::{classify_signature_method, HashType, SignatureMethod};
use sigill_core::Error;

use crate::digest::{digest_reader, READ_CHUNK};

/// Key material for signature operations.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::SigningKey),
    EcP384Public(p384::ecdsa::VerifyingKey),
    Hmac(Vec<u8>),
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Rsa(_) => "Rsa",
            Self::RsaPublic(_) => "RsaPublic",
            Self::EcP256(_) => "EcP256",
            Self::EcP256Public(_) => "EcP256Public",
            Self::EcP384(_) => "EcP384",
            Self::EcP384Public(_) => "EcP384Public",
            Self::Hmac(_) => "Hmac",
        };
        f.write_str(kind)
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send {
    fn method(&self) -> SignatureMethod;
    fn hash(&self) -> HashType;
    fn sign(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error>;
    fn verify(&self, key: &SigningKey, input: &mut dyn Read, signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm for a (family, hash) pair.
///
/// `hmac_output_bits` truncates HMAC output; it is ignored by the public
/// key families.
pub fn signer(
    method: SignatureMethod,
    hash: HashType,
    hmac_output_bits: Option<u32>,
) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    match method {
        SignatureMethod::Rsa => Ok(Box::new(RsaPkcs1v15 { hash })),
        SignatureMethod::RsaPss => Ok(Box::new(RsaPss { hash })),
        SignatureMethod::Ecdsa => Ok(Box::new(Ecdsa { hash })),
        SignatureMethod::Hmac => Ok(Box::new(HmacSign {
            hash,
            output_bits: hmac_output_bits,
        })),
        SignatureMethod::Dsa => Err(Error::UnsupportedAlgorithm(format!(
            "DSA signatures (dsa-{})",
            hash.name()
        ))),
    }
}

/// Create a signature algorithm from its SignatureMethod URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    let (method, hash) = classify_signature_method(uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}")))?;
    signer(method, hash, None)
}

fn rsa_public(key: &SigningKey) -> Result<rsa::RsaPublicKey, Error> {
    match key {
        SigningKey::Rsa(pk) => Ok(pk.to_public_key()),
        SigningKey::RsaPublic(pk) => Ok(pk.clone()),
        _ => Err(Error::Key(format!("RSA key required, got {key:?}"))),
    }
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

struct RsaPkcs1v15 {
    hash: HashType,
}

fn pkcs1v15_scheme(hash: HashType) -> Result<rsa::Pkcs1v15Sign, Error> {
    match hash {
        HashType::Sha1 => Ok(rsa::Pkcs1v15Sign::new::<sha1::Sha1>()),
        HashType::Sha224 => Ok(rsa::Pkcs1v15Sign::new::<sha2::Sha224>()),
        HashType::Sha256 => Ok(rsa::Pkcs1v15Sign::new::<sha2::Sha256>()),
        HashType::Sha384 => Ok(rsa::Pkcs1v15Sign::new::<sha2::Sha384>()),
        HashType::Sha512 => Ok(rsa::Pkcs1v15Sign::new::<sha2::Sha512>()),
        other => Err(Error::UnsupportedAlgorithm(format!("rsa-{}", other.name()))),
    }
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn method(&self) -> SignatureMethod {
        SignatureMethod::Rsa
    }

    fn hash(&self) -> HashType {
        self.hash
    }

    fn sign(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required".into()));
        };
        let scheme = pkcs1v15_scheme(self.hash)?;
        let hashed = digest_reader(self.hash, input)?;
        private_key
            .sign(scheme, &hashed)
            .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
    }

    fn verify(&self, key: &SigningKey, input: &mut dyn Read, sig: &[u8]) -> Result<bool, Error> {
        let public_key = rsa_public(key)?;
        let scheme = pkcs1v15_scheme(self.hash)?;
        let hashed = digest_reader(self.hash, input)?;
        Ok(public_key.verify(scheme, &hashed, sig).is_ok())
    }
}

// ── RSA-PSS ──────────────────────────────────────────────────────────

struct RsaPss {
    hash: HashType,
}

fn pss_scheme(hash: HashType) -> Result<rsa::Pss, Error> {
    match hash {
        HashType::Sha1 => Ok(rsa::Pss::new::<sha1::Sha1>()),
        HashType::Sha224 => Ok(rsa::Pss::new::<sha2::Sha224>()),
        HashType::Sha256 => Ok(rsa::Pss::new::<sha2::Sha256>()),
        HashType::Sha384 => Ok(rsa::Pss::new::<sha2::Sha384>()),
        HashType::Sha512 => Ok(rsa::Pss::new::<sha2::Sha512>()),
        HashType::Sha3_224 => Ok(rsa::Pss::new::<sha3::Sha3_224>()),
        HashType::Sha3_256 => Ok(rsa::Pss::new::<sha3::Sha3_256>()),
        HashType::Sha3_384 => Ok(rsa::Pss::new::<sha3::Sha3_384>()),
        HashType::Sha3_512 => Ok(rsa::Pss::new::<sha3::Sha3_512>()),
        other => Err(Error::UnsupportedAlgorithm(format!("{}-rsa-MGF1", other.name()))),
    }
}

impl SignatureAlgorithm for RsaPss {
    fn method(&self) -> SignatureMethod {
        SignatureMethod::RsaPss
    }

    fn hash(&self) -> HashType {
        self.hash
    }

    fn sign(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required for PSS".into()));
        };
        let scheme = pss_scheme(self.hash)?;
        let hashed = digest_reader(self.hash, input)?;
        let mut rng = rand::thread_rng();
        private_key
            .sign_with_rng(&mut rng, scheme, &hashed)
            .map_err(|e| Error::Crypto(format!("RSA-PSS signing failed: {e}")))
    }

    fn verify(&self, key: &SigningKey, input: &mut dyn Read, sig: &[u8]) -> Result<bool, Error> {
        let public_key = rsa_public(key)?;
        let scheme = pss_scheme(self.hash)?;
        let hashed = digest_reader(self.hash, input)?;
        Ok(public_key.verify(scheme, &hashed, sig).is_ok())
    }
}

// ── ECDSA ────────────────────────────────────────────────────────────

/// ECDSA over P-256 or P-384, chosen by the key. The hash comes from the
/// SignatureMethod and is signed as a prehash.
struct Ecdsa {
    hash: HashType,
}

/// Convert XML-DSig ECDSA r||s to a typed Signature for P-256.
pub fn xmldsig_to_p256(rs: &[u8]) -> Result<p256::ecdsa::Signature, Error> {
    if rs.len() != 64 {
        return Err(Error::Crypto(format!(
            "P-256 signature must be 64 bytes, got {}",
            rs.len()
        )));
    }
    p256::ecdsa::Signature::from_slice(rs)
        .map_err(|e| Error::Crypto(format!("invalid P-256 signature: {e}")))
}

/// Convert XML-DSig ECDSA r||s to a typed Signature for P-384.
pub fn xmldsig_to_p384(rs: &[u8]) -> Result<p384::ecdsa::Signature, Error> {
    if rs.len() != 96 {
        return Err(Error::Crypto(format!(
            "P-384 signature must be 96 bytes, got {}",
            rs.len()
        )));
    }
    p384::ecdsa::Signature::from_slice(rs)
        .map_err(|e| Error::Crypto(format!("invalid P-384 signature: {e}")))
}

impl SignatureAlgorithm for Ecdsa {
    fn method(&self) -> SignatureMethod {
        SignatureMethod::Ecdsa
    }

    fn hash(&self) -> HashType {
        self.hash
    }

    fn sign(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
        let prehash = digest_reader(self.hash, input)?;
        let fail = |e: signature::Error| Error::Crypto(format!("ECDSA signing failed: {e}"));
        match key {
            SigningKey::EcP256(sk) => {
                let sig: p256::ecdsa::Signature = sk.sign_prehash(&prehash).map_err(fail)?;
                Ok(sig.to_bytes().to_vec())
            }
            SigningKey::EcP384(sk) => {
                let sig: p384::ecdsa::Signature = sk.sign_prehash(&prehash).map_err(fail)?;
                Ok(sig.to_bytes().to_vec())
            }
            _ => Err(Error::Key("EC private key required".into())),
        }
    }

    fn verify(&self, key: &SigningKey, input: &mut dyn Read, sig: &[u8]) -> Result<bool, Error> {
        let prehash = digest_reader(self.hash, input)?;
        let verify_p256 = |vk: &p256::ecdsa::VerifyingKey| -> Result<bool, Error> {
            let sig = xmldsig_to_p256(sig)?;
            Ok(vk.verify_prehash(&prehash, &sig).is_ok())
        };
        let verify_p384 = |vk: &p384::ecdsa::VerifyingKey| -> Result<bool, Error> {
            let sig = xmldsig_to_p384(sig)?;
            Ok(vk.verify_prehash(&prehash, &sig).is_ok())
        };
        match key {
            SigningKey::EcP256(sk) => verify_p256(sk.verifying_key()),
            SigningKey::EcP256Public(vk) => verify_p256(vk),
            SigningKey::EcP384(sk) => verify_p384(sk.verifying_key()),
            SigningKey::EcP384Public(vk) => verify_p384(vk),
            _ => Err(Error::Key("EC key required".into())),
        }
    }
}

// ── HMAC ─────────────────────────────────────────────────────────────

struct HmacSign {
    hash: HashType,
    output_bits: Option<u32>,
}

impl HmacSign {
    fn tag(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
        let SigningKey::Hmac(key_bytes) = key else {
            return Err(Error::Key("HMAC key required".into()));
        };
        let full = hmac(self.hash, key_bytes, input)?;
        match self.output_bits {
            None => Ok(full),
            Some(bits) => {
                let len = (bits / 8) as usize;
                if bits % 8 != 0 || len == 0 || len > full.len() {
                    return Err(Error::Crypto(format!(
                        "HMAC output length {bits} is not usable with hmac-{}",
                        self.hash.name()
                    )));
                }
                Ok(full[..len].to_vec())
            }
        }
    }
}

impl SignatureAlgorithm for HmacSign {
    fn method(&self) -> SignatureMethod {
        SignatureMethod::Hmac
    }

    fn hash(&self) -> HashType {
        self.hash
    }

    fn sign(&self, key: &SigningKey, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
        self.tag(key, input)
    }

    fn verify(&self, key: &SigningKey, input: &mut dyn Read, sig: &[u8]) -> Result<bool, Error> {
        let expected = self.tag(key, input)?;
        Ok(constant_time_eq(&expected, sig))
    }
}

/// Compute a full-length HMAC over a stream.
pub fn hmac(hash: HashType, key: &[u8], input: &mut dyn Read) -> Result<Vec<u8>, Error> {
    macro_rules! hmac_compute {
        ($hasher:ty) => {{
            let mut mac = <Hmac<$hasher> as Mac>::new_from_slice(key)
                .map_err(|e| Error::Key(format!("HMAC key: {e}")))?;
            let mut buf = [0u8; READ_CHUNK];
            loop {
                let n = input.read(&mut buf).map_err(Error::from_io)?;
                if n == 0 {
                    break;
                }
                mac.update(&buf[..n]);
            }
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }
    match hash {
        HashType::Sha1 => hmac_compute!(sha1::Sha1),
        HashType::Sha224 => hmac_compute!(sha2::Sha224),
        HashType::Sha256 => hmac_compute!(sha2::Sha256),
        HashType::Sha384 => hmac_compute!(sha2::Sha384),
        HashType::Sha512 => hmac_compute!(sha2::Sha512),
        other => Err(Error::UnsupportedAlgorithm(format!("hmac-{}", other.name()))),
    }
}

/// Compare two byte strings without an early exit. Lengths must match:
/// a shorter candidate is never accepted as a prefix.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
