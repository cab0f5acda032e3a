#![forbid(unsafe_code)]

//! Classification of algorithm identifier URIs.
//!
//! Every function here is pure and total: an unknown URI yields `None`,
//! never an error. Callers decide whether an unclassified URI is fatal.
//!
//! Signature method URIs are decomposed structurally instead of being
//! looked up in a table of every (family, hash) pair. The legacy URIs of
//! the original DSig namespace are matched whole first; anything else must
//! live under one of the extension bases, which are stripped together with
//! the family prefix (`rsa-`, `ecdsa-`, ...) so that the remainder can be
//! read as a hash name.

use crate::algorithm;

// ── Hash types ───────────────────────────────────────────────────────

/// A message digest function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Md5,
    Ripemd160,
}

impl HashType {
    /// Map a bare hash name (`"sha256"`, `"sha3-384"`, ...) to a hash type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(Self::Sha1),
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            "sha3-224" => Some(Self::Sha3_224),
            "sha3-256" => Some(Self::Sha3_256),
            "sha3-384" => Some(Self::Sha3_384),
            "sha3-512" => Some(Self::Sha3_512),
            "md5" => Some(Self::Md5),
            "ripemd160" => Some(Self::Ripemd160),
            _ => None,
        }
    }

    /// The bare hash name, the inverse of [`HashType::from_name`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Md5 => "md5",
            Self::Ripemd160 => "ripemd160",
        }
    }

    /// The DigestMethod URI for this hash.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
            Self::Sha3_224 => algorithm::SHA3_224,
            Self::Sha3_256 => algorithm::SHA3_256,
            Self::Sha3_384 => algorithm::SHA3_384,
            Self::Sha3_512 => algorithm::SHA3_512,
            Self::Md5 => algorithm::MD5,
            Self::Ripemd160 => algorithm::RIPEMD160,
        }
    }

    /// Digest output size in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 | Self::Ripemd160 => 20,
            Self::Sha224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }
}

/// Classify a DigestMethod URI.
pub fn classify_hash(uri: &str) -> Option<HashType> {
    match uri {
        algorithm::SHA1 => Some(HashType::Sha1),
        algorithm::SHA224 => Some(HashType::Sha224),
        algorithm::SHA256 => Some(HashType::Sha256),
        algorithm::SHA384 => Some(HashType::Sha384),
        algorithm::SHA512 => Some(HashType::Sha512),
        algorithm::SHA3_224 => Some(HashType::Sha3_224),
        algorithm::SHA3_256 => Some(HashType::Sha3_256),
        algorithm::SHA3_384 => Some(HashType::Sha3_384),
        algorithm::SHA3_512 => Some(HashType::Sha3_512),
        algorithm::MD5 => Some(HashType::Md5),
        algorithm::RIPEMD160 => Some(HashType::Ripemd160),
        _ => None,
    }
}

// ── Signature methods ────────────────────────────────────────────────

/// The public key or MAC family of a SignatureMethod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureMethod {
    Rsa,
    RsaPss,
    Dsa,
    Ecdsa,
    Hmac,
}

impl SignatureMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::RsaPss => "rsa-pss",
            Self::Dsa => "dsa",
            Self::Ecdsa => "ecdsa",
            Self::Hmac => "hmac",
        }
    }
}

/// Namespaces that carry `<family>-<hash>` signature method URIs.
const EXTENSION_BASES: &[&str] = &[
    "http://www.w3.org/2001/04/xmldsig-more#",
    "http://www.w3.org/2009/xmldsig11#",
    "http://www.w3.org/2007/05/xmldsig-more#",
    "http://www.w3.org/2021/04/xmldsig-more#",
];

const FAMILY_PREFIXES: &[(&str, SignatureMethod)] = &[
    ("rsa-", SignatureMethod::Rsa),
    ("dsa-", SignatureMethod::Dsa),
    ("ecdsa-", SignatureMethod::Ecdsa),
    ("hmac-", SignatureMethod::Hmac),
];

/// RSA-PSS URIs put the hash first: `sha256-rsa-MGF1`.
const PSS_SUFFIX: &str = "-rsa-MGF1";

/// Decompose a SignatureMethod URI into its family and hash.
pub fn classify_signature_method(uri: &str) -> Option<(SignatureMethod, HashType)> {
    match uri {
        algorithm::RSA_SHA1 => return Some((SignatureMethod::Rsa, HashType::Sha1)),
        algorithm::DSA_SHA1 => return Some((SignatureMethod::Dsa, HashType::Sha1)),
        algorithm::HMAC_SHA1 => return Some((SignatureMethod::Hmac, HashType::Sha1)),
        _ => {}
    }

    let rest = strip_any(uri, EXTENSION_BASES)?;

    if let Some(hash) = rest.strip_suffix(PSS_SUFFIX) {
        return HashType::from_name(hash).map(|h| (SignatureMethod::RsaPss, h));
    }

    FAMILY_PREFIXES.iter().find_map(|(prefix, method)| {
        rest.strip_prefix(prefix)
            .and_then(HashType::from_name)
            .map(|h| (*method, h))
    })
}

// ── Canonicalization ─────────────────────────────────────────────────

/// A canonicalization algorithm: {inclusive | exclusive} x {1.0 | 1.1}
/// x {with | without comments}. Exclusive C14N has no 1.1 variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalizationMethod {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Canonical XML 1.1
    Inclusive11,
    /// Canonical XML 1.1 with comments
    Inclusive11WithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl CanonicalizationMethod {
    /// The algorithm URI for this method.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Inclusive11 => algorithm::C14N11,
            Self::Inclusive11WithComments => algorithm::C14N11_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments | Self::Inclusive11WithComments | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    pub fn is_11(&self) -> bool {
        matches!(self, Self::Inclusive11 | Self::Inclusive11WithComments)
    }
}

/// Classify a canonicalization (CanonicalizationMethod or Transform) URI.
pub fn classify_canonicalization(uri: &str) -> Option<CanonicalizationMethod> {
    match uri {
        algorithm::C14N => Some(CanonicalizationMethod::Inclusive),
        algorithm::C14N_WITH_COMMENTS => Some(CanonicalizationMethod::InclusiveWithComments),
        algorithm::C14N11 => Some(CanonicalizationMethod::Inclusive11),
        algorithm::C14N11_WITH_COMMENTS => Some(CanonicalizationMethod::Inclusive11WithComments),
        algorithm::EXC_C14N => Some(CanonicalizationMethod::Exclusive),
        algorithm::EXC_C14N_WITH_COMMENTS => Some(CanonicalizationMethod::ExclusiveWithComments),
        _ => None,
    }
}

// ── Mask generation and key wrap ─────────────────────────────────────

/// A mask generation function, as used by RSA-OAEP and RSA-PSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskGenerationFunction {
    Mgf1(HashType),
}

const MGF1_BASE: &str = "http://www.w3.org/2009/xmlenc11#mgf1";

pub fn classify_mask_generation_function(uri: &str) -> Option<MaskGenerationFunction> {
    uri.strip_prefix(MGF1_BASE)
        .and_then(HashType::from_name)
        .map(MaskGenerationFunction::Mgf1)
}

/// A symmetric key wrap algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyWrapMethod {
    Aes { key_bits: u16, padded: bool },
    TripleDes,
}

pub fn classify_key_wrap(uri: &str) -> Option<KeyWrapMethod> {
    let aes = |key_bits, padded| Some(KeyWrapMethod::Aes { key_bits, padded });
    match uri {
        algorithm::KW_AES128 => aes(128, false),
        algorithm::KW_AES192 => aes(192, false),
        algorithm::KW_AES256 => aes(256, false),
        algorithm::KW_AES128_PAD => aes(128, true),
        algorithm::KW_AES192_PAD => aes(192, true),
        algorithm::KW_AES256_PAD => aes(256, true),
        algorithm::KW_TRIPLEDES => Some(KeyWrapMethod::TripleDes),
        _ => None,
    }
}

// ── Umbrella classification ──────────────────────────────────────────

/// The category an algorithm URI falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmClass {
    Hash(HashType),
    Signature(SignatureMethod, HashType),
    Canonicalization(CanonicalizationMethod),
    MaskGeneration(MaskGenerationFunction),
    KeyWrap(KeyWrapMethod),
}

/// Classify any algorithm URI known to the registry.
pub fn classify(uri: &str) -> Option<AlgorithmClass> {
    classify_hash(uri)
        .map(AlgorithmClass::Hash)
        .or_else(|| {
            classify_signature_method(uri).map(|(m, h)| AlgorithmClass::Signature(m, h))
        })
        .or_else(|| classify_canonicalization(uri).map(AlgorithmClass::Canonicalization))
        .or_else(|| classify_mask_generation_function(uri).map(AlgorithmClass::MaskGeneration))
        .or_else(|| classify_key_wrap(uri).map(AlgorithmClass::KeyWrap))
}

fn strip_any<'a>(uri: &'a str, bases: &[&str]) -> Option<&'a str> {
    bases.iter().find_map(|base| uri.strip_prefix(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_sha256_base_and_extended_forms() {
        assert_eq!(
            classify_signature_method(algorithm::RSA_SHA256),
            Some((SignatureMethod::Rsa, HashType::Sha256))
        );
        assert_eq!(
            classify_signature_method(algorithm::RSA_SHA256_11),
            Some((SignatureMethod::Rsa, HashType::Sha256))
        );
    }

    #[test]
    fn test_legacy_uris_match_whole_string() {
        assert_eq!(
            classify_signature_method(algorithm::HMAC_SHA1),
            Some((SignatureMethod::Hmac, HashType::Sha1))
        );
        assert_eq!(
            classify_signature_method(algorithm::DSA_SHA1),
            Some((SignatureMethod::Dsa, HashType::Sha1))
        );
        // The legacy namespace does not take part in prefix decomposition.
        assert_eq!(
            classify_signature_method("http://www.w3.org/2000/09/xmldsig#rsa-sha256"),
            None
        );
    }

    #[test]
    fn test_structural_decomposition() {
        assert_eq!(
            classify_signature_method(algorithm::ECDSA_SHA3_384),
            Some((SignatureMethod::Ecdsa, HashType::Sha3_384))
        );
        assert_eq!(
            classify_signature_method(algorithm::HMAC_SHA512),
            Some((SignatureMethod::Hmac, HashType::Sha512))
        );
        assert_eq!(
            classify_signature_method(algorithm::RSA_PSS_SHA256),
            Some((SignatureMethod::RsaPss, HashType::Sha256))
        );
        assert_eq!(
            classify_signature_method(algorithm::DSA_SHA256),
            Some((SignatureMethod::Dsa, HashType::Sha256))
        );
    }

    #[test]
    fn test_unknown_uris_are_none() {
        assert_eq!(classify("urn:example:not-an-algorithm"), None);
        assert_eq!(classify(""), None);
        assert_eq!(
            classify_signature_method("http://www.w3.org/2001/04/xmldsig-more#rsa-sha999"),
            None
        );
        assert_eq!(
            classify_signature_method("http://www.w3.org/2001/04/xmldsig-more#"),
            None
        );
        assert_eq!(classify_hash(algorithm::RSA_SHA1), None);
    }

    #[test]
    fn test_hash_uris_round_trip_through_names() {
        for uri in [
            algorithm::SHA1,
            algorithm::SHA256,
            algorithm::SHA512,
            algorithm::SHA3_256,
            algorithm::MD5,
        ] {
            let hash = classify_hash(uri).unwrap();
            assert_eq!(hash.uri(), uri);
            assert_eq!(HashType::from_name(hash.name()), Some(hash));
        }
    }

    #[test]
    fn test_canonicalization_flags() {
        let m = classify_canonicalization(algorithm::EXC_C14N_WITH_COMMENTS).unwrap();
        assert!(m.is_exclusive() && m.with_comments() && !m.is_11());
        let m = classify_canonicalization(algorithm::C14N11).unwrap();
        assert!(!m.is_exclusive() && !m.with_comments() && m.is_11());
        assert_eq!(m.uri(), algorithm::C14N11);
    }

    #[test]
    fn test_mgf_and_key_wrap() {
        assert_eq!(
            classify_mask_generation_function(algorithm::MGF1_SHA384),
            Some(MaskGenerationFunction::Mgf1(HashType::Sha384))
        );
        assert_eq!(
            classify_key_wrap(algorithm::KW_AES256_PAD),
            Some(KeyWrapMethod::Aes { key_bits: 256, padded: true })
        );
        assert_eq!(
            classify(algorithm::KW_TRIPLEDES),
            Some(AlgorithmClass::KeyWrap(KeyWrapMethod::TripleDes))
        );
    }
}
