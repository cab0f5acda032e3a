#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use std::io::Read;

use digest::Digest;
use sigill_core::uri::{classify_hash, HashType};
use sigill_core::Error;

/// Chunk size used when hashing a stream.
pub const READ_CHUNK: usize = 8 * 1024;

/// Trait for digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    fn hash_type(&self) -> HashType;
}

/// Create a hash engine for a hash type.
pub fn from_hash_type(hash: HashType) -> Result<Box<dyn DigestAlgorithm>, Error> {
    match hash {
        HashType::Sha1 => Ok(Box::new(Sha1Digest::new())),
        HashType::Sha224 => Ok(Box::new(Sha224Digest::new())),
        HashType::Sha256 => Ok(Box::new(Sha256Digest::new())),
        HashType::Sha384 => Ok(Box::new(Sha384Digest::new())),
        HashType::Sha512 => Ok(Box::new(Sha512Digest::new())),
        HashType::Sha3_224 => Ok(Box::new(Sha3_224Digest::new())),
        HashType::Sha3_256 => Ok(Box::new(Sha3_256Digest::new())),
        HashType::Sha3_384 => Ok(Box::new(Sha3_384Digest::new())),
        HashType::Sha3_512 => Ok(Box::new(Sha3_512Digest::new())),
        #[cfg(feature = "legacy-algorithms")]
        HashType::Md5 => Ok(Box::new(Md5Digest::new())),
        #[cfg(feature = "legacy-algorithms")]
        HashType::Ripemd160 => Ok(Box::new(Ripemd160Digest::new())),
        #[cfg(not(feature = "legacy-algorithms"))]
        HashType::Md5 | HashType::Ripemd160 => Err(Error::UnsupportedAlgorithm(format!(
            "digest algorithm {} needs the legacy-algorithms feature",
            hash.name()
        ))),
    }
}

/// Create a digest algorithm from its DigestMethod URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
    let hash = classify_hash(uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}")))?;
    from_hash_type(hash)
}

/// Compute a digest in one shot.
pub fn digest(hash: HashType, data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut hasher = from_hash_type(hash)?;
    hasher.update(data);
    Ok(hasher.finalize())
}

/// Hash everything `input` yields, in fixed-size chunks.
pub fn digest_reader(hash: HashType, input: &mut dyn Read) -> Result<Vec<u8>, Error> {
    let mut hasher = from_hash_type(hash)?;
    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = input.read(&mut buf).map_err(Error::from_io)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

// ── Concrete implementations ─────────────────────────────────────────

macro_rules! impl_digest {
    ($name:ident, $hasher:ty, $hash:expr) => {
        struct $name {
            inner: $hasher,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    inner: <$hasher>::new(),
                }
            }
        }

        impl DigestAlgorithm for $name {
            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self: Box<Self>) -> Vec<u8> {
                Digest::finalize(self.inner).to_vec()
            }

            fn hash_type(&self) -> HashType {
                $hash
            }
        }
    };
}

impl_digest!(Sha1Digest, sha1::Sha1, HashType::Sha1);
impl_digest!(Sha224Digest, sha2::Sha224, HashType::Sha224);
impl_digest!(Sha256Digest, sha2::Sha256, HashType::Sha256);
impl_digest!(Sha384Digest, sha2::Sha384, HashType::Sha384);
impl_digest!(Sha512Digest, sha2::Sha512, HashType::Sha512);
impl_digest!(Sha3_224Digest, sha3::Sha3_224, HashType::Sha3_224);
impl_digest!(Sha3_256Digest, sha3::Sha3_256, HashType::Sha3_256);
impl_digest!(Sha3_384Digest, sha3::Sha3_384, HashType::Sha3_384);
impl_digest!(Sha3_512Digest, sha3::Sha3_512, HashType::Sha3_512);

#[cfg(feature = "legacy-algorithms")]
impl_digest!(Md5Digest, md5::Md5, HashType::Md5);

#[cfg(feature = "legacy-algorithms")]
impl_digest!(Ripemd160Digest, ripemd::Ripemd160, HashType::Ripemd160);

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::algorithm;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256() {
        let result = digest(HashType::Sha256, b"hello").unwrap();
        assert_eq!(
            hex(&result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_output_lengths_match_hash_type() {
        for hash in [HashType::Sha1, HashType::Sha224, HashType::Sha384, HashType::Sha3_512] {
            assert_eq!(digest(hash, b"x").unwrap().len(), hash.output_len());
        }
    }

    #[test]
    fn test_from_uri() {
        let mut h = from_uri(algorithm::SHA512).unwrap();
        assert_eq!(h.hash_type(), HashType::Sha512);
        h.update(b"hello");
        assert_eq!(h.finalize().len(), 64);
        assert!(matches!(
            from_uri("urn:nope"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let data = vec![0x5au8; READ_CHUNK * 3 + 17];
        let streamed = digest_reader(HashType::Sha256, &mut data.as_slice()).unwrap();
        assert_eq!(streamed, digest(HashType::Sha256, &data).unwrap());
    }
}
