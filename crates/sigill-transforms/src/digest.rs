#![forbid(unsafe_code)]

//! Terminal stages that reduce an octet stream to a digest or MAC.
//!
//! The hash is computed on the first read of the stage's output, pulling the
//! upstream stages chunk by chunk.

use std::io::{self, Read};

use sigill_core::{Error, HashType};
use sigill_crypto::{digest, sign};

use crate::pipeline::{Transform, TransformData};

/// Hashes its input with a fixed hash function.
pub struct DigestTransform {
    hash: HashType,
}

impl DigestTransform {
    pub fn new(hash: HashType) -> Result<Self, Error> {
        // Reject hashes that are compiled out before any data flows.
        digest::from_hash_type(hash)?;
        Ok(Self { hash })
    }

    pub fn hash(&self) -> HashType {
        self.hash
    }
}

impl Transform for DigestTransform {
    fn uri(&self) -> &str {
        self.hash.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let hash = self.hash;
        let source = input.into_reader();
        Ok(TransformData::Octets(Box::new(Deferred::new(source, move |r| {
            digest::digest_reader(hash, r)
        }))))
    }
}

/// Computes a full-length HMAC of its input.
pub struct HmacTransform {
    hash: HashType,
    key: Vec<u8>,
}

impl HmacTransform {
    pub fn new(hash: HashType, key: Vec<u8>) -> Self {
        Self { hash, key }
    }
}

impl Transform for HmacTransform {
    fn uri(&self) -> &str {
        self.hash.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let hash = self.hash;
        let key = self.key.clone();
        let source = input.into_reader();
        Ok(TransformData::Octets(Box::new(Deferred::new(source, move |r| {
            sign::hmac(hash, &key, r)
        }))))
    }
}

type Reduce<'a> = Box<dyn FnOnce(&mut dyn Read) -> Result<Vec<u8>, Error> + 'a>;

/// A reader whose bytes are produced by running `reduce` over `source`
/// when first read.
struct Deferred<'a> {
    pending: Option<(Box<dyn Read + 'a>, Reduce<'a>)>,
    output: io::Cursor<Vec<u8>>,
}

impl<'a> Deferred<'a> {
    fn new<F>(source: Box<dyn Read + 'a>, reduce: F) -> Self
    where
        F: FnOnce(&mut dyn Read) -> Result<Vec<u8>, Error> + 'a,
    {
        Self {
            pending: Some((source, Box::new(reduce))),
            output: io::Cursor::new(Vec::new()),
        }
    }
}

impl Read for Deferred<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some((mut source, reduce)) = self.pending.take() {
            let bytes = reduce(&mut source).map_err(Error::into_io)?;
            self.output = io::Cursor::new(bytes);
        }
        self.output.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base64_transform::Base64DecodeTransform;
    use crate::pipeline::TransformPipeline;

    #[test]
    fn test_digest_stage_ends_pipeline() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Base64DecodeTransform));
        pipeline.push(Box::new(DigestTransform::new(HashType::Sha256).unwrap()));
        let out = pipeline
            .execute(TransformData::from_bytes(b"aGVsbG8=".to_vec()))
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(out, digest::digest(HashType::Sha256, b"hello").unwrap());
    }

    #[test]
    fn test_hmac_stage() {
        let stage = HmacTransform::new(HashType::Sha1, b"k".to_vec());
        let out = stage
            .execute(TransformData::from_bytes(b"msg".to_vec()))
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(out, sign::hmac(HashType::Sha1, b"k", &mut &b"msg"[..]).unwrap());
    }

    #[test]
    fn test_upstream_error_surfaces_on_read() {
        let stage = DigestTransform::new(HashType::Sha256).unwrap();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Base64DecodeTransform));
        pipeline.push(Box::new(stage));
        let data = pipeline
            .execute(TransformData::from_bytes(b"!!!!".to_vec()))
            .unwrap();
        assert!(matches!(data.into_bytes(), Err(Error::Base64(_))));
    }
}
