#![forbid(unsafe_code)]

//! Algorithm handlers: the bridge between algorithm URIs found in a
//! signature and the crypto primitives that implement them.

use std::io::Read;

use sigill_core::uri::{classify_hash, classify_signature_method};
use sigill_core::{Error, HashType, SignatureMethod};
use sigill_crypto::sign;
use sigill_keys::Key;
use sigill_transforms::{DigestTransform, HmacTransform, TransformPipeline};

/// Implements the digest and signature algorithms named by URI.
///
/// A handler either appends a hashing stage to a pipeline (reference
/// digests, SignedInfo hashes) or consumes a stream to produce or check a
/// signature value. Handlers are shared between signatures and must not
/// keep per-call state.
pub trait AlgorithmHandler: Send + Sync {
    /// Append the digest stage for a `DigestMethod` URI.
    fn append_hash_transform(&self, pipeline: &mut TransformPipeline, uri: &str) -> Result<(), Error>;

    /// Append the stage that hashes canonical SignedInfo for a
    /// `SignatureMethod` URI. MAC methods need the key.
    fn append_signature_hash_transform(
        &self,
        pipeline: &mut TransformPipeline,
        uri: &str,
        key: Option<&Key>,
    ) -> Result<(), Error>;

    /// Sign the stream. `output_bits` truncates MAC output.
    fn sign(
        &self,
        input: &mut dyn Read,
        uri: &str,
        key: &Key,
        output_bits: Option<u32>,
    ) -> Result<Vec<u8>, Error>;

    /// Check `signature` over the stream.
    fn verify(
        &self,
        input: &mut dyn Read,
        uri: &str,
        signature: &[u8],
        output_bits: Option<u32>,
        key: &Key,
    ) -> Result<bool, Error>;
}

/// The built-in handler covering every algorithm `sigill-crypto` implements.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

fn signature_method(uri: &str) -> Result<(SignatureMethod, HashType), Error> {
    classify_signature_method(uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature method: {uri}")))
}

impl AlgorithmHandler for DefaultHandler {
    fn append_hash_transform(&self, pipeline: &mut TransformPipeline, uri: &str) -> Result<(), Error> {
        let hash = classify_hash(uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest method: {uri}")))?;
        pipeline.push(Box::new(DigestTransform::new(hash)?));
        Ok(())
    }

    fn append_signature_hash_transform(
        &self,
        pipeline: &mut TransformPipeline,
        uri: &str,
        key: Option<&Key>,
    ) -> Result<(), Error> {
        let (method, hash) = signature_method(uri)?;
        if method == SignatureMethod::Hmac {
            let secret = key
                .and_then(Key::symmetric_key_bytes)
                .ok_or_else(|| Error::Key(format!("{uri} needs an HMAC key")))?;
            pipeline.push(Box::new(HmacTransform::new(hash, secret.to_vec())));
        } else {
            pipeline.push(Box::new(DigestTransform::new(hash)?));
        }
        Ok(())
    }

    fn sign(
        &self,
        input: &mut dyn Read,
        uri: &str,
        key: &Key,
        output_bits: Option<u32>,
    ) -> Result<Vec<u8>, Error> {
        let (method, hash) = signature_method(uri)?;
        let algorithm = sign::signer(method, hash, output_bits)?;
        algorithm.sign(&key.to_signing_key(), input)
    }

    fn verify(
        &self,
        input: &mut dyn Read,
        uri: &str,
        signature: &[u8],
        output_bits: Option<u32>,
        key: &Key,
    ) -> Result<bool, Error> {
        let (method, hash) = signature_method(uri)?;
        let algorithm = sign::signer(method, hash, output_bits)?;
        algorithm.verify(&key.to_signing_key(), input, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::algorithm;
    use sigill_transforms::TransformData;

    #[test]
    fn test_hash_transform_digests_input() {
        let mut pipeline = TransformPipeline::new();
        DefaultHandler
            .append_hash_transform(&mut pipeline, algorithm::SHA1)
            .unwrap();
        let out = pipeline
            .execute(TransformData::from_bytes(b"abc".to_vec()))
            .unwrap()
            .into_bytes()
            .unwrap();
        assert_eq!(
            out,
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d
            ]
        );
    }

    #[test]
    fn test_unknown_uris() {
        let mut pipeline = TransformPipeline::new();
        assert!(matches!(
            DefaultHandler.append_hash_transform(&mut pipeline, "urn:nope"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        let key = Key::hmac(b"k");
        assert!(matches!(
            DefaultHandler.sign(&mut &b"x"[..], "urn:nope", &key, None),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_hmac_signature_hash_needs_key() {
        let mut pipeline = TransformPipeline::new();
        assert!(matches!(
            DefaultHandler.append_signature_hash_transform(&mut pipeline, algorithm::HMAC_SHA256, None),
            Err(Error::Key(_))
        ));
        let key = Key::hmac(b"secret");
        DefaultHandler
            .append_signature_hash_transform(&mut pipeline, algorithm::HMAC_SHA256, Some(&key))
            .unwrap();
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_hmac_sign_verify() {
        let key = Key::hmac(b"secret");
        let mac = DefaultHandler
            .sign(&mut &b"data"[..], algorithm::HMAC_SHA1, &key, None)
            .unwrap();
        assert_eq!(mac.len(), 20);
        assert!(DefaultHandler
            .verify(&mut &b"data"[..], algorithm::HMAC_SHA1, &mac, None, &key)
            .unwrap());
        assert!(!DefaultHandler
            .verify(&mut &b"date"[..], algorithm::HMAC_SHA1, &mac, None, &key)
            .unwrap());
    }
}
