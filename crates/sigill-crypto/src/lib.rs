#![forbid(unsafe_code)]

//! Cryptographic primitives for sigill.
//!
//! Digests and signature algorithms, all consuming their input as a
//! byte stream so a transform chain can feed them without buffering.

pub mod digest;
pub mod sign;

pub use digest::DigestAlgorithm;
pub use sign::{SignatureAlgorithm, SigningKey};
