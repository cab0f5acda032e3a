#![forbid(unsafe_code)]

//! Shared vocabulary of the sigill workspace: the error type, algorithm
//! URI constants, namespace names and URI classification.

pub mod algorithm;
pub mod error;
pub mod ns;
pub mod uri;

pub use error::{Error, Result};
pub use uri::{CanonicalizationMethod, HashType, SignatureMethod};
