#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) creation and verification.
//!
//! [`Signature`] drives a `<Signature>` element through loading, building,
//! signing and verification. Reference digests run through the pull-based
//! transform pipeline of `sigill-transforms`; digest and signature
//! algorithms are looked up by URI in a [`HandlerRegistry`] so applications
//! can add or override them.

pub mod context;
pub mod handler;
pub mod reference;
pub mod registry;
pub mod signature;
pub mod signed_info;
mod template;

pub use context::DsigContext;
pub use handler::{AlgorithmHandler, DefaultHandler};
pub use reference::{
    FailureReason, Reference, ReferenceBuilder, ReferenceEnv, ReferenceFailure, ReferenceList, VerifyReport,
};
pub use registry::HandlerRegistry;
pub use signature::{DsigObject, Signature, SignatureState, UNSIGNED_PLACEHOLDER};
pub use signed_info::SignedInfo;
