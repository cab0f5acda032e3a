#![forbid(unsafe_code)]

//! Transform pipeline engine for sigill.
//!
//! Implements the transform chain model from XML-DSig: each reference
//! carries a sequence of transforms applied in order to the data its URI
//! designates. Octet stages are `Read` adapters evaluated on demand.

pub mod base64_transform;
pub mod digest;
pub mod enveloped;
pub mod filter2;
pub mod pipeline;
pub mod step;
pub mod uri;

pub use digest::{DigestTransform, HmacTransform};
pub use filter2::{Filter2Expr, Filter2Op, XPathFilter2Transform};
pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
pub use step::{build_pipeline, TransformStep, XPathParam};
pub use uri::{dereference, FileUriResolver, UriResolver};
