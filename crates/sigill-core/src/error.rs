#![forbid(unsafe_code)]

/// Errors produced by the sigill XML Signature library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("XML serialization error: {0}")]
    XmlWrite(String),

    /// The document does not have the fixed `Signature` shape.
    #[error("invalid signature structure: {0}")]
    Structure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// An operation was called in the wrong lifecycle state.
    #[error("invalid state: {0}")]
    State(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A configured parameter violates a security floor.
    #[error("security policy violation: {0}")]
    SecurityPolicy(String),

    #[error("reference validation failed: {0}")]
    ReferenceValidation(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wraps this error so it can travel through a `std::io::Read` chain.
    pub fn into_io(self) -> std::io::Error {
        std::io::Error::other(self)
    }

    /// Recovers an error that was tunnelled through `into_io`, or wraps a
    /// plain I/O error.
    pub fn from_io(err: std::io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            if let Some(inner) = err.into_inner() {
                return match inner.downcast::<Error>() {
                    Ok(e) => *e,
                    Err(other) => Error::Other(other.to_string()),
                };
            }
            return Error::Other("I/O error without payload".into());
        }
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
