#![forbid(unsafe_code)]

//! Namespace URIs plus the element and attribute names of the
//! XML Signature vocabulary.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Digital Signature 1.1 namespace
pub const DSIG11: &str = "http://www.w3.org/2009/xmldsig11#";

/// Exclusive C14N namespace (home of `InclusiveNamespaces`)
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XPath Filter 2.0 namespace
pub const XPATH2: &str = "http://www.w3.org/2002/06/xmldsig-filter2";

/// XML namespace, bound to the `xml` prefix
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// Prefix used for the DSig namespace when a signature is built from scratch.
pub const DEFAULT_DSIG_PREFIX: &str = "ds";

/// Prefix for the XPath Filter 2.0 namespace on written `<XPath>` elements.
pub const DEFAULT_XPATH2_PREFIX: &str = "dsig-xpath";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const OBJECT: &str = "Object";
    pub const MANIFEST: &str = "Manifest";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const HMAC_OUTPUT_LENGTH: &str = "HMACOutputLength";

    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const MGMT_DATA: &str = "MgmtData";

    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";

    pub const DSA_KEY_VALUE: &str = "DSAKeyValue";
    pub const DSA_P: &str = "P";
    pub const DSA_Q: &str = "Q";
    pub const DSA_G: &str = "G";
    pub const DSA_Y: &str = "Y";
    pub const DSA_J: &str = "J";
    pub const DSA_SEED: &str = "Seed";
    pub const DSA_PGEN_COUNTER: &str = "PgenCounter";

    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const X509_CRL: &str = "X509CRL";
    pub const X509_SUBJECT_NAME: &str = "X509SubjectName";
    pub const X509_ISSUER_SERIAL: &str = "X509IssuerSerial";
    pub const X509_ISSUER_NAME: &str = "X509IssuerName";
    pub const X509_SERIAL_NUMBER: &str = "X509SerialNumber";
    pub const X509_SKI: &str = "X509SKI";

    pub const PGP_DATA: &str = "PGPData";
    pub const PGP_KEY_ID: &str = "PGPKeyID";
    pub const PGP_KEY_PACKET: &str = "PGPKeyPacket";
    pub const SPKI_DATA: &str = "SPKIData";
    pub const SPKI_SEXP: &str = "SPKISexp";

    pub const XPATH: &str = "XPath";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ENCODING: &str = "Encoding";
    pub const ALGORITHM: &str = "Algorithm";
    pub const PREFIX_LIST: &str = "PrefixList";
    pub const FILTER: &str = "Filter";
}

// ── XPath Filter 2.0 set operations ──────────────────────────────────

pub const XPATH2_FILTER_INTERSECT: &str = "intersect";
pub const XPATH2_FILTER_SUBTRACT: &str = "subtract";
pub const XPATH2_FILTER_UNION: &str = "union";
