#![forbid(unsafe_code)]

//! `<ds:KeyInfo>` descriptors.
//!
//! A [`KeyInfoList`] describes candidate keys; it never is a key. Turning a
//! descriptor into key material is the job of a
//! [`KeyInfoResolver`](crate::resolver::KeyInfoResolver).

use base64::Engine;
use sigill_core::{ns, Error};
use sigill_xml::{qname, NodeId, XmlDocument};

use crate::key::{Key, KeyData, KeyUsage};

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// `<DSAKeyValue>` parameters, as raw big-endian integers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DsaKeyValue {
    pub p: Option<Vec<u8>>,
    pub q: Option<Vec<u8>>,
    pub g: Option<Vec<u8>>,
    pub y: Vec<u8>,
    pub j: Option<Vec<u8>>,
    pub seed: Option<Vec<u8>>,
    pub pgen_counter: Option<Vec<u8>>,
}

/// `<X509Data>` content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct X509Data {
    /// DER certificates.
    pub certificates: Vec<Vec<u8>>,
    pub subject_names: Vec<String>,
    /// (issuer name, decimal serial number).
    pub issuer_serials: Vec<(String, String)>,
    pub skis: Vec<Vec<u8>>,
    /// DER CRLs.
    pub crls: Vec<Vec<u8>>,
}

/// One child of `<KeyInfo>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfoItem {
    KeyName(String),
    RsaKeyValue { modulus: Vec<u8>, exponent: Vec<u8> },
    DsaKeyValue(DsaKeyValue),
    X509Data(X509Data),
    PgpData {
        key_id: Option<Vec<u8>>,
        key_packet: Option<Vec<u8>>,
    },
    /// `<SPKISexp>` values.
    SpkiData(Vec<Vec<u8>>),
    MgmtData(String),
}

impl KeyInfoItem {
    /// The RSA key value describing `key`, if it is an RSA key.
    pub fn rsa_key_value(key: &Key) -> Option<Self> {
        use rsa::traits::PublicKeyParts;
        let public = key.rsa_public_key()?;
        Some(KeyInfoItem::RsaKeyValue {
            modulus: public.n().to_bytes_be(),
            exponent: public.e().to_bytes_be(),
        })
    }
}

/// The ordered descriptors of a `<KeyInfo>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInfoList {
    pub id: Option<String>,
    pub items: Vec<KeyInfoItem>,
}

impl KeyInfoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            KeyInfoItem::KeyName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Read a `<KeyInfo>` element. Children outside the XML-DSig
    /// vocabulary are left in the document and skipped here.
    pub fn from_element(doc: &XmlDocument, key_info: NodeId) -> Result<Self, Error> {
        let mut list = KeyInfoList {
            id: doc.attribute(key_info, ns::attr::ID).map(str::to_owned),
            items: Vec::new(),
        };
        for child in doc.element_children(key_info) {
            let Some(element) = doc.element(child) else {
                continue;
            };
            if element.name.namespace_uri.as_deref() != Some(ns::DSIG) {
                continue;
            }
            let item = match &*element.name.local_name {
                ns::node::KEY_NAME => KeyInfoItem::KeyName(doc.text_content(child).trim().to_owned()),
                ns::node::MGMT_DATA => KeyInfoItem::MgmtData(doc.text_content(child).trim().to_owned()),
                ns::node::KEY_VALUE => match read_key_value(doc, child)? {
                    Some(item) => item,
                    None => continue,
                },
                ns::node::X509_DATA => KeyInfoItem::X509Data(read_x509_data(doc, child)?),
                ns::node::PGP_DATA => KeyInfoItem::PgpData {
                    key_id: optional_binary(doc, child, ns::node::PGP_KEY_ID)?,
                    key_packet: optional_binary(doc, child, ns::node::PGP_KEY_PACKET)?,
                },
                ns::node::SPKI_DATA => {
                    let mut sexps = Vec::new();
                    for s in doc.find_child_elements(child, ns::DSIG, ns::node::SPKI_SEXP) {
                        sexps.push(decode_binary(&doc.text_content(s), ns::node::SPKI_SEXP)?);
                    }
                    KeyInfoItem::SpkiData(sexps)
                }
                _ => continue,
            };
            list.items.push(item);
        }
        Ok(list)
    }
}

fn read_key_value(doc: &XmlDocument, key_value: NodeId) -> Result<Option<KeyInfoItem>, Error> {
    if let Some(rsa) = doc.find_child_element(key_value, ns::DSIG, ns::node::RSA_KEY_VALUE) {
        return Ok(Some(KeyInfoItem::RsaKeyValue {
            modulus: required_binary(doc, rsa, ns::node::RSA_MODULUS)?,
            exponent: required_binary(doc, rsa, ns::node::RSA_EXPONENT)?,
        }));
    }
    if let Some(dsa) = doc.find_child_element(key_value, ns::DSIG, ns::node::DSA_KEY_VALUE) {
        return Ok(Some(KeyInfoItem::DsaKeyValue(DsaKeyValue {
            p: optional_binary(doc, dsa, ns::node::DSA_P)?,
            q: optional_binary(doc, dsa, ns::node::DSA_Q)?,
            g: optional_binary(doc, dsa, ns::node::DSA_G)?,
            y: required_binary(doc, dsa, ns::node::DSA_Y)?,
            j: optional_binary(doc, dsa, ns::node::DSA_J)?,
            seed: optional_binary(doc, dsa, ns::node::DSA_SEED)?,
            pgen_counter: optional_binary(doc, dsa, ns::node::DSA_PGEN_COUNTER)?,
        })));
    }
    Ok(None)
}

fn read_x509_data(doc: &XmlDocument, x509: NodeId) -> Result<X509Data, Error> {
    let mut data = X509Data::default();
    for child in doc.element_children(x509) {
        let Some(element) = doc.element(child) else {
            continue;
        };
        if element.name.namespace_uri.as_deref() != Some(ns::DSIG) {
            continue;
        }
        let text = doc.text_content(child);
        match &*element.name.local_name {
            ns::node::X509_CERTIFICATE => data
                .certificates
                .push(decode_binary(&text, ns::node::X509_CERTIFICATE)?),
            ns::node::X509_CRL => data.crls.push(decode_binary(&text, ns::node::X509_CRL)?),
            ns::node::X509_SKI => data.skis.push(decode_binary(&text, ns::node::X509_SKI)?),
            ns::node::X509_SUBJECT_NAME => data.subject_names.push(text.trim().to_owned()),
            ns::node::X509_ISSUER_SERIAL => {
                let issuer = doc
                    .find_child_element(child, ns::DSIG, ns::node::X509_ISSUER_NAME)
                    .map(|n| doc.text_content(n).trim().to_owned())
                    .ok_or_else(|| Error::MissingElement(ns::node::X509_ISSUER_NAME.into()))?;
                let serial = doc
                    .find_child_element(child, ns::DSIG, ns::node::X509_SERIAL_NUMBER)
                    .map(|n| doc.text_content(n).trim().to_owned())
                    .ok_or_else(|| Error::MissingElement(ns::node::X509_SERIAL_NUMBER.into()))?;
                data.issuer_serials.push((issuer, serial));
            }
            _ => {}
        }
    }
    Ok(data)
}

fn decode_binary(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    B64.decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

fn optional_binary(doc: &XmlDocument, parent: NodeId, local: &str) -> Result<Option<Vec<u8>>, Error> {
    doc.find_child_element(parent, ns::DSIG, local)
        .map(|n| decode_binary(&doc.text_content(n), local))
        .transpose()
}

fn required_binary(doc: &XmlDocument, parent: NodeId, local: &str) -> Result<Vec<u8>, Error> {
    optional_binary(doc, parent, local)?.ok_or_else(|| Error::MissingElement(local.into()))
}

// ── Writing ──────────────────────────────────────────────────────────

/// Builds `<KeyInfo>` children with a fixed DSig prefix.
pub struct KeyInfoWriter<'d> {
    doc: &'d mut XmlDocument,
    prefix: Option<String>,
}

impl<'d> KeyInfoWriter<'d> {
    pub fn new(doc: &'d mut XmlDocument, prefix: Option<&str>) -> Self {
        Self {
            doc,
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_owned),
        }
    }

    fn element(&mut self, parent: Option<NodeId>, local: &str) -> Result<NodeId, Error> {
        let node = self
            .doc
            .create_element(qname(self.prefix.as_deref(), local, Some(ns::DSIG)));
        if let Some(parent) = parent {
            self.doc.append_child(parent, node)?;
        }
        Ok(node)
    }

    fn text_element(&mut self, parent: NodeId, local: &str, text: &str) -> Result<NodeId, Error> {
        let node = self.element(Some(parent), local)?;
        self.doc.set_text(node, text)?;
        Ok(node)
    }

    fn binary_element(&mut self, parent: NodeId, local: &str, bytes: &[u8]) -> Result<NodeId, Error> {
        self.text_element(parent, local, &B64.encode(bytes))
    }

    /// Create the detached element for `item`.
    pub fn write(&mut self, item: &KeyInfoItem) -> Result<NodeId, Error> {
        match item {
            KeyInfoItem::KeyName(name) => {
                let node = self.element(None, ns::node::KEY_NAME)?;
                self.doc.set_text(node, name)?;
                Ok(node)
            }
            KeyInfoItem::MgmtData(data) => {
                let node = self.element(None, ns::node::MGMT_DATA)?;
                self.doc.set_text(node, data)?;
                Ok(node)
            }
            KeyInfoItem::RsaKeyValue { modulus, exponent } => {
                let kv = self.element(None, ns::node::KEY_VALUE)?;
                let rsa = self.element(Some(kv), ns::node::RSA_KEY_VALUE)?;
                self.binary_element(rsa, ns::node::RSA_MODULUS, modulus)?;
                self.binary_element(rsa, ns::node::RSA_EXPONENT, exponent)?;
                Ok(kv)
            }
            KeyInfoItem::DsaKeyValue(dsa) => {
                let kv = self.element(None, ns::node::KEY_VALUE)?;
                let node = self.element(Some(kv), ns::node::DSA_KEY_VALUE)?;
                let fields = [
                    (ns::node::DSA_P, dsa.p.as_deref()),
                    (ns::node::DSA_Q, dsa.q.as_deref()),
                    (ns::node::DSA_G, dsa.g.as_deref()),
                    (ns::node::DSA_Y, Some(dsa.y.as_slice())),
                    (ns::node::DSA_J, dsa.j.as_deref()),
                    (ns::node::DSA_SEED, dsa.seed.as_deref()),
                    (ns::node::DSA_PGEN_COUNTER, dsa.pgen_counter.as_deref()),
                ];
                for (local, value) in fields {
                    if let Some(bytes) = value {
                        self.binary_element(node, local, bytes)?;
                    }
                }
                Ok(kv)
            }
            KeyInfoItem::X509Data(data) => {
                let node = self.element(None, ns::node::X509_DATA)?;
                for (issuer, serial) in &data.issuer_serials {
                    let is = self.element(Some(node), ns::node::X509_ISSUER_SERIAL)?;
                    self.text_element(is, ns::node::X509_ISSUER_NAME, issuer)?;
                    self.text_element(is, ns::node::X509_SERIAL_NUMBER, serial)?;
                }
                for ski in &data.skis {
                    self.binary_element(node, ns::node::X509_SKI, ski)?;
                }
                for name in &data.subject_names {
                    self.text_element(node, ns::node::X509_SUBJECT_NAME, name)?;
                }
                for cert in &data.certificates {
                    self.binary_element(node, ns::node::X509_CERTIFICATE, cert)?;
                }
                for crl in &data.crls {
                    self.binary_element(node, ns::node::X509_CRL, crl)?;
                }
                Ok(node)
            }
            KeyInfoItem::PgpData { key_id, key_packet } => {
                let node = self.element(None, ns::node::PGP_DATA)?;
                if let Some(id) = key_id {
                    self.binary_element(node, ns::node::PGP_KEY_ID, id)?;
                }
                if let Some(packet) = key_packet {
                    self.binary_element(node, ns::node::PGP_KEY_PACKET, packet)?;
                }
                Ok(node)
            }
            KeyInfoItem::SpkiData(sexps) => {
                let node = self.element(None, ns::node::SPKI_DATA)?;
                for sexp in sexps {
                    self.binary_element(node, ns::node::SPKI_SEXP, sexp)?;
                }
                Ok(node)
            }
        }
    }
}

/// Build a verification key from an inline `<RSAKeyValue>`.
pub fn rsa_key_from_value(modulus: &[u8], exponent: &[u8]) -> Result<Key, Error> {
    let n = rsa::BigUint::from_bytes_be(modulus);
    let e = rsa::BigUint::from_bytes_be(exponent);
    let public = rsa::RsaPublicKey::new(n, e)
        .map_err(|err| Error::Key(format!("invalid RSA public key: {err}")))?;
    Ok(Key::new(KeyData::Rsa { private: None, public }, KeyUsage::Verify))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_INFO: &str = r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:o="urn:other" Id="ki">
  <ds:KeyName> alice </ds:KeyName>
  <o:Custom>kept</o:Custom>
  <ds:KeyValue><ds:RSAKeyValue><ds:Modulus>AQAB</ds:Modulus><ds:Exponent>AQAB</ds:Exponent></ds:RSAKeyValue></ds:KeyValue>
  <ds:X509Data>
    <ds:X509IssuerSerial><ds:X509IssuerName>CN=ca</ds:X509IssuerName><ds:X509SerialNumber>42</ds:X509SerialNumber></ds:X509IssuerSerial>
    <ds:X509SubjectName>CN=me</ds:X509SubjectName>
  </ds:X509Data>
  <ds:MgmtData>opaque</ds:MgmtData>
</ds:KeyInfo>"#;

    #[test]
    fn test_read_key_info() {
        let doc = XmlDocument::parse(KEY_INFO).unwrap();
        let root = doc.document_element().unwrap();
        let list = KeyInfoList::from_element(&doc, root).unwrap();
        assert_eq!(list.id.as_deref(), Some("ki"));
        assert_eq!(list.items.len(), 4);
        assert_eq!(list.key_names().collect::<Vec<_>>(), vec!["alice"]);
        assert_eq!(
            list.items[1],
            KeyInfoItem::RsaKeyValue {
                modulus: vec![1, 0, 1],
                exponent: vec![1, 0, 1]
            }
        );
        let KeyInfoItem::X509Data(x509) = &list.items[2] else {
            panic!("expected X509Data");
        };
        assert_eq!(x509.issuer_serials, vec![("CN=ca".to_owned(), "42".to_owned())]);
        assert_eq!(x509.subject_names, vec!["CN=me".to_owned()]);
        assert_eq!(list.items[3], KeyInfoItem::MgmtData("opaque".into()));
    }

    #[test]
    fn test_written_items_read_back() {
        let mut doc = XmlDocument::parse(
            r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"/>"#,
        )
        .unwrap();
        let root = doc.document_element().unwrap();
        let items = vec![
            KeyInfoItem::KeyName("k".into()),
            KeyInfoItem::DsaKeyValue(DsaKeyValue {
                y: vec![9, 9],
                p: Some(vec![1]),
                ..Default::default()
            }),
            KeyInfoItem::PgpData {
                key_id: Some(vec![0xab]),
                key_packet: None,
            },
            KeyInfoItem::SpkiData(vec![b"(sexp)".to_vec()]),
        ];
        for item in &items {
            let node = KeyInfoWriter::new(&mut doc, Some("ds")).write(item).unwrap();
            doc.append_child(root, node).unwrap();
        }
        let xml = doc.to_xml().unwrap();
        assert!(xml.contains("<ds:KeyName>k</ds:KeyName>"));
        let reread = XmlDocument::parse(&xml).unwrap();
        let list = KeyInfoList::from_element(&reread, reread.document_element().unwrap()).unwrap();
        assert_eq!(list.items, items);
    }

    #[test]
    fn test_missing_required_child() {
        let doc = XmlDocument::parse(
            r#"<KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><KeyValue><RSAKeyValue><Modulus>AQAB</Modulus></RSAKeyValue></KeyValue></KeyInfo>"#,
        )
        .unwrap();
        let err = KeyInfoList::from_element(&doc, doc.document_element().unwrap()).unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }
}
