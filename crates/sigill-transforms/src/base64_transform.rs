#![forbid(unsafe_code)]

//! Base64 decode transform.

use std::io::{self, Read};

use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use sigill_core::{algorithm, Error};
use sigill_xml::NodeKind;

use crate::pipeline::{Transform, TransformData};

/// Base64 decode transform. Node-set input is reduced to the string value
/// of its text nodes first.
pub struct Base64DecodeTransform;

impl Transform for Base64DecodeTransform {
    fn uri(&self) -> &str {
        algorithm::BASE64
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let source: Box<dyn Read + 'a> = match input {
            TransformData::Octets(reader) => reader,
            TransformData::NodeSet { doc, nodes } => {
                let mut text = String::new();
                for id in doc.descendants(doc.root()) {
                    if let (true, Some(NodeKind::Text(t))) = (nodes.contains(id), doc.node_kind(id)) {
                        text.push_str(t);
                    }
                }
                Box::new(io::Cursor::new(text.into_bytes()))
            }
        };
        let decoder = DecoderReader::new(SkipWhitespace { inner: source }, &STANDARD);
        Ok(TransformData::Octets(Box::new(Base64Errors { inner: decoder })))
    }
}

/// Drops ASCII whitespace so wrapped base64 decodes.
struct SkipWhitespace<R> {
    inner: R,
}

impl<R: Read> Read for SkipWhitespace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                if !buf[i].is_ascii_whitespace() {
                    buf[kept] = buf[i];
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Reports decoder failures as `Error::Base64`.
struct Base64Errors<R> {
    inner: R,
}

impl<R: Read> Read for Base64Errors<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(|e| {
            if e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
                e
            } else {
                Error::Base64(e.to_string()).into_io()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use sigill_xml::{NodeSet, XmlDocument};

    #[test]
    fn test_decode_wrapped_octets() {
        let data = TransformData::from_bytes(b"aGVs\n  bG8g\r\nd29y bGQ=\n".to_vec());
        let out = Base64DecodeTransform.execute(data).unwrap().into_bytes().unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_decode_node_set_text() {
        let doc = XmlDocument::parse("<r Id=\"b\">aGVs<!--x-->bG8=</r>").unwrap();
        let nodes = NodeSet::all(&doc);
        let data = TransformData::NodeSet {
            doc: Cow::Borrowed(&doc),
            nodes,
        };
        let out = Base64DecodeTransform.execute(data).unwrap().into_bytes().unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_invalid_input_is_base64_error() {
        let data = TransformData::from_bytes(b"@@@@".to_vec());
        let err = Base64DecodeTransform
            .execute(data)
            .unwrap()
            .into_bytes()
            .unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }
}
