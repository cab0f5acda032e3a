#![forbid(unsafe_code)]

//! URI dereferencing for XML-DSig references.
//!
//! Handles:
//! - Empty URI (""): the entire document minus comments
//! - Same-document references ("#id", "#xpointer(...)")
//! - External references, fetched through a [`UriResolver`]

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use sigill_core::Error;
use sigill_xml::{xpath, XmlDocument};

use crate::pipeline::TransformData;

/// Fetches the content of external reference URIs.
pub trait UriResolver: Send + Sync {
    /// Open `uri` for reading. Failure is `ResourceNotFound`.
    fn resolve(&self, uri: &str) -> Result<Box<dyn Read>, Error>;
}

/// Resolves URIs to local files through an explicit URL map, falling back
/// to paths relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileUriResolver {
    /// Base directory for relative references.
    pub base_dir: Option<PathBuf>,
    /// URL → local file path.
    pub url_maps: HashMap<String, PathBuf>,
}

impl FileUriResolver {
    pub fn new(base_dir: Option<PathBuf>, url_maps: HashMap<String, PathBuf>) -> Self {
        Self { base_dir, url_maps }
    }

    fn path_for(&self, uri: &str) -> Option<PathBuf> {
        if let Some(path) = self.url_maps.get(uri) {
            return Some(path.clone());
        }
        if uri.contains("://") && !uri.starts_with("file://") {
            return None;
        }
        let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
        match &self.base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path),
        }
    }
}

impl UriResolver for FileUriResolver {
    fn resolve(&self, uri: &str) -> Result<Box<dyn Read>, Error> {
        let path = self
            .path_for(uri)
            .ok_or_else(|| Error::ResourceNotFound(format!("no mapping for {uri}")))?;
        let file = File::open(&path)
            .map_err(|e| Error::ResourceNotFound(format!("{uri} ({}): {e}", path.display())))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Produce the stage-0 input of a reference: the node set a same-document
/// URI designates, or the octets of an external resource.
pub fn dereference<'a>(
    doc: &'a XmlDocument,
    uri: Option<&str>,
    resolver: &dyn UriResolver,
) -> Result<TransformData<'a>, Error> {
    let uri = uri.ok_or_else(|| Error::InvalidUri("reference has no URI attribute".into()))?;
    match xpath::parse_same_document_ref(uri) {
        Some(reference) => {
            let nodes = xpath::select(doc, reference)?;
            Ok(TransformData::NodeSet {
                doc: Cow::Borrowed(doc),
                nodes,
            })
        }
        None if uri.starts_with('#') => Err(Error::InvalidUri(format!(
            "unsupported same-document reference: {uri}"
        ))),
        None => Ok(TransformData::Octets(resolver.resolve(uri)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl UriResolver for Fixed {
        fn resolve(&self, uri: &str) -> Result<Box<dyn Read>, Error> {
            if uri == "urn:data" {
                Ok(Box::new(std::io::Cursor::new(b"payload".to_vec())))
            } else {
                Err(Error::ResourceNotFound(uri.to_owned()))
            }
        }
    }

    #[test]
    fn test_same_document_refs() {
        let doc = XmlDocument::parse(r#"<r><!--c--><a Id="x">t</a></r>"#).unwrap();
        let whole = dereference(&doc, Some(""), &Fixed).unwrap().into_bytes().unwrap();
        assert_eq!(whole, br#"<r><a Id="x">t</a></r>"#);
        let by_id = dereference(&doc, Some("#x"), &Fixed).unwrap().into_bytes().unwrap();
        assert_eq!(by_id, br#"<a Id="x">t</a>"#);
        assert!(matches!(
            dereference(&doc, Some("#missing"), &Fixed),
            Err(Error::InvalidUri(_))
        ));
        assert!(dereference(&doc, None, &Fixed).is_err());
    }

    #[test]
    fn test_external_refs_use_resolver() {
        let doc = XmlDocument::parse("<r/>").unwrap();
        let data = dereference(&doc, Some("urn:data"), &Fixed).unwrap();
        assert!(!data.is_node_set());
        assert_eq!(data.into_bytes().unwrap(), b"payload");
        assert!(matches!(
            dereference(&doc, Some("urn:gone"), &Fixed),
            Err(Error::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_file_resolver_maps_and_base_dir() {
        let dir = std::env::temp_dir().join(format!("sigill-uri-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("doc.txt"), b"file body").unwrap();

        let mut maps = HashMap::new();
        maps.insert("http://example.com/doc".to_owned(), dir.join("doc.txt"));
        let resolver = FileUriResolver::new(Some(dir.clone()), maps);

        let mut body = String::new();
        resolver
            .resolve("http://example.com/doc")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "file body");

        body.clear();
        resolver.resolve("doc.txt").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "file body");

        assert!(matches!(
            resolver.resolve("http://example.com/other"),
            Err(Error::ResourceNotFound(_))
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
