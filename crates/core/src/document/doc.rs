//! In-memory PDF document: an object table plus trailer.

use super::security::{AccessPermission, EncryptionDictionary, SecurityHandler};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
use crate::{PdfError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Highest object number a conforming file may use (PDF 32000 Annex C).
/// Larger ids are dropped on load.
pub const MAX_OBJECT_ID: u32 = 8_388_607;

/// Reference chains longer than this are treated as broken.
const MAX_RESOLVE_DEPTH: usize = 32;

static NULL: PDFObject = PDFObject::Null;

/// A parsed or freshly built PDF document.
///
/// Objects are keyed by object id; generations are normalized to 0 on
/// load. The trailer keeps only document level keys (`Root`, `Info`,
/// `ID`); `Size`, `Prev` and the xref are recomputed when writing.
#[derive(Clone)]
pub struct Document {
    pub(crate) version: String,
    pub(crate) objects: BTreeMap<u32, PDFObject>,
    pub(crate) trailer: PDFDict,
    pub(crate) security: Option<Arc<dyn SecurityHandler>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("objects", &self.objects.len())
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: a catalog and a page tree with no pages.
    pub fn new() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            1,
            PDFObject::Dict(PDFDict::from([
                ("Type".to_string(), PDFObject::name("Catalog")),
                ("Pages".to_string(), PDFObject::reference(2)),
            ])),
        );
        objects.insert(
            2,
            PDFObject::Dict(PDFDict::from([
                ("Type".to_string(), PDFObject::name("Pages")),
                ("Kids".to_string(), PDFObject::Array(Vec::new())),
                ("Count".to_string(), PDFObject::Int(0)),
            ])),
        );
        Self {
            version: "1.7".into(),
            objects,
            trailer: PDFDict::from([("Root".to_string(), PDFObject::reference(1))]),
            security: None,
        }
    }

    /// Header version, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn trailer(&self) -> &PDFDict {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut PDFDict {
        &mut self.trailer
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Largest object id in use, 0 for an empty table.
    pub fn max_object_id(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    pub fn get_object(&self, objid: u32) -> Option<&PDFObject> {
        self.objects.get(&objid)
    }

    pub fn get_object_mut(&mut self, objid: u32) -> Option<&mut PDFObject> {
        self.objects.get_mut(&objid)
    }

    /// Objects in ascending id order.
    pub fn objects(&self) -> impl DoubleEndedIterator<Item = (u32, &PDFObject)> {
        self.objects.iter().map(|(id, obj)| (*id, obj))
    }

    pub fn set_object(&mut self, objid: u32, obj: impl Into<PDFObject>) {
        self.objects.insert(objid, obj.into());
    }

    /// Store `obj` under the next free id.
    pub fn add_object(&mut self, obj: impl Into<PDFObject>) -> PDFObjRef {
        let objid = self.max_object_id() + 1;
        self.objects.insert(objid, obj.into());
        PDFObjRef::new(objid, 0)
    }

    pub fn remove_object(&mut self, objid: u32) -> Option<PDFObject> {
        self.objects.remove(&objid)
    }

    /// Follow references until a direct object. Dangling references
    /// resolve to `Null`.
    pub fn resolve<'a>(&'a self, obj: &'a PDFObject) -> &'a PDFObject {
        let mut current = obj;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                PDFObject::Ref(r) => match self.objects.get(&r.objid) {
                    Some(next) => current = next,
                    None => return &NULL,
                },
                other => return other,
            }
        }
        &NULL
    }

    /// Resolve `key` of `dict`.
    pub fn resolve_key<'a>(&'a self, dict: &'a PDFDict, key: &str) -> Option<&'a PDFObject> {
        match dict.get(key).map(|v| self.resolve(v)) {
            None | Some(PDFObject::Null) => None,
            some => some,
        }
    }

    /// Resolve a stream's payload through its non-image filters.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Vec<u8>> {
        stream.decode()
    }

    /// Object id of the document catalog.
    pub fn root_id(&self) -> Result<u32> {
        match self.trailer.get("Root") {
            Some(PDFObject::Ref(r)) => Ok(r.objid),
            _ => Err(PdfError::MalformedDocument(
                "trailer has no /Root reference".into(),
            )),
        }
    }

    /// The document catalog dictionary.
    pub fn catalog(&self) -> Result<&PDFDict> {
        let objid = self.root_id()?;
        self.objects
            .get(&objid)
            .ok_or(PdfError::ObjectNotFound(objid))?
            .as_dict()
            .map_err(|_| PdfError::MalformedDocument("catalog is not a dictionary".into()))
    }

    /// Object id of the root page tree node.
    pub fn pages_root_id(&self) -> Result<u32> {
        match self.catalog()?.get("Pages") {
            Some(PDFObject::Ref(r)) => Ok(r.objid),
            _ => Err(PdfError::MalformedDocument(
                "catalog has no /Pages reference".into(),
            )),
        }
    }

    /// `/Info` dictionary, if present.
    pub fn info_dict(&self) -> Option<&PDFDict> {
        self.resolve_key(&self.trailer, "Info")
            .and_then(|o| o.as_dict().ok())
    }

    /// First element of the trailer `/ID` array.
    pub fn file_id(&self) -> Option<&[u8]> {
        self.trailer
            .get("ID")
            .and_then(|id| id.as_array().ok())
            .and_then(|arr| arr.first())
            .and_then(|first| first.as_string().ok())
    }

    /// True while an encryption dictionary is attached.
    pub fn is_encrypted(&self) -> bool {
        self.security.is_some()
    }

    pub fn encryption(&self) -> Option<&EncryptionDictionary> {
        self.security.as_deref().map(|h| h.dictionary())
    }

    /// Granted permissions; unencrypted documents allow everything.
    pub fn permissions(&self) -> AccessPermission {
        self.encryption()
            .map_or_else(AccessPermission::all, EncryptionDictionary::permissions)
    }

    pub(crate) fn security_handler(&self) -> Option<&Arc<dyn SecurityHandler>> {
        self.security.as_ref()
    }

    /// Summary used by `info` style inspection.
    pub fn info(&self) -> Result<DocumentInfo> {
        let pages = self.pages()?;
        let text = |key: &str| {
            self.info_dict()
                .and_then(|info| self.resolve_key(info, key))
                .and_then(|v| v.as_string().ok())
                .map(decode_text_string)
        };
        Ok(DocumentInfo {
            version: self.version.clone(),
            page_count: pages.len(),
            encryption: self.encryption().map(EncryptionDictionary::algorithm),
            permissions: self.permissions(),
            title: text("Title"),
            author: text("Author"),
            producer: text("Producer"),
            page_sizes: pages.iter().map(|p| p.size()).collect(),
        })
    }
}

/// Document level facts reported by [`Document::info`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DocumentInfo {
    pub version: String,
    pub page_count: usize,
    /// Encryption algorithm, `None` when unencrypted.
    pub encryption: Option<String>,
    pub permissions: AccessPermission,
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    /// Displayed page sizes in points, rotation applied.
    pub page_sizes: Vec<(f64, f64)>,
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, else Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_empty_page_tree() {
        let doc = Document::new();
        assert_eq!(doc.root_id().unwrap(), 1);
        assert_eq!(doc.pages_root_id().unwrap(), 2);
        assert_eq!(doc.page_count(), 0);
        assert!(!doc.is_encrypted());
        assert_eq!(doc.permissions(), AccessPermission::all());
    }

    #[test]
    fn add_object_uses_next_id() {
        let mut doc = Document::new();
        let r = doc.add_object(PDFObject::Int(5));
        assert_eq!(r.objid, 3);
        assert_eq!(doc.max_object_id(), 3);
    }

    #[test]
    fn resolve_follows_chains_and_dangling_refs() {
        let mut doc = Document::new();
        doc.set_object(10, PDFObject::reference(11));
        doc.set_object(11, PDFObject::Int(42));
        doc.set_object(12, PDFObject::reference(12));
        assert_eq!(doc.resolve(&PDFObject::reference(10)), &PDFObject::Int(42));
        assert_eq!(doc.resolve(&PDFObject::reference(99)), &PDFObject::Null);
        assert_eq!(doc.resolve(&PDFObject::reference(12)), &PDFObject::Null);
    }

    #[test]
    fn text_strings_decode_utf16_and_latin1() {
        assert_eq!(decode_text_string(b"\xFE\xFF\x00H\x00i"), "Hi");
        assert_eq!(decode_text_string(b"caf\xE9"), "café");
    }
}
