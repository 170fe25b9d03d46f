//! Copying pages between documents.
//!
//! Every object reachable from an imported page is copied into the target
//! under a fresh id. Links back into the source page tree (`/Parent`, or
//! annotation `/P` entries pointing at pages that were not selected) are cut.

use crate::document::{Document, Page};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, dict_name};
use crate::Result;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Page keys that only make sense inside the source document.
const DROPPED_PAGE_KEYS: [&str; 3] = ["Parent", "B", "StructParents"];

/// Builds a new document from pages of one or more sources.
#[derive(Debug)]
pub struct PageImporter {
    target: Document,
    pages_root: u32,
    kids: Vec<PDFObject>,
    next_id: u32,
    version: Option<String>,
    info_copied: bool,
}

impl Default for PageImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageImporter {
    pub fn new() -> Self {
        let target = Document::new();
        let next_id = target.max_object_id() + 1;
        Self {
            target,
            pages_root: 2,
            kids: Vec::new(),
            next_id,
            version: None,
            info_copied: false,
        }
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Append `pages` of `source` in the given order, adding `rotate_by`
    /// degrees to each page's rotation.
    ///
    /// Objects shared between these pages are copied once.
    pub fn import(&mut self, source: &Document, pages: &[Page], rotate_by: i64) -> Result<()> {
        let selected: HashSet<u32> = pages.iter().map(|p| p.objid).collect();
        let mut mapping: HashMap<u32, u32> = HashMap::new();
        let mut worklist: Vec<u32> = Vec::new();

        let mut page_ids = Vec::with_capacity(pages.len());
        for page in pages {
            let new_id = self.allocate();
            mapping.insert(page.objid, new_id);
            page_ids.push(new_id);
        }

        for (page, &new_id) in pages.iter().zip(&page_ids) {
            let mut attrs = page.attrs.clone();
            for key in DROPPED_PAGE_KEYS {
                attrs.remove(key);
            }
            let rotate = (page.rotate.rem_euclid(360) + rotate_by.rem_euclid(360)) % 360;
            if rotate != 0 || attrs.contains_key("Rotate") {
                attrs.insert("Rotate".into(), PDFObject::Int(rotate));
            }
            let mut obj = PDFObject::Dict(attrs);
            self.remap(source, &mut obj, &selected, &mut mapping, &mut worklist);
            if let PDFObject::Dict(attrs) = &mut obj {
                attrs.insert("Parent".into(), PDFObject::reference(self.pages_root));
            }
            self.target.set_object(new_id, obj);
            self.kids.push(PDFObject::reference(new_id));
        }

        while let Some(src_id) = worklist.pop() {
            let Some(&new_id) = mapping.get(&src_id) else {
                continue;
            };
            let mut obj = match source.get_object(src_id) {
                Some(obj) => obj.clone(),
                None => {
                    warn!(objid = src_id, "dangling reference while importing");
                    PDFObject::Null
                }
            };
            self.remap(source, &mut obj, &selected, &mut mapping, &mut worklist);
            self.target.set_object(new_id, obj);
        }

        if self
            .version
            .as_deref()
            .is_none_or(|v| v < source.version())
        {
            self.version = Some(source.version().to_string());
        }
        if !self.info_copied {
            self.copy_info(source);
        }
        debug!(
            pages = pages.len(),
            objects = mapping.len(),
            "imported pages"
        );
        Ok(())
    }

    fn remap(
        &mut self,
        source: &Document,
        obj: &mut PDFObject,
        selected: &HashSet<u32>,
        mapping: &mut HashMap<u32, u32>,
        worklist: &mut Vec<u32>,
    ) {
        obj.map_refs(&mut |r: &PDFObjRef| {
            if let Some(&id) = mapping.get(&r.objid) {
                return PDFObject::reference(id);
            }
            if !selected.contains(&r.objid) && is_page_tree_node(source, r.objid) {
                return PDFObject::Null;
            }
            let id = self.allocate();
            mapping.insert(r.objid, id);
            worklist.push(r.objid);
            PDFObject::reference(id)
        });
    }

    /// Carry over the first source's `/Info` entries that are plain values.
    fn copy_info(&mut self, source: &Document) {
        self.info_copied = true;
        let Some(info) = source.info_dict() else {
            return;
        };
        let copied: PDFDict = info
            .iter()
            .filter_map(|(key, value)| match source.resolve(value) {
                v @ (PDFObject::String(_)
                | PDFObject::Name(_)
                | PDFObject::Int(_)
                | PDFObject::Real(_)
                | PDFObject::Bool(_)) => Some((key.clone(), v.clone())),
                _ => None,
            })
            .collect();
        if copied.is_empty() {
            return;
        }
        let id = self.allocate();
        self.target.set_object(id, PDFObject::Dict(copied));
        self.target
            .trailer_mut()
            .insert("Info".into(), PDFObject::reference(id));
    }

    /// Number of pages imported so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Link the imported pages into the page tree and return the document.
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.target.set_object(
            self.pages_root,
            PDFObject::Dict(PDFDict::from([
                ("Type".to_string(), PDFObject::name("Pages")),
                ("Kids".to_string(), PDFObject::Array(self.kids)),
                ("Count".to_string(), PDFObject::Int(count)),
            ])),
        );
        if let Some(version) = self.version {
            self.target.set_version(version);
        }
        self.target
    }
}

fn is_page_tree_node(doc: &Document, objid: u32) -> bool {
    doc.get_object(objid)
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| dict_name(d, "Type"))
        .is_some_and(|t| t == "Page" || t == "Pages")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::PDFStream;

    /// Two pages sharing one font resource; page 2 has an annotation
    /// pointing back at page 1.
    fn source() -> Document {
        let mut doc = Document::new();
        doc.set_version("1.4");
        doc.set_object(
            2,
            PDFObject::Dict(PDFDict::from([
                ("Type".to_string(), PDFObject::name("Pages")),
                (
                    "Kids".to_string(),
                    PDFObject::Array(vec![PDFObject::reference(10), PDFObject::reference(20)]),
                ),
                ("Count".to_string(), PDFObject::Int(2)),
                ("MediaBox".to_string(), PDFObject::number_array(&[0.0, 0.0, 100.0, 100.0])),
            ])),
        );
        doc.set_object(
            5,
            PDFObject::Dict(PDFDict::from([(
                "Font".to_string(),
                PDFObject::Dict(PDFDict::from([("F1".to_string(), PDFObject::reference(6))])),
            )])),
        );
        doc.set_object(6, PDFObject::Dict(PDFDict::from([("Type".to_string(), PDFObject::name("Font"))])));
        for (page, content) in [(10u32, 11u32), (20, 21)] {
            let mut attrs = PDFDict::from([
                ("Type".to_string(), PDFObject::name("Page")),
                ("Parent".to_string(), PDFObject::reference(2)),
                ("Resources".to_string(), PDFObject::reference(5)),
                ("Contents".to_string(), PDFObject::reference(content)),
            ]);
            if page == 20 {
                attrs.insert(
                    "Annots".into(),
                    PDFObject::Array(vec![PDFObject::Dict(PDFDict::from([(
                        "P".to_string(),
                        PDFObject::reference(10),
                    )]))]),
                );
            }
            doc.set_object(page, PDFObject::Dict(attrs));
            doc.set_object(content, PDFStream::new(PDFDict::new(), format!("% page {page}").into_bytes()));
        }
        doc
    }

    #[test]
    fn shared_resources_are_copied_once() {
        let src = source();
        let pages = src.pages().unwrap();
        let mut importer = PageImporter::new();
        importer.import(&src, &pages, 0).unwrap();
        let out = importer.finish();

        assert_eq!(out.page_count(), 2);
        assert_eq!(out.version(), "1.4");
        // Catalog, page tree, 2 pages, 2 contents, resources, font.
        assert_eq!(out.object_count(), 8);
        let out_pages = out.pages().unwrap();
        assert_eq!(out_pages[0].media_box, [0.0, 0.0, 100.0, 100.0]);
        assert_eq!(out_pages[0].content(&out), b"% page 10\n");
        assert_eq!(
            out_pages[0].attrs.get("Resources"),
            out_pages[1].attrs.get("Resources")
        );
    }

    #[test]
    fn links_to_unselected_pages_are_cut() {
        let src = source();
        let pages = src.pages().unwrap();
        let mut importer = PageImporter::new();
        importer.import(&src, &pages[1..], 90).unwrap();
        let out = importer.finish();

        let page = out.page(0).unwrap();
        assert_eq!(page.rotate, 90);
        assert_eq!(page.attrs.get("Parent"), Some(&PDFObject::reference(2)));
        let annots = page.attrs.get("Annots").unwrap().as_array().unwrap();
        assert_eq!(annots[0].as_dict().unwrap().get("P"), Some(&PDFObject::Null));
        assert_eq!(page.content(&out), b"% page 20\n");
    }

    #[test]
    fn importing_twice_keeps_both_copies() {
        let src = source();
        let pages = src.pages().unwrap();
        let mut importer = PageImporter::new();
        importer.import(&src, &pages[..1], 0).unwrap();
        importer.import(&src, &pages[..1], 0).unwrap();
        assert_eq!(importer.page_count(), 2);
        let out = importer.finish();
        let out_pages = out.pages().unwrap();
        assert_ne!(out_pages[0].objid, out_pages[1].objid);
        assert_eq!(out_pages[1].content(&out), b"% page 10\n");
    }
}
