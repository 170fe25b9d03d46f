//! Page tree walk with inherited attributes.

use super::doc::Document;
use crate::model::objects::{PDFDict, PDFObject};
use crate::{PdfError, Result};
use std::collections::HashSet;
use tracing::warn;

/// US Letter, used when no MediaBox is found anywhere up the tree.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Attributes a page inherits from its ancestors.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Page tree nesting beyond this is treated as corrupt.
const MAX_TREE_DEPTH: usize = 64;

/// A page as seen through the page tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Object id of the page dictionary.
    pub objid: u32,
    /// Zero-based position in document order.
    pub index: usize,
    /// Page dictionary with inherited attributes filled in.
    pub attrs: PDFDict,
    /// MediaBox, normalized so that `x0 <= x1` and `y0 <= y1`.
    pub media_box: [f64; 4],
    pub crop_box: Option<[f64; 4]>,
    /// Clockwise rotation in degrees, one of 0, 90, 180, 270.
    pub rotate: i64,
}

impl Page {
    /// The visible region: CropBox clipped to MediaBox.
    pub fn visible_box(&self) -> [f64; 4] {
        let [mx0, my0, mx1, my1] = self.media_box;
        match self.crop_box {
            Some([cx0, cy0, cx1, cy1]) => {
                let clipped = [cx0.max(mx0), cy0.max(my0), cx1.min(mx1), cy1.min(my1)];
                if clipped[2] > clipped[0] && clipped[3] > clipped[1] {
                    clipped
                } else {
                    self.media_box
                }
            }
            None => self.media_box,
        }
    }

    /// Displayed width and height in points, rotation applied.
    pub fn size(&self) -> (f64, f64) {
        let [x0, y0, x1, y1] = self.visible_box();
        let (w, h) = (x1 - x0, y1 - y0);
        if self.rotate % 180 == 0 { (w, h) } else { (h, w) }
    }

    /// The resource dictionary, resolved.
    pub fn resources<'a>(&'a self, doc: &'a Document) -> Option<&'a PDFDict> {
        doc.resolve_key(&self.attrs, "Resources")
            .and_then(|r| r.as_dict().ok())
    }

    /// Concatenated, decoded content streams.
    ///
    /// Streams that fail to decode are skipped with a warning.
    pub fn content(&self, doc: &Document) -> Vec<u8> {
        let parts: Vec<&PDFObject> = match doc.resolve_key(&self.attrs, "Contents") {
            Some(PDFObject::Array(items)) => items.iter().map(|i| doc.resolve(i)).collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };
        let mut out = Vec::new();
        for part in parts {
            let Ok(stream) = part.as_stream() else {
                continue;
            };
            match stream.decode() {
                Ok(data) => {
                    out.extend_from_slice(&data);
                    out.push(b'\n');
                }
                Err(e) => warn!(page = self.index + 1, error = %e, "skipping undecodable content stream"),
            }
        }
        out
    }
}

impl Document {
    /// All pages in document order.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let root = self.pages_root_id()?;
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.walk_page_tree(root, &PDFDict::new(), &mut visited, &mut pages, 0)?;
        Ok(pages)
    }

    /// Number of pages; 0 if the page tree is unreadable.
    pub fn page_count(&self) -> usize {
        self.pages().map_or(0, |p| p.len())
    }

    /// Page by zero-based index.
    pub fn page(&self, index: usize) -> Result<Page> {
        self.pages()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| PdfError::InvalidArgument(format!("page index {index} out of range")))
    }

    fn walk_page_tree(
        &self,
        objid: u32,
        inherited: &PDFDict,
        visited: &mut HashSet<u32>,
        pages: &mut Vec<Page>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(PdfError::MalformedDocument("page tree too deep".into()));
        }
        if !visited.insert(objid) {
            warn!(objid, "page tree cycle, skipping node");
            return Ok(());
        }
        let Some(node) = self.get_object(objid).and_then(|o| o.as_dict().ok()) else {
            warn!(objid, "page tree node missing, skipping");
            return Ok(());
        };

        let kind = node.get("Type").and_then(|t| t.as_name().ok());
        let kids = self
            .resolve_key(node, "Kids")
            .and_then(|k| k.as_array().ok());
        match (kind, kids) {
            (Some("Page"), _) | (None, None) => {
                let mut attrs = node.clone();
                for key in INHERITABLE {
                    if !attrs.contains_key(key)
                        && let Some(value) = inherited.get(key)
                    {
                        attrs.insert(key.to_string(), value.clone());
                    }
                }
                pages.push(self.make_page(objid, pages.len(), attrs));
            }
            (_, Some(kids)) => {
                let mut next = inherited.clone();
                for key in INHERITABLE {
                    if let Some(value) = node.get(key) {
                        next.insert(key.to_string(), value.clone());
                    }
                }
                for kid in kids {
                    match kid {
                        PDFObject::Ref(r) => {
                            self.walk_page_tree(r.objid, &next, visited, pages, depth + 1)?;
                        }
                        other => warn!(objid, kind = other.type_name(), "non-reference page tree kid"),
                    }
                }
            }
            (_, None) => warn!(objid, "page tree node without kids"),
        }
        Ok(())
    }

    fn make_page(&self, objid: u32, index: usize, attrs: PDFDict) -> Page {
        let media_box = self.read_box(&attrs, "MediaBox").unwrap_or_else(|| {
            warn!(objid, "page has no MediaBox, assuming Letter");
            DEFAULT_MEDIA_BOX
        });
        let crop_box = self.read_box(&attrs, "CropBox");
        let rotate = self
            .resolve_key(&attrs, "Rotate")
            .and_then(|r| r.as_num().ok())
            .map_or(0, |r| ((r as i64 / 90) * 90).rem_euclid(360));
        Page {
            objid,
            index,
            attrs,
            media_box,
            crop_box,
            rotate,
        }
    }

    fn read_box(&self, attrs: &PDFDict, key: &str) -> Option<[f64; 4]> {
        let values = self.resolve_key(attrs, key)?.as_array().ok()?;
        let nums: Vec<f64> = values
            .iter()
            .map(|v| self.resolve(v).as_num().ok())
            .collect::<Option<_>>()?;
        let [x0, y0, x1, y1] = nums[..] else {
            return None;
        };
        let rect = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
        (rect[2] > rect[0] && rect[3] > rect[1]).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::PDFStream;

    fn dict(entries: &[(&str, PDFObject)]) -> PDFObject {
        PDFObject::Dict(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn tree() -> Document {
        let mut doc = Document::new();
        doc.set_object(
            2,
            dict(&[
                ("Type", PDFObject::name("Pages")),
                ("Kids", PDFObject::Array(vec![PDFObject::reference(3), PDFObject::reference(5)])),
                ("Count", PDFObject::Int(2)),
                ("MediaBox", PDFObject::number_array(&[0.0, 0.0, 200.0, 100.0])),
                ("Rotate", PDFObject::Int(90)),
            ]),
        );
        doc.set_object(
            3,
            dict(&[
                ("Type", PDFObject::name("Page")),
                ("Parent", PDFObject::reference(2)),
                ("Contents", PDFObject::reference(4)),
            ]),
        );
        doc.set_object(4, PDFStream::new(PDFDict::new(), b"0 0 m".to_vec()));
        doc.set_object(
            5,
            dict(&[
                ("Type", PDFObject::name("Page")),
                ("Parent", PDFObject::reference(2)),
                ("MediaBox", PDFObject::number_array(&[300.0, 400.0, 0.0, 0.0])),
                ("Rotate", PDFObject::Int(-90)),
            ]),
        );
        doc
    }

    #[test]
    fn inherits_and_normalizes_boxes() {
        let pages = tree().pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].media_box, [0.0, 0.0, 200.0, 100.0]);
        assert_eq!(pages[0].rotate, 90);
        assert_eq!(pages[0].size(), (100.0, 200.0));
        assert_eq!(pages[1].media_box, [0.0, 0.0, 300.0, 400.0]);
        assert_eq!(pages[1].rotate, 270);
    }

    #[test]
    fn content_is_decoded_and_joined() {
        let doc = tree();
        let page = doc.page(0).unwrap();
        assert_eq!(page.content(&doc), b"0 0 m\n");
        assert!(doc.page(1).unwrap().content(&doc).is_empty());
    }

    #[test]
    fn cycles_do_not_loop() {
        let mut doc = tree();
        doc.set_object(
            5,
            dict(&[
                ("Type", PDFObject::name("Pages")),
                ("Kids", PDFObject::Array(vec![PDFObject::reference(2)])),
            ]),
        );
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn crop_box_is_clipped_to_media_box() {
        let page = Page {
            objid: 1,
            index: 0,
            attrs: PDFDict::new(),
            media_box: [0.0, 0.0, 100.0, 100.0],
            crop_box: Some([10.0, 10.0, 500.0, 50.0]),
            rotate: 0,
        };
        assert_eq!(page.visible_box(), [10.0, 10.0, 100.0, 50.0]);
    }
}
