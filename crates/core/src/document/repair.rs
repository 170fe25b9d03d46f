//! Recovery for files whose cross-reference data is missing or wrong.
//!
//! Scans the whole file for `N G obj` headers; a later definition of the
//! same object id replaces an earlier one, as an incremental update would.

use super::doc::Document;
use super::reader::{XRefEntry, load_xref_stream, parse_indirect_at};
use crate::model::objects::{PDFDict, PDFObject};
use crate::parser::PDFParser;
use crate::{PdfError, Result};
use regex::bytes::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn object_header() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+(\d+)\s+obj\b").ok())
        .as_ref()
        .ok_or_else(|| PdfError::Runtime("object header pattern failed to compile".into()))
}

fn parse_u32(bytes: &[u8]) -> Option<u32> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Rebuild xref entries and a trailer by scanning `data`.
pub(crate) fn scan_objects(data: &[u8]) -> Result<(HashMap<u32, XRefEntry>, PDFDict)> {
    let mut entries = HashMap::new();
    let mut xref_streams = Vec::new();
    let mut object_streams = Vec::new();

    for cap in object_header()?.captures_iter(data) {
        let (Some(objid), Some(genno), Some(whole)) =
            (parse_u32(&cap[1]), parse_u32(&cap[2]), cap.get(0))
        else {
            continue;
        };
        let offset = whole.start();
        entries.insert(objid, XRefEntry::Offset { offset, genno });

        // Only dictionaries naming a special /Type need a closer look.
        let head = &data[whole.end()..data.len().min(whole.end() + 256)];
        if contains(head, b"/XRef") {
            xref_streams.push(offset);
        } else if contains(head, b"/ObjStm") {
            object_streams.push((objid, offset));
        }
    }
    if entries.is_empty() {
        return Err(PdfError::MalformedDocument(
            "no objects found while scanning".into(),
        ));
    }
    debug!(objects = entries.len(), "recovered objects by scanning");

    for (stream_objid, offset) in object_streams {
        match object_stream_members(data, offset) {
            Ok(members) => {
                for (index, objid) in members.into_iter().enumerate() {
                    entries.entry(objid).or_insert(XRefEntry::Compressed {
                        stream_objid,
                        index,
                    });
                }
            }
            Err(e) => warn!(stream_objid, error = %e, "object stream not indexable"),
        }
    }

    let mut trailer = scan_trailers(data);
    for offset in xref_streams.into_iter().rev() {
        if let Ok(section) = load_xref_stream(data, offset) {
            for (key, value) in section.trailer {
                if !matches!(key.as_str(), "Prev" | "Size" | "XRefStm") {
                    trailer.entry(key).or_insert(value);
                }
            }
        }
    }
    Ok((entries, trailer))
}

/// Merge every `trailer << >>` dictionary, the last one winning.
fn scan_trailers(data: &[u8]) -> PDFDict {
    let needle = b"trailer";
    let mut trailer = PDFDict::new();
    let mut end = data.len();
    while let Some(pos) = data[..end].windows(needle.len()).rposition(|w| w == needle) {
        let mut parser = PDFParser::new(&data[pos + needle.len()..]);
        if let Ok(PDFObject::Dict(dict)) = parser.parse_object() {
            for (key, value) in dict {
                trailer.entry(key).or_insert(value);
            }
        }
        end = pos;
    }
    trailer
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Object ids listed in an object stream header, in order.
fn object_stream_members(data: &[u8], offset: usize) -> Result<Vec<u32>> {
    let (_, _, obj) = parse_indirect_at(data, offset, &|_| None)?;
    let stream = obj.as_stream()?;
    let first = stream
        .get("First")
        .and_then(|f| f.as_int().ok())
        .and_then(|f| usize::try_from(f).ok())
        .unwrap_or(0);
    let body = stream.decode()?;
    let mut header = PDFParser::new(&body[..first.min(body.len())]);
    let mut ids = Vec::new();
    while let (Ok(objid), Ok(_)) = (
        header.parse_object().and_then(|o| o.as_int()),
        header.parse_object().and_then(|o| o.as_int()),
    ) {
        ids.push(u32::try_from(objid).unwrap_or(0));
    }
    Ok(ids)
}

/// Id of the highest numbered `/Type /Catalog` dictionary with `/Pages`.
pub(crate) fn find_catalog(doc: &Document) -> Option<u32> {
    doc.objects()
        .filter(|(_, obj)| {
            obj.as_dict().is_ok_and(|d| {
                d.get("Type").and_then(|t| t.as_name().ok()) == Some("Catalog")
                    && d.contains_key("Pages")
            })
        })
        .map(|(id, _)| id)
        .next_back()
}
