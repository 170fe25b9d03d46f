//! PDF file reader: header, xref chain, object streams, decryption.
//!
//! When the xref chain is missing or unusable the reader falls back to a
//! linear scan for `N G obj` headers (see [`super::repair`]).

use super::doc::{Document, MAX_OBJECT_ID};
use super::repair;
use super::security::{SecurityHandler, open_security_handler};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream, dict_int};
use crate::parser::lexer::is_whitespace;
use crate::parser::{PDFParser, Token};
use crate::{PdfError, Result};
use bytes::Bytes;
use memmap2::Mmap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Files larger than this are memory-mapped instead of read into memory.
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// How far into the file the `%PDF-` header may start.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Options for [`Document::parse`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Password for encrypted files. `None` tries the empty user password.
    pub password: Option<String>,
    /// Scan for objects when the xref chain is unusable.
    pub allow_recovery: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            password: None,
            allow_recovery: true,
        }
    }
}

impl ParseOptions {
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }
}

/// Where an object lives according to the cross-reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XRefEntry {
    /// Byte offset of `N G obj`.
    Offset { offset: usize, genno: u32 },
    /// Index inside an object stream.
    Compressed { stream_objid: u32, index: usize },
}

/// One xref section plus its trailer.
#[derive(Debug, Default)]
pub(crate) struct XRefSection {
    pub(crate) entries: HashMap<u32, XRefEntry>,
    pub(crate) trailer: PDFDict,
}

impl Document {
    /// Parse a complete PDF file.
    pub fn parse(data: &[u8], options: &ParseOptions) -> Result<Self> {
        let version = read_header(data)?;
        let (entries, trailer) = match load_xref_chain(data) {
            Ok(found) => found,
            Err(e) if options.allow_recovery => {
                warn!(error = %e, "xref chain unusable, scanning for objects");
                repair::scan_objects(data)?
            }
            Err(e) => return Err(e),
        };

        let doc = match build_document(data, version.clone(), &entries, trailer, options) {
            Err(PdfError::MalformedDocument(msg)) if options.allow_recovery => {
                warn!(%msg, "document structure broken, scanning for objects");
                let (entries, trailer) = repair::scan_objects(data)?;
                build_document(data, version, &entries, trailer, options)?
            }
            other => other?,
        };
        debug!(
            version = doc.version(),
            objects = doc.object_count(),
            encrypted = doc.is_encrypted(),
            "parsed document"
        );
        Ok(doc)
    }

    /// Read a file from disk, memory-mapping it above [`MMAP_THRESHOLD`].
    pub fn load(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();
        if len > MMAP_THRESHOLD {
            debug!(path = %path.display(), len, "memory-mapping large input");
            // SAFETY: the mapping is read-only and dropped before returning.
            let mmap = unsafe { Mmap::map(&file)? };
            Self::parse(&mmap, options)
        } else {
            let data = std::fs::read(path)?;
            Self::parse(&data, options)
        }
    }
}

fn read_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
    let start = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| PdfError::MalformedDocument("missing %PDF- header".into()))?;
    let version: String = data[start + 5..]
        .iter()
        .take(8)
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| char::from(b))
        .collect();
    let supported = match version.split_once('.') {
        Some(("1", minor)) => minor.len() == 1 && minor.as_bytes()[0].is_ascii_digit(),
        Some(("2", "0")) => true,
        _ => false,
    };
    if supported {
        Ok(version)
    } else {
        Err(PdfError::UnsupportedVersion(version))
    }
}

/// Offset named by the last `startxref` in the file tail.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let needle = b"startxref";
    let tail_start = data.len().saturating_sub(HEADER_SEARCH_LIMIT);
    let tail = &data[tail_start..];
    let pos = tail
        .windows(needle.len())
        .rposition(|w| w == needle)
        .ok_or(PdfError::NoValidXRef)?;
    let mut parser = PDFParser::new(&tail[pos + needle.len()..]);
    let offset = parser
        .parse_object()
        .and_then(|o| o.as_int())
        .map_err(|_| PdfError::NoValidXRef)?;
    usize::try_from(offset)
        .ok()
        .filter(|&o| o < data.len())
        .ok_or(PdfError::NoValidXRef)
}

/// Follow `startxref`, `/Prev` and `/XRefStm`. Newer sections win.
fn load_xref_chain(data: &[u8]) -> Result<(HashMap<u32, XRefEntry>, PDFDict)> {
    let mut pos = find_startxref(data)?;
    let mut visited = HashSet::new();
    let mut sections = Vec::new();

    while visited.insert(pos) {
        let section = load_xref_at(data, pos)?;
        let xref_stm = dict_int(&section.trailer, "XRefStm").and_then(|p| usize::try_from(p).ok());
        let prev = dict_int(&section.trailer, "Prev").and_then(|p| usize::try_from(p).ok());
        sections.push(section);

        // Hybrid files: the stream fills in what the table omits.
        if let Some(stm) = xref_stm
            && visited.insert(stm)
        {
            match load_xref_stream(data, stm) {
                Ok(section) => sections.push(section),
                Err(e) => warn!(offset = stm, error = %e, "skipping unreadable XRefStm"),
            }
        }

        match prev {
            Some(p) if p < data.len() => pos = p,
            _ => break,
        }
    }

    let mut entries = HashMap::new();
    let mut trailer = PDFDict::new();
    for section in sections {
        for (objid, entry) in section.entries {
            entries.entry(objid).or_insert(entry);
        }
        for (key, value) in section.trailer {
            trailer.entry(key).or_insert(value);
        }
    }
    if entries.is_empty() || !trailer.contains_key("Root") {
        return Err(PdfError::NoValidXRef);
    }
    Ok((entries, trailer))
}

fn load_xref_at(data: &[u8], pos: usize) -> Result<XRefSection> {
    let at = skip_whitespace(data, pos);
    if data[at..].starts_with(b"xref") {
        load_xref_table(data, at + 4)
    } else {
        load_xref_stream(data, at)
    }
}

/// Traditional `xref` table followed by `trailer << ... >>`.
fn load_xref_table(data: &[u8], pos: usize) -> Result<XRefSection> {
    let mut section = XRefSection::default();
    let mut parser = PDFParser::new(&data[pos..]);

    loop {
        let start = match parser.next_keyword()? {
            Some(Token::Int(n)) => n,
            Some(tok) if tok.is_keyword(b"trailer") => break,
            _ => return Err(PdfError::NoValidXRef),
        };
        let Some(Token::Int(count)) = parser.next_keyword()? else {
            return Err(PdfError::NoValidXRef);
        };
        let mut base = u32::try_from(start).map_err(|_| PdfError::NoValidXRef)?;
        for i in 0..u32::try_from(count).map_err(|_| PdfError::NoValidXRef)? {
            let (Some(Token::Int(offset)), Some(Token::Int(genno)), Some(Token::Keyword(kind))) = (
                parser.next_keyword()?,
                parser.next_keyword()?,
                parser.next_keyword()?,
            ) else {
                return Err(PdfError::NoValidXRef);
            };
            // Subsections that start at 1 but still list the object 0 free
            // entry are shifted back by one.
            if i == 0 && base > 0 && kind == b"f" && offset == 0 && genno == 65535 {
                base -= 1;
            }
            if kind == b"n" && offset > 0 {
                section.entries.insert(
                    base + i,
                    XRefEntry::Offset {
                        offset: offset as usize,
                        genno: genno as u32,
                    },
                );
            }
        }
    }

    section.trailer = parser
        .parse_object()
        .and_then(|t| t.as_dict().cloned())
        .map_err(|_| PdfError::NoValidXRef)?;
    Ok(section)
}

/// Cross-reference stream (PDF 1.5).
pub(crate) fn load_xref_stream(data: &[u8], pos: usize) -> Result<XRefSection> {
    let (_, _, obj) = parse_indirect_at(data, pos, &|_| None)?;
    let stream = obj.as_stream()?;
    if stream.type_name() != Some("XRef") {
        return Err(PdfError::NoValidXRef);
    }
    let widths: Vec<usize> = stream
        .get("W")
        .ok_or(PdfError::NoValidXRef)?
        .as_array()?
        .iter()
        .map(|w| w.as_int().map(|n| n.max(0) as usize))
        .collect::<Result<_>>()?;
    let [w0, w1, w2] = widths[..] else {
        return Err(PdfError::NoValidXRef);
    };
    let size = dict_int(&stream.attrs, "Size").ok_or(PdfError::NoValidXRef)?;
    let index: Vec<(i64, i64)> = match stream.get("Index").and_then(|i| i.as_array().ok()) {
        Some(arr) => arr
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_int().ok()?, pair[1].as_int().ok()?)))
            .collect(),
        None => vec![(0, size)],
    };

    let body = stream.decode()?;
    let entry_size = w0 + w1 + w2;
    let mut section = XRefSection::default();
    let mut rows = body.chunks_exact(entry_size.max(1));
    'subsections: for (start, count) in index {
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                break 'subsections;
            };
            let Ok(objid) = u32::try_from(start + i) else {
                continue;
            };
            let kind = if w0 == 0 { 1 } else { be_int(&row[..w0]) };
            let field1 = be_int(&row[w0..w0 + w1]);
            let field2 = be_int(&row[w0 + w1..]);
            let entry = match kind {
                1 => XRefEntry::Offset {
                    offset: field1 as usize,
                    genno: field2 as u32,
                },
                2 => XRefEntry::Compressed {
                    stream_objid: field1 as u32,
                    index: field2 as usize,
                },
                _ => continue,
            };
            section.entries.insert(objid, entry);
        }
    }

    section.trailer = stream
        .attrs
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "Length" | "Filter" | "DecodeParms" | "W" | "Index" | "Type"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(section)
}

fn be_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

fn skip_whitespace(data: &[u8], mut pos: usize) -> usize {
    while data.get(pos).is_some_and(|&b| is_whitespace(b)) {
        pos += 1;
    }
    pos
}

/// Parse `N G obj <object> [stream ... endstream]` at `offset`.
///
/// `length_of` resolves an indirect `/Length`.
pub(crate) fn parse_indirect_at(
    data: &[u8],
    offset: usize,
    length_of: &dyn Fn(PDFObjRef) -> Option<usize>,
) -> Result<(u32, u32, PDFObject)> {
    let body = data
        .get(offset..)
        .ok_or_else(|| PdfError::MalformedDocument(format!("offset {offset} past end of file")))?;
    let mut parser = PDFParser::new(body);
    let objid = parser.parse_object()?.as_int()?;
    let genno = parser.parse_object()?.as_int()?;
    if !parser.next_keyword()?.is_some_and(|t| t.is_keyword(b"obj")) {
        return Err(PdfError::MalformedDocument(format!(
            "expected 'obj' at offset {offset}"
        )));
    }
    let (Ok(objid), Ok(genno)) = (u32::try_from(objid), u32::try_from(genno)) else {
        return Err(PdfError::MalformedDocument(format!(
            "bad object header at offset {offset}"
        )));
    };
    let obj = parser.parse_object()?;

    let PDFObject::Dict(dict) = obj else {
        return Ok((objid, genno, obj));
    };
    let after = offset + parser.tell();
    let kw = skip_whitespace(data, after);
    if !data[kw..].starts_with(b"stream") {
        return Ok((objid, genno, PDFObject::Dict(dict)));
    }
    let mut start = kw + 6;
    if data.get(start) == Some(&b'\r') {
        start += 1;
    }
    if data.get(start) == Some(&b'\n') {
        start += 1;
    }

    let declared = match dict.get("Length") {
        Some(PDFObject::Int(n)) => usize::try_from(*n).ok(),
        Some(PDFObject::Ref(r)) => length_of(*r),
        _ => None,
    };
    let end = declared
        .map(|len| start + len)
        .filter(|&end| end <= data.len() && data[skip_whitespace(data, end)..].starts_with(b"endstream"))
        .or_else(|| find_endstream(data, start))
        .unwrap_or(data.len());
    let raw = Bytes::copy_from_slice(&data[start..end]);
    Ok((objid, genno, PDFStream::new(dict, raw).into()))
}

/// End of stream data: the byte before `endstream`, minus one EOL.
fn find_endstream(data: &[u8], from: usize) -> Option<usize> {
    let needle = b"endstream";
    let rel = data[from..].windows(needle.len()).position(|w| w == needle)?;
    let mut end = from + rel;
    if end > from && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > from && data[end - 1] == b'\r' {
        end -= 1;
    }
    Some(end)
}

/// Load every object named by `entries`, decrypt, expand object streams.
fn build_document(
    data: &[u8],
    version: String,
    entries: &HashMap<u32, XRefEntry>,
    mut trailer: PDFDict,
    options: &ParseOptions,
) -> Result<Document> {
    let length_of = |r: PDFObjRef| match entries.get(&r.objid) {
        Some(XRefEntry::Offset { offset, .. }) => {
            parse_indirect_at(data, *offset, &|_| None)
                .ok()
                .and_then(|(_, _, o)| o.as_int().ok())
                .and_then(|n| usize::try_from(n).ok())
        }
        _ => None,
    };

    let mut ids: Vec<u32> = entries
        .keys()
        .copied()
        .filter(|&objid| {
            let usable = objid <= MAX_OBJECT_ID;
            if !usable {
                warn!(objid, "object number above the PDF limit, dropped");
            }
            usable
        })
        .collect();
    ids.sort_unstable();
    let mut direct: BTreeMap<u32, (u32, PDFObject)> = BTreeMap::new();
    for &objid in &ids {
        let Some(&XRefEntry::Offset { offset, .. }) = entries.get(&objid) else {
            continue;
        };
        match parse_indirect_at(data, offset, &length_of) {
            Ok((found, genno, obj)) if found == objid => {
                direct.insert(objid, (genno, obj));
            }
            Ok((found, ..)) => {
                warn!(objid, found, offset, "xref entry points at a different object");
            }
            Err(e) => warn!(objid, offset, error = %e, "skipping unreadable object"),
        }
    }

    let security = open_encryption(&mut direct, &trailer, options)?;
    if let Some(handler) = &security {
        for (&objid, (genno, obj)) in direct.iter_mut() {
            decrypt_object(handler.as_ref(), objid, *genno, obj)?;
        }
    }

    let mut objects: BTreeMap<u32, PDFObject> = BTreeMap::new();
    let mut objstm_cache: HashMap<u32, Vec<(u32, PDFObject)>> = HashMap::new();
    for &objid in &ids {
        match entries.get(&objid) {
            Some(XRefEntry::Offset { .. }) => {
                if let Some((_, obj)) = direct.get(&objid) {
                    objects.insert(objid, obj.clone());
                }
            }
            Some(&XRefEntry::Compressed {
                stream_objid,
                index,
            }) => {
                let members = objstm_cache.entry(stream_objid).or_insert_with(|| {
                    direct
                        .get(&stream_objid)
                        .and_then(|(_, o)| o.as_stream().ok())
                        .map(expand_object_stream)
                        .transpose()
                        .unwrap_or_else(|e| {
                            warn!(stream_objid, error = %e, "unreadable object stream");
                            None
                        })
                        .unwrap_or_default()
                });
                let found = members
                    .get(index)
                    .filter(|(id, _)| *id == objid)
                    .or_else(|| members.iter().find(|(id, _)| *id == objid));
                match found {
                    Some((_, obj)) => {
                        objects.insert(objid, obj.clone());
                    }
                    None => warn!(objid, stream_objid, "object missing from object stream"),
                }
            }
            None => {}
        }
    }

    // Cross-reference and object streams are rebuilt on write.
    objects.retain(|_, obj| {
        !matches!(obj, PDFObject::Stream(s) if matches!(s.type_name(), Some("XRef" | "ObjStm")))
    });
    if let Some(PDFObject::Ref(r)) = trailer.get("Encrypt") {
        objects.remove(&r.objid);
    }

    trailer.retain(|key, _| matches!(key.as_str(), "Root" | "Info" | "ID"));
    for obj in objects.values_mut() {
        normalize_generations(obj);
    }
    for value in trailer.values_mut() {
        normalize_generations(value);
    }

    let mut doc = Document {
        version,
        objects,
        trailer,
        security,
    };
    if !matches!(doc.trailer.get("Root"), Some(PDFObject::Ref(_)))
        && let Some(root) = repair::find_catalog(&doc)
    {
        doc.trailer.insert("Root".into(), PDFObject::reference(root));
    }
    doc.catalog()
        .map_err(|e| PdfError::MalformedDocument(format!("no usable catalog: {e}")))?;
    Ok(doc)
}

fn open_encryption(
    direct: &mut BTreeMap<u32, (u32, PDFObject)>,
    trailer: &PDFDict,
    options: &ParseOptions,
) -> Result<Option<Arc<dyn SecurityHandler>>> {
    let encrypt = match trailer.get("Encrypt") {
        None | Some(PDFObject::Null) => return Ok(None),
        Some(PDFObject::Ref(r)) => direct
            .get(&r.objid)
            .map(|(_, o)| o.clone())
            .ok_or(PdfError::ObjectNotFound(r.objid))?,
        Some(obj) => obj.clone(),
    };
    let encrypt = encrypt.as_dict()?;
    let docid = trailer
        .get("ID")
        .and_then(|id| id.as_array().ok())
        .and_then(|arr| arr.first())
        .and_then(|first| first.as_string().ok())
        .unwrap_or_default();
    let password = options.password.as_deref().unwrap_or("");
    let handler = open_security_handler(encrypt, docid, password)?;
    debug!(algorithm = %handler.dictionary().algorithm(), "opened encrypted document");
    Ok(Some(handler))
}

/// Decrypt strings and stream payloads of one indirect object in place.
pub(crate) fn decrypt_object(
    handler: &dyn SecurityHandler,
    objid: u32,
    genno: u32,
    obj: &mut PDFObject,
) -> Result<()> {
    match obj {
        PDFObject::String(s) => *s = handler.decrypt(objid, genno, s, None)?,
        PDFObject::Array(items) => {
            for item in items {
                decrypt_object(handler, objid, genno, item)?;
            }
        }
        PDFObject::Dict(dict) => {
            for value in dict.values_mut() {
                decrypt_object(handler, objid, genno, value)?;
            }
        }
        PDFObject::Stream(stream) => {
            for value in stream.attrs.values_mut() {
                decrypt_object(handler, objid, genno, value)?;
            }
            let plain = handler.decrypt(objid, genno, stream.get_rawdata(), Some(&stream.attrs))?;
            stream.set_rawdata(plain);
        }
        _ => {}
    }
    Ok(())
}

/// Objects stored in an `/ObjStm`, in header order.
fn expand_object_stream(stream: &PDFStream) -> Result<Vec<(u32, PDFObject)>> {
    let n = stream
        .get("N")
        .and_then(|v| v.as_int().ok())
        .ok_or_else(|| PdfError::MalformedDocument("missing N in ObjStm".into()))?;
    let first = stream
        .get("First")
        .and_then(|v| v.as_int().ok())
        .and_then(|f| usize::try_from(f).ok())
        .ok_or_else(|| PdfError::MalformedDocument("missing First in ObjStm".into()))?;
    let body = stream.decode()?;
    if first > body.len() {
        return Err(PdfError::MalformedDocument("ObjStm First past end".into()));
    }

    let mut header = PDFParser::new(&body[..first]);
    let mut members = Vec::new();
    for _ in 0..n {
        let (Ok(objid), Ok(offset)) = (
            header.parse_object().and_then(|o| o.as_int()),
            header.parse_object().and_then(|o| o.as_int()),
        ) else {
            break;
        };
        let (Ok(objid), Ok(offset)) = (u32::try_from(objid), usize::try_from(offset)) else {
            continue;
        };
        let Some(slice) = body.get(first + offset..) else {
            continue;
        };
        match PDFParser::new(slice).parse_object() {
            Ok(obj) => members.push((objid, obj)),
            Err(e) => warn!(objid, error = %e, "unreadable object in object stream"),
        }
    }
    Ok(members)
}

fn normalize_generations(obj: &mut PDFObject) {
    obj.map_refs(&mut |r| PDFObject::Ref(PDFObjRef::new(r.objid, 0)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_versions() {
        assert_eq!(read_header(b"%PDF-1.4\n").unwrap(), "1.4");
        assert_eq!(read_header(b"junk\n%PDF-2.0\n").unwrap(), "2.0");
        assert!(matches!(
            read_header(b"%PDF-3.1\n"),
            Err(PdfError::UnsupportedVersion(v)) if v == "3.1"
        ));
        assert!(matches!(
            read_header(b"hello world"),
            Err(PdfError::MalformedDocument(_))
        ));
    }

    #[test]
    fn header_beyond_first_kilobyte_is_rejected() {
        let mut data = vec![b' '; 2048];
        data.extend_from_slice(b"%PDF-1.7\n");
        assert!(matches!(
            read_header(&data),
            Err(PdfError::MalformedDocument(_))
        ));
    }

    #[test]
    fn indirect_stream_uses_declared_length() {
        let data = b"7 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let (id, genno, obj) = parse_indirect_at(data, 0, &|_| None).unwrap();
        assert_eq!((id, genno), (7, 0));
        assert_eq!(obj.as_stream().unwrap().get_rawdata(), b"hello");
    }

    #[test]
    fn indirect_stream_with_wrong_length_scans_for_endstream() {
        let data = b"7 0 obj\n<< /Length 99 >>\nstream\r\nhello\r\nendstream\nendobj\n";
        let (_, _, obj) = parse_indirect_at(data, 0, &|_| None).unwrap();
        assert_eq!(obj.as_stream().unwrap().get_rawdata(), b"hello");
    }

    #[test]
    fn object_stream_members_are_expanded() {
        let body = b"11 0 12 3 42 (hi)";
        let stream = PDFStream::new(
            PDFDict::from([
                ("Type".to_string(), PDFObject::name("ObjStm")),
                ("N".to_string(), PDFObject::Int(2)),
                ("First".to_string(), PDFObject::Int(10)),
            ]),
            body.to_vec(),
        );
        let members = expand_object_stream(&stream).unwrap();
        assert_eq!(members[0], (11, PDFObject::Int(42)));
        assert_eq!(members[1], (12, PDFObject::String(b"hi".to_vec())));
    }

    #[test]
    fn xref_table_with_shifted_subsection() {
        let data = b"xref\n1 2\n0000000000 65535 f \n0000000017 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\n";
        let section = load_xref_table(data, 4).unwrap();
        assert_eq!(
            section.entries.get(&1),
            Some(&XRefEntry::Offset {
                offset: 17,
                genno: 0
            })
        );
        assert!(section.trailer.contains_key("Root"));
    }

    #[test]
    fn object_numbers_above_the_limit_are_dropped() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
4294967295 0 obj\n(huge)\nendobj\n\
trailer\n<< /Root 1 0 R >>\n%%EOF\n";
        let doc = Document::parse(data, &ParseOptions::default()).unwrap();
        assert_eq!(doc.max_object_id(), 2);
        assert_eq!(doc.get_object(u32::MAX), None);
        let again = Document::parse(&doc.to_bytes().unwrap(), &ParseOptions::default()).unwrap();
        assert_eq!(again.object_count(), 2);
    }
}
