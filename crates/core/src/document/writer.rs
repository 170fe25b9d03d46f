//! Deterministic PDF serializer.
//!
//! Objects are written in ascending id order followed by a classic xref
//! table. Dictionary keys are sorted and stream `/Length` is recomputed, so
//! identical documents produce identical bytes. Object streams and xref
//! streams are never produced.

use super::doc::Document;
use super::security::SecurityHandler;
use crate::model::objects::{PDFDict, PDFObject, PDFStream};
use crate::{PdfError, Result};
use std::io::Write;
use std::path::Path;

/// Binary marker line after the header so transfer tools treat the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

impl Document {
    /// Serialize the whole document.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Write the document to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Serialize into `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let base = out.len();
        writeln!(out, "%PDF-{}", self.version)?;
        out.extend_from_slice(BINARY_MARKER);

        let handler = self.security_handler();
        let mut offsets: Vec<(u32, usize)> = Vec::with_capacity(self.objects.len() + 1);
        for (&objid, obj) in &self.objects {
            offsets.push((objid, out.len() - base));
            match handler {
                Some(h) => {
                    let sealed = encrypt_object(h.as_ref(), objid, obj)?;
                    write_indirect(out, objid, &sealed)?;
                }
                None => write_indirect(out, objid, obj)?,
            }
        }

        let mut trailer = self.trailer.clone();
        if let Some(h) = handler {
            let encrypt_id = self
                .max_object_id()
                .checked_add(1)
                .ok_or_else(|| PdfError::InvalidArgument("no object number left for /Encrypt".into()))?;
            offsets.push((encrypt_id, out.len() - base));
            write_indirect(out, encrypt_id, &PDFObject::Dict(h.dictionary().to_dict()))?;
            trailer.insert("Encrypt".into(), PDFObject::reference(encrypt_id));
        }

        let size = offsets.last().map_or(1, |(id, _)| i64::from(*id) + 1);
        trailer.insert("Size".into(), PDFObject::Int(size));
        let xref_offset = out.len() - base;
        write_xref_table(out, &offsets)?;

        out.extend_from_slice(b"trailer\n");
        write_dict(out, &trailer)?;
        writeln!(out, "\nstartxref\n{xref_offset}\n%%EOF")?;
        Ok(())
    }
}

fn write_indirect(out: &mut Vec<u8>, objid: u32, obj: &PDFObject) -> Result<()> {
    writeln!(out, "{objid} 0 obj")?;
    match obj {
        PDFObject::Stream(stream) => write_stream(out, stream)?,
        other => write_object(out, other)?,
    }
    out.extend_from_slice(b"\nendobj\n");
    Ok(())
}

fn write_stream(out: &mut Vec<u8>, stream: &PDFStream) -> Result<()> {
    let data = stream.get_rawdata();
    let mut attrs = stream.attrs.clone();
    attrs.insert("Length".into(), PDFObject::Int(data.len() as i64));
    write_dict(out, &attrs)?;
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
    Ok(())
}

/// `offsets` is sorted by id. Each run of consecutive ids gets its own
/// subsection; ids missing from it are not listed at all.
fn write_xref_table(out: &mut Vec<u8>, offsets: &[(u32, usize)]) -> Result<()> {
    out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f\r\n");
    let mut rest = offsets.iter().skip_while(|(objid, _)| *objid == 0).peekable();
    while let Some(&(first, offset)) = rest.next() {
        let mut run = vec![offset];
        let mut last = first;
        while let Some(&&(objid, offset)) = rest.peek() {
            if Some(objid) != last.checked_add(1) {
                break;
            }
            run.push(offset);
            last = objid;
            rest.next();
        }
        writeln!(out, "{first} {}", run.len())?;
        for offset in run {
            write!(out, "{offset:010} 00000 n\r\n")?;
        }
    }
    Ok(())
}

/// Serialize a direct object.
pub fn write_object(out: &mut Vec<u8>, obj: &PDFObject) -> Result<()> {
    match obj {
        PDFObject::Null => out.extend_from_slice(b"null"),
        PDFObject::Bool(b) => write!(out, "{b}")?,
        PDFObject::Int(n) => write!(out, "{n}")?,
        PDFObject::Real(n) => out.extend_from_slice(format_real(*n).as_bytes()),
        PDFObject::Name(name) => write_name(out, name),
        PDFObject::String(s) => write_string(out, s),
        PDFObject::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item)?;
            }
            out.push(b']');
        }
        PDFObject::Dict(dict) => write_dict(out, dict)?,
        // Streams are only legal as indirect objects; inline, keep the dictionary.
        PDFObject::Stream(stream) => write_dict(out, &stream.attrs)?,
        PDFObject::Ref(r) => write!(out, "{} {} R", r.objid, r.genno)?,
    }
    Ok(())
}

fn write_dict(out: &mut Vec<u8>, dict: &PDFDict) -> Result<()> {
    let mut keys: Vec<&String> = dict.keys().collect();
    keys.sort();
    out.extend_from_slice(b"<<");
    for key in keys {
        write_name(out, key);
        out.push(b' ');
        write_object(out, &dict[key])?;
    }
    out.extend_from_slice(b">>");
    Ok(())
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        let plain = (0x21..=0x7E).contains(&b)
            && !matches!(
                b,
                b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
            );
        if plain {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        }
    }
}

/// Printable strings are written literally, anything else as hex.
fn write_string(out: &mut Vec<u8>, s: &[u8]) {
    let printable = s
        .iter()
        .all(|&b| (0x20..=0x7E).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));
    if !printable {
        out.push(b'<');
        for b in s {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &b in s {
        match b {
            b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', b]),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

/// Shortest fixed-point form with at most six decimals.
pub fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".into();
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".into(),
        t => t.to_string(),
    }
}

/// Encrypt strings and stream payloads of one indirect object.
fn encrypt_object(handler: &dyn SecurityHandler, objid: u32, obj: &PDFObject) -> Result<PDFObject> {
    Ok(match obj {
        PDFObject::String(s) => PDFObject::String(handler.encrypt(objid, 0, s, None)?),
        PDFObject::Array(items) => PDFObject::Array(
            items
                .iter()
                .map(|item| encrypt_object(handler, objid, item))
                .collect::<Result<_>>()?,
        ),
        PDFObject::Dict(dict) => PDFObject::Dict(encrypt_dict(handler, objid, dict)?),
        PDFObject::Stream(stream) => {
            let attrs = encrypt_dict(handler, objid, &stream.attrs)?;
            // Crypt filter selection looks at the clear-text dictionary.
            let data = handler.encrypt(objid, 0, stream.get_rawdata(), Some(&stream.attrs))?;
            PDFStream::new(attrs, data).into()
        }
        other => other.clone(),
    })
}

fn encrypt_dict(handler: &dyn SecurityHandler, objid: u32, dict: &PDFDict) -> Result<PDFDict> {
    dict.iter()
        .map(|(k, v)| Ok((k.clone(), encrypt_object(handler, objid, v)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ParseOptions;

    fn serialize(obj: &PDFObject) -> String {
        let mut out = Vec::new();
        write_object(&mut out, obj).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reals_are_trimmed() {
        assert_eq!(format_real(1.5), "1.5");
        assert_eq!(format_real(2.0), "2");
        assert_eq!(format_real(-0.0000001), "0");
        assert_eq!(format_real(0.1234567), "0.123457");
    }

    #[test]
    fn names_and_strings_are_escaped() {
        assert_eq!(serialize(&PDFObject::name("A B#")), "/A#20B#23");
        assert_eq!(serialize(&PDFObject::String(b"a(b)\\".to_vec())), "(a\\(b\\)\\\\)");
        assert_eq!(serialize(&PDFObject::String(vec![0, 255])), "<00FF>");
    }

    #[test]
    fn dict_keys_are_sorted() {
        let dict = PDFDict::from([
            ("Z".to_string(), PDFObject::Int(1)),
            ("A".to_string(), PDFObject::reference(4)),
        ]);
        assert_eq!(serialize(&PDFObject::Dict(dict)), "<</A 4 0 R/Z 1>>");
    }

    #[test]
    fn output_is_deterministic_and_reparses() {
        let mut doc = Document::new();
        doc.add_object(PDFStream::new(PDFDict::new(), b"data".to_vec()));
        let first = doc.to_bytes().unwrap();
        assert_eq!(first, doc.to_bytes().unwrap());

        let parsed = Document::parse(&first, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.object_count(), 3);
        assert_eq!(parsed.to_bytes().unwrap(), first);
    }

    #[test]
    fn gaps_split_the_xref_into_subsections() {
        let mut doc = Document::new();
        doc.set_object(5, PDFObject::Int(1));
        doc.set_object(6, PDFObject::Int(2));
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("xref\n0 1\n0000000000 65535 f\r\n1 2\n"));
        assert!(text.contains(" 00000 n\r\n5 2\n"));
        assert!(text.contains("/Size 7"));

        let parsed = Document::parse(&bytes, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.get_object(6), Some(&PDFObject::Int(2)));
    }

    #[test]
    fn sparse_high_ids_stay_cheap() {
        let mut doc = Document::new();
        doc.set_object(u32::MAX, PDFObject::Int(1));
        let bytes = doc.to_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("4294967295 1\n"));
        assert!(text.contains("/Size 4294967296"));
    }
}
