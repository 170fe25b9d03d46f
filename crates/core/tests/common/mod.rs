//! Shared fixtures: small PDFs and images written out by hand.

#![allow(dead_code)]

use bluepdf_core::codec::flate_encode;
use std::path::{Path, PathBuf};

/// Width of page `i` (0-based), so pages can be told apart after surgery.
pub fn page_width(i: usize) -> f64 {
    100.0 + 10.0 * i as f64
}

/// A classic-xref PDF with one page per entry of `contents`.
///
/// Page `i` has a MediaBox of `page_width(i)` x 100 and the given content
/// stream.
pub fn pdf_bytes(contents: &[&str]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        contents.len()
    ));
    for (i, content) in contents.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} 100] /Contents {} 0 R >>",
            page_width(i),
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let startxref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            startxref
        )
        .as_bytes(),
    );
    out
}

/// Cross-reference layout written by [`pdf15_bytes`].
#[derive(Debug, Clone, Copy)]
pub enum XRefLayout {
    /// Everything indexed by one `/XRef` stream.
    Stream,
    /// A classic table for the plain objects; `/XRefStm` covers the packed ones.
    Hybrid,
}

/// Same pages as [`pdf_bytes`], written as PDF 1.5.
///
/// The catalog, page tree and page dictionaries live in a Flate `/ObjStm`;
/// the content streams stay plain objects. The `/XRef` stream uses
/// `/W [1 4 2]` rows encoded with the PNG Up predictor.
pub fn pdf15_bytes(contents: &[&str], layout: XRefLayout) -> Vec<u8> {
    let n = contents.len();
    let objstm_id = 3 + 2 * n;
    let xref_id = objstm_id + 1;

    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    let mut packed: Vec<(usize, String)> = vec![
        (1, "<< /Type /Catalog /Pages 2 0 R >>".into()),
        (
            2,
            format!("<< /Type /Pages /Kids [{}] /Count {n} >>", kids.join(" ")),
        ),
    ];
    for i in 0..n {
        packed.push((
            3 + 2 * i,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} 100] /Contents {} 0 R >>",
                page_width(i),
                4 + 2 * i
            ),
        ));
    }
    let mut header = String::new();
    let mut body = String::new();
    for (id, obj) in &packed {
        header.push_str(&format!("{id} {} ", body.len()));
        body.push_str(obj);
        body.push('\n');
    }
    let objstm = flate_encode(format!("{header}{body}").as_bytes()).unwrap();

    let mut out = b"%PDF-1.5\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut direct: Vec<(usize, usize)> = Vec::new();
    for (i, content) in contents.iter().enumerate() {
        direct.push((4 + 2 * i, out.len()));
        out.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                4 + 2 * i,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }
    direct.push((objstm_id, out.len()));
    out.extend_from_slice(
        format!(
            "{objstm_id} 0 obj\n<< /Type /ObjStm /N {} /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            packed.len(),
            header.len(),
            objstm.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&objstm);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    let mut rows = vec![[0u8; 7]; xref_id + 1];
    rows[0] = row(0, 0, 65535);
    for (index, (id, _)) in packed.iter().enumerate() {
        rows[*id] = row(2, objstm_id, index);
    }
    for &(id, offset) in &direct {
        rows[id] = row(1, offset, 0);
    }
    rows[xref_id] = row(1, xref_offset, 0);
    let mut predicted = Vec::with_capacity(rows.len() * 8);
    let mut prev = [0u8; 7];
    for r in &rows {
        predicted.push(2);
        predicted.extend(r.iter().zip(prev).map(|(b, p)| b.wrapping_sub(p)));
        prev = *r;
    }
    let xref = flate_encode(&predicted).unwrap();
    let root = match layout {
        XRefLayout::Stream => " /Root 1 0 R",
        XRefLayout::Hybrid => "",
    };
    out.extend_from_slice(
        format!(
            "{xref_id} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2]{root} /Filter /FlateDecode \
/DecodeParms << /Predictor 12 /Columns 7 >> /Length {} >>\nstream\n",
            xref_id + 1,
            xref.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&xref);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let startxref = match layout {
        XRefLayout::Stream => xref_offset,
        XRefLayout::Hybrid => {
            let table = out.len();
            out.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
            for &(id, offset) in &direct {
                out.extend_from_slice(format!("{id} 1\n{offset:010} 00000 n \n").as_bytes());
            }
            out.extend_from_slice(
                format!(
                    "trailer\n<< /Size {} /Root 1 0 R /XRefStm {xref_offset} >>\n",
                    xref_id + 1
                )
                .as_bytes(),
            );
            table
        }
    };
    out.extend_from_slice(format!("startxref\n{startxref}\n%%EOF\n").as_bytes());
    out
}

/// One `/W [1 4 2]` xref stream row.
fn row(kind: u8, field1: usize, field2: usize) -> [u8; 7] {
    let f1 = (field1 as u32).to_be_bytes();
    let f2 = (field2 as u16).to_be_bytes();
    [kind, f1[0], f1[1], f1[2], f1[3], f2[0], f2[1]]
}

/// `n` pages, each filling a square whose gray level encodes the page.
pub fn numbered_pages(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| format!("{} g 10 10 50 50 re f", i as f64 / n.max(1) as f64))
        .collect()
}

pub fn write_pdf(dir: &Path, name: &str, n: usize) -> PathBuf {
    let contents = numbered_pages(n);
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    let path = dir.join(name);
    std::fs::write(&path, pdf_bytes(&refs)).unwrap();
    path
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_fn(width, height, |x, _| image::Rgb([(x % 256) as u8, 80, 160]))
        .save(&path)
        .unwrap();
    path
}

/// Names of the files in `dir`, sorted.
pub fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
