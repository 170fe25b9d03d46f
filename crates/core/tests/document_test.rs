mod common;

use bluepdf_core::compose::{merge, split};
use bluepdf_core::raster::{RenderOptions, render};
use bluepdf_core::{Document, ParseOptions, PdfError};
use common::{XRefLayout, numbered_pages, page_width, pdf15_bytes, pdf_bytes};

fn parse(bytes: &[u8]) -> Document {
    Document::parse(bytes, &ParseOptions::default()).unwrap()
}

fn sample(n: usize) -> Document {
    let contents = numbered_pages(n);
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    parse(&pdf_bytes(&refs))
}

fn widths(doc: &Document) -> Vec<f64> {
    doc.pages().unwrap().iter().map(|p| p.size().0).collect()
}

fn pixels(doc: &Document) -> Vec<Vec<u8>> {
    let options = RenderOptions {
        dpi: 72.0,
        ..RenderOptions::default()
    };
    doc.pages()
        .unwrap()
        .iter()
        .map(|page| render(doc, page, &options).unwrap().image.to_rgb8().into_raw())
        .collect()
}

#[test]
fn reserialized_document_keeps_pages_and_pixels() {
    let doc = sample(3);
    let again = parse(&doc.to_bytes().unwrap());
    assert_eq!(again.page_count(), 3);
    assert_eq!(widths(&again), widths(&doc));
    assert_eq!(pixels(&again), pixels(&doc));
}

#[test]
fn serialization_is_deterministic() {
    let doc = sample(2);
    assert_eq!(doc.to_bytes().unwrap(), doc.to_bytes().unwrap());
}

#[test]
fn broken_startxref_is_recovered() {
    let mut bytes = pdf_bytes(&["0 g 0 0 10 10 re f", "1 g 0 0 10 10 re f"]);
    let pos = bytes.windows(9).rposition(|w| w == b"startxref").unwrap();
    bytes.truncate(pos);
    bytes.extend_from_slice(b"startxref\n999999\n%%EOF\n");
    let doc = parse(&bytes);
    assert_eq!(doc.page_count(), 2);

    let strict = ParseOptions {
        allow_recovery: false,
        ..ParseOptions::default()
    };
    assert!(Document::parse(&bytes, &strict).is_err());
}

#[test]
fn garbage_is_malformed() {
    assert!(matches!(
        Document::parse(b"hello world", &ParseOptions::default()),
        Err(PdfError::MalformedDocument(_))
    ));
}

#[test]
fn full_split_matches_source() {
    let doc = sample(4);
    let whole = split(&doc, 1, 4).unwrap();
    assert_eq!(widths(&whole), widths(&doc));
    assert_eq!(pixels(&whole), pixels(&doc));
}

#[test]
fn merge_concatenates_in_order() {
    let a = sample(2);
    let b = sample(3);
    let merged = merge(&[a, b]).unwrap();
    let expected: Vec<f64> = (0..2).chain(0..3).map(page_width).collect();
    assert_eq!(widths(&merged), expected);

    let reparsed = parse(&merged.to_bytes().unwrap());
    assert_eq!(widths(&reparsed), expected);
}

#[test]
fn xref_streams_and_object_streams_are_read() {
    let contents = numbered_pages(3);
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    let classic = parse(&pdf_bytes(&refs));

    for layout in [XRefLayout::Stream, XRefLayout::Hybrid] {
        let doc = parse(&pdf15_bytes(&refs, layout));
        assert_eq!(doc.version(), "1.5");
        assert_eq!(doc.page_count(), 3);
        assert_eq!(widths(&doc), widths(&classic));
        for (page, content) in doc.pages().unwrap().iter().zip(&refs) {
            assert_eq!(page.content(&doc), format!("{content}\n").into_bytes());
        }
        assert_eq!(pixels(&doc), pixels(&classic));

        let rewritten = parse(&doc.to_bytes().unwrap());
        assert_eq!(widths(&rewritten), widths(&classic));
    }
}

#[test]
fn pdf15_fixture_needs_no_recovery() {
    let contents = numbered_pages(2);
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    let strict = ParseOptions {
        allow_recovery: false,
        ..ParseOptions::default()
    };
    for layout in [XRefLayout::Stream, XRefLayout::Hybrid] {
        let doc = Document::parse(&pdf15_bytes(&refs, layout), &strict).unwrap();
        assert_eq!(doc.page_count(), 2);
    }
}
