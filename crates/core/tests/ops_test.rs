mod common;

use bluepdf_core::api;
use bluepdf_core::document::KeyLength;
use bluepdf_core::engine::CancellationToken;
use bluepdf_core::raster::CompressionLevel;
use bluepdf_core::{Document, ParseOptions, PdfError};
use common::{files_in, page_width, write_pdf, write_png};

fn open(path: &std::path::Path) -> Document {
    Document::load(path, &ParseOptions::default()).unwrap()
}

#[test]
fn three_pages_to_images_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "three.pdf", 3);
    let scratch = dir.path().join("scratch");

    let images = api::pdf_to_images(
        &input,
        CompressionLevel::Low,
        &scratch,
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(images.paths.len(), 3);
    assert!(images.failures.is_empty());
    assert!(images.issues.is_empty());
    for (i, path) in images.paths.iter().enumerate() {
        let img = image::open(path).unwrap();
        assert_eq!(f64::from(img.width()), page_width(i));
        assert_eq!(img.height(), 100);
    }
    assert_eq!(files_in(&scratch).len(), 3);
}

#[test]
fn cancelled_export_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "two.pdf", 2);
    let scratch = dir.path().join("scratch");
    let token = CancellationToken::new();
    token.cancel();
    assert!(matches!(
        api::pdf_to_images(&input, CompressionLevel::Low, &scratch, &token),
        Err(PdfError::Cancelled)
    ));
    assert!(files_in(&scratch).is_empty());
}

#[test]
fn invalid_split_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "four.pdf", 4);
    let scratch = dir.path().join("scratch");

    for (start, end) in [(0, 2), (3, 2), (2, 5)] {
        assert!(matches!(
            api::split_pdf(&input, start, end, &scratch),
            Err(PdfError::InvalidRange { page_count: 4, .. })
        ));
    }
    assert!(files_in(&scratch).is_empty());

    let part = api::split_pdf(&input, 2, 3, &scratch).unwrap();
    let widths: Vec<f64> = open(&part).pages().unwrap().iter().map(|p| p.size().0).collect();
    assert_eq!(widths, [page_width(1), page_width(2)]);
}

#[test]
fn merge_with_encrypted_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let plain = write_pdf(dir.path(), "plain.pdf", 1);
    let locked = api::encrypt_pdf(&plain, "secret", KeyLength::Aes256, dir.path()).unwrap();
    let scratch = dir.path().join("scratch");

    assert!(matches!(
        api::merge_pdf(&[plain.clone(), locked], &scratch),
        Err(PdfError::EncryptedInput)
    ));
    assert!(files_in(&scratch).is_empty());

    let merged = api::merge_pdf(&[plain.clone(), plain], &scratch).unwrap();
    assert_eq!(open(&merged).page_count(), 2);
}

#[test]
fn encrypt_then_decrypt() {
    for key_length in [KeyLength::Aes128, KeyLength::Aes256] {
        let dir = tempfile::tempdir().unwrap();
        let plain = write_pdf(dir.path(), "plain.pdf", 2);
        let original = std::fs::read(&plain).unwrap();

        let locked = api::encrypt_pdf(&plain, "secret", key_length, dir.path()).unwrap();
        assert!(matches!(
            Document::load(&locked, &ParseOptions::default()),
            Err(PdfError::InvalidPassword)
        ));
        assert!(matches!(
            api::encrypt_pdf(&locked, "again", key_length, dir.path()),
            Err(PdfError::AlreadyEncrypted)
        ));
        assert!(matches!(
            api::pdf_to_images(&locked, CompressionLevel::Low, dir.path(), &CancellationToken::new()),
            Err(PdfError::EncryptedInput)
        ));

        let before = files_in(dir.path());
        assert!(matches!(
            api::decrypt_pdf(&locked, "wrong", dir.path()),
            Err(PdfError::InvalidPassword)
        ));
        assert_eq!(files_in(dir.path()), before);

        let unlocked = api::decrypt_pdf(&locked, "secret", dir.path()).unwrap();
        let doc = open(&unlocked);
        assert!(!doc.is_encrypted());
        let original = Document::parse(&original, &ParseOptions::default()).unwrap();
        for (a, b) in doc.pages().unwrap().iter().zip(original.pages().unwrap()) {
            assert_eq!(a.content(&doc), b.content(&original));
            assert_eq!(a.media_box, b.media_box);
        }
    }
}

#[test]
fn images_become_pages() {
    let dir = tempfile::tempdir().unwrap();
    let wide = write_png(dir.path(), "wide.png", 1600, 400);
    let tall = write_png(dir.path(), "tall.png", 300, 600);
    let missing = dir.path().join("missing.png");

    let pdf = api::image_to_pdf(&[wide, missing, tall], CompressionLevel::Low, dir.path()).unwrap();
    let doc = open(&pdf);
    let sizes: Vec<(f64, f64)> = doc.pages().unwrap().iter().map(|p| p.size()).collect();
    // Low clamps to 800x1200; smaller images keep their size.
    assert_eq!(sizes, [(800.0, 200.0), (300.0, 600.0)]);
}

#[test]
fn reorder_and_rotate_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "three.pdf", 3);

    let reordered = api::reorder_pdf(&input, &[3, 1, 2], dir.path()).unwrap();
    let widths: Vec<f64> = open(&reordered).pages().unwrap().iter().map(|p| p.size().0).collect();
    assert_eq!(widths, [page_width(2), page_width(0), page_width(1)]);

    let rotated = api::rotate_pdf(&input, 90, dir.path()).unwrap();
    let first = open(&rotated).page(0).unwrap();
    assert_eq!(first.rotate, 90);
    assert_eq!(first.size(), (100.0, page_width(0)));
}

#[test]
fn async_variants_match_blocking_ones() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "two.pdf", 2);
    let scratch = dir.path().to_path_buf();

    let part = pollster::block_on(api::split_pdf_async(input.clone(), 2, 2, scratch.clone())).unwrap();
    assert_eq!(open(&part).page_count(), 1);

    let images = pollster::block_on(api::pdf_to_images_async(
        input.clone(),
        CompressionLevel::Low,
        scratch.clone(),
        CancellationToken::new(),
    ))
    .unwrap();
    assert_eq!(images.paths.len(), 2);

    let info = pollster::block_on(api::pdf_info_async(input, None)).unwrap();
    assert_eq!(info.page_count, 2);
    assert_eq!(info.version, "1.4");
}
