//! File level operations.
//!
//! Each operation reads its inputs from disk, writes one or more outputs
//! into the caller's scratch directory and returns their paths. Nothing is
//! published on failure.

use super::output::{OutputFile, write_output};
use crate::compose;
use crate::document::{self, Document, DocumentInfo, EncryptOptions, KeyLength, ParseOptions};
use crate::engine::{self, CancellationToken};
use crate::raster::{CompressionLevel, RenderError, RenderOptions, encode_jpeg, load_image};
use crate::{PdfError, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// A page that could not be written by [`pdf_to_images`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PageFailure {
    /// 1-based page number.
    pub page: usize,
    pub message: String,
}

/// Output of [`pdf_to_images`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PageImages {
    /// JPEG files of the pages that rendered, in page order.
    pub paths: Vec<PathBuf>,
    pub failures: Vec<PageFailure>,
    /// Content that could not be drawn on otherwise successful pages.
    pub issues: Vec<RenderError>,
}

/// Open a document without a password; a password-protected file is
/// reported as `when_locked`.
fn open_unlocked(path: &Path, when_locked: PdfError) -> Result<Document> {
    match Document::load(path, &ParseOptions::default()) {
        Err(PdfError::InvalidPassword) => Err(when_locked),
        other => other,
    }
}

fn save(doc: &Document, scratch: &Path, prefix: &str) -> Result<PathBuf> {
    let bytes = doc.to_bytes()?;
    let path = write_output(scratch, prefix, "pdf", &bytes)?;
    info!(path = %path.display(), pages = doc.page_count(), "wrote {prefix} document");
    Ok(path)
}

/// Convert images to a PDF with one page per image.
///
/// Images that are missing or cannot be decoded are skipped; at least one
/// must load.
pub fn image_to_pdf(
    paths: &[PathBuf],
    level: CompressionLevel,
    scratch: &Path,
) -> Result<PathBuf> {
    let loaded: Vec<Result<_>> = engine::install(|| {
        paths
            .par_iter()
            .map(|path| load_image(path, level))
            .collect()
    });
    let mut images = Vec::with_capacity(loaded.len());
    for (path, result) in paths.iter().zip(loaded) {
        match result {
            Ok(image) => images.push(image),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping image"),
        }
    }
    if images.is_empty() {
        return Err(PdfError::InvalidArgument("no readable images".into()));
    }
    let doc = compose::images_to_document(&images, Some(level.jpeg_quality()))?;
    save(&doc, scratch, "images")
}

/// Merge PDFs in the given order. Paths that do not exist are skipped.
pub fn merge_pdf(paths: &[PathBuf], scratch: &Path) -> Result<PathBuf> {
    let existing: Vec<&PathBuf> = paths
        .iter()
        .filter(|p| {
            let found = p.is_file();
            if !found {
                warn!(path = %p.display(), "merge input not found, skipping");
            }
            found
        })
        .collect();
    if existing.is_empty() {
        return Err(PdfError::InvalidArgument("no existing input files".into()));
    }
    let docs = existing
        .iter()
        .map(|p| open_unlocked(p, PdfError::EncryptedInput))
        .collect::<Result<Vec<_>>>()?;
    let merged = compose::merge(&docs)?;
    save(&merged, scratch, "merged")
}

/// Protect a PDF with `password` used as both user and owner password.
pub fn encrypt_pdf(
    path: &Path,
    password: &str,
    key_length: KeyLength,
    scratch: &Path,
) -> Result<PathBuf> {
    let doc = open_unlocked(path, PdfError::AlreadyEncrypted)?;
    let encrypted = document::encrypt(&doc, &EncryptOptions::new(password, key_length))?;
    save(&encrypted, scratch, "encrypted")
}

/// Remove the password protection of a PDF.
pub fn decrypt_pdf(path: &Path, password: &str, scratch: &Path) -> Result<PathBuf> {
    let doc = Document::load(path, &ParseOptions::with_password(password))?;
    if !doc.is_encrypted() {
        return Err(PdfError::NotEncrypted);
    }
    let plain = document::decrypt(&doc, password)?;
    save(&plain, scratch, "decrypted")
}

/// Pages `start..=end` (1-indexed) as a new PDF.
pub fn split_pdf(path: &Path, start: usize, end: usize, scratch: &Path) -> Result<PathBuf> {
    let doc = open_unlocked(path, PdfError::EncryptedInput)?;
    let part = compose::split(&doc, start, end)?;
    save(&part, scratch, "split")
}

/// Pages in the given 1-indexed order as a new PDF.
pub fn reorder_pdf(path: &Path, order: &[usize], scratch: &Path) -> Result<PathBuf> {
    let doc = open_unlocked(path, PdfError::EncryptedInput)?;
    let reordered = compose::reorder(&doc, order)?;
    save(&reordered, scratch, "reordered")
}

/// Every page rotated clockwise by `degrees`.
pub fn rotate_pdf(path: &Path, degrees: i64, scratch: &Path) -> Result<PathBuf> {
    let doc = open_unlocked(path, PdfError::EncryptedInput)?;
    let rotated = compose::rotate(&doc, degrees)?;
    save(&rotated, scratch, "rotated")
}

/// Document facts; `password` is needed for protected files.
pub fn pdf_info(path: &Path, password: Option<&str>) -> Result<DocumentInfo> {
    let options = match password {
        Some(pw) => ParseOptions::with_password(pw),
        None => ParseOptions::default(),
    };
    Document::load(path, &options)?.info()
}

/// Render every page to a JPEG.
///
/// Pages that fail are listed in [`PageImages::failures`]. When `cancel`
/// fires, pages already written are deleted and `Cancelled` is returned.
pub fn pdf_to_images(
    path: &Path,
    level: CompressionLevel,
    scratch: &Path,
    cancel: &CancellationToken,
) -> Result<PageImages> {
    let doc = open_unlocked(path, PdfError::EncryptedInput)?;
    if doc.is_encrypted() {
        return Err(PdfError::EncryptedInput);
    }
    let options = RenderOptions::from(level);
    let quality = level.jpeg_quality();
    let written: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

    let results = compose::extract_pages_with(&doc, &options, cancel, |rendered| {
        let jpeg = encode_jpeg(&rendered.image, quality)?;
        let mut out = OutputFile::create(scratch, "page", "jpg")?;
        out.write_all(&jpeg)?;
        let path = out.publish()?;
        if let Ok(mut written) = written.lock() {
            written.push(path.clone());
        }
        Ok((path, rendered.issues))
    });

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            let written = written.into_inner().unwrap_or_else(|p| p.into_inner());
            for path in &written {
                if let Err(err) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %err, "could not remove page image");
                }
            }
            return Err(e);
        }
    };

    let mut images = PageImages::default();
    for result in results {
        match result.outcome {
            Ok((path, issues)) => {
                images.paths.push(path);
                images.issues.extend(issues);
            }
            Err(e) => images.failures.push(PageFailure {
                page: result.page,
                message: e.to_string(),
            }),
        }
    }
    info!(
        pages = images.paths.len(),
        failed = images.failures.len(),
        "rendered page images"
    );
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page_pdf(dir: &Path) -> PathBuf {
        let doc = compose::images_to_document(
            &[image::DynamicImage::ImageRgb8(image::RgbImage::new(20, 10))],
            None,
        )
        .unwrap();
        let path = dir.join("one.pdf");
        doc.save(&path).unwrap();
        path
    }

    #[test]
    fn merge_skips_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_page_pdf(dir.path());
        let scratch = dir.path().join("out");
        let missing = dir.path().join("missing.pdf");

        let merged = merge_pdf(&[missing.clone(), input.clone(), input], &scratch).unwrap();
        let doc = Document::load(&merged, &ParseOptions::default()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert!(matches!(
            merge_pdf(&[missing], &scratch),
            Err(PdfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn decrypt_requires_encryption() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_page_pdf(dir.path());
        assert!(matches!(
            decrypt_pdf(&input, "pw", dir.path()),
            Err(PdfError::NotEncrypted)
        ));
    }

    #[test]
    fn image_to_pdf_needs_one_image() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image").unwrap();
        assert!(matches!(
            image_to_pdf(&[bogus], CompressionLevel::Low, dir.path()),
            Err(PdfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn info_reports_pages() {
        let dir = tempfile::tempdir().unwrap();
        let input = one_page_pdf(dir.path());
        let info = pdf_info(&input, None).unwrap();
        assert_eq!(info.page_count, 1);
        assert_eq!(info.page_sizes, vec![(20.0, 10.0)]);
        assert_eq!(info.encryption, None);
    }
}
