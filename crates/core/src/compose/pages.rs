//! Page level document surgery: merge, split, reorder and rotate.
//!
//! Each operation builds a fresh document through [`PageImporter`]; the
//! inputs are never modified. Outputs are unencrypted.

use super::import::PageImporter;
use crate::document::{Document, Page};
use crate::{PdfError, Result};
use std::collections::HashSet;
use tracing::info;

/// Concatenate the pages of `documents` in order.
///
/// Fails with `EncryptedInput` before copying anything if any input is
/// encrypted.
pub fn merge(documents: &[Document]) -> Result<Document> {
    if documents.is_empty() {
        return Err(PdfError::InvalidArgument("no documents to merge".into()));
    }
    if documents.iter().any(Document::is_encrypted) {
        return Err(PdfError::EncryptedInput);
    }
    let mut importer = PageImporter::new();
    for doc in documents {
        importer.import(doc, &doc.pages()?, 0)?;
    }
    info!(
        inputs = documents.len(),
        pages = importer.page_count(),
        "merged documents"
    );
    Ok(importer.finish())
}

/// Pages `start..=end`, 1-indexed.
pub fn split(doc: &Document, start: usize, end: usize) -> Result<Document> {
    let pages = doc.pages()?;
    let page_count = pages.len();
    if start < 1 || end > page_count || start > end {
        return Err(PdfError::InvalidRange {
            start,
            end,
            page_count,
        });
    }
    let mut importer = PageImporter::new();
    importer.import(doc, &pages[start - 1..end], 0)?;
    info!(start, end, page_count, "split document");
    Ok(importer.finish())
}

/// Pages in the given 1-indexed order. Every index must be in range and
/// appear at most once; pages left out are dropped.
pub fn reorder(doc: &Document, order: &[usize]) -> Result<Document> {
    let pages = doc.pages()?;
    if order.is_empty() {
        return Err(PdfError::InvalidArgument("page order is empty".into()));
    }
    let mut seen = HashSet::with_capacity(order.len());
    let mut selected: Vec<Page> = Vec::with_capacity(order.len());
    for &number in order {
        if number < 1 || number > pages.len() {
            return Err(PdfError::InvalidArgument(format!(
                "page {number} out of range 1..={}",
                pages.len()
            )));
        }
        if !seen.insert(number) {
            return Err(PdfError::InvalidArgument(format!(
                "page {number} listed more than once"
            )));
        }
        selected.push(pages[number - 1].clone());
    }
    let mut importer = PageImporter::new();
    importer.import(doc, &selected, 0)?;
    Ok(importer.finish())
}

/// Rotate every page clockwise by `degrees`, a multiple of 90.
pub fn rotate(doc: &Document, degrees: i64) -> Result<Document> {
    if degrees % 90 != 0 {
        return Err(PdfError::InvalidArgument(format!(
            "rotation must be a multiple of 90, got {degrees}"
        )));
    }
    let mut importer = PageImporter::new();
    importer.import(doc, &doc.pages()?, degrees)?;
    Ok(importer.finish())
}
