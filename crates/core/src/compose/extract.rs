//! Rendering every page of a document in batches.

use crate::document::Document;
use crate::engine::{self, CancellationToken};
use crate::raster::{RenderOptions, RenderedPage, render};
use crate::Result;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Outcome for one page. A failed page does not fail the whole run.
#[derive(Debug)]
pub struct PageResult<T = RenderedPage> {
    /// 1-based page number.
    pub page: usize,
    pub outcome: Result<T>,
}

/// Pages rendered concurrently per batch.
pub const fn batch_size(page_count: usize) -> usize {
    match page_count {
        0..=50 => 12,
        51..=100 => 8,
        _ => 5,
    }
}

/// Render every page of `doc`, in page order.
pub fn extract_all_pages(
    doc: &Document,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> Result<Vec<PageResult>> {
    extract_pages_with(doc, options, cancel, Ok)
}

/// Render every page and pass each result through `sink` on the worker
/// that rendered it.
///
/// Cancellation is checked before each batch and once more after the last
/// one; a cancelled run returns `Cancelled` and the pages finished so far
/// are dropped.
pub fn extract_pages_with<T, F>(
    doc: &Document,
    options: &RenderOptions,
    cancel: &CancellationToken,
    sink: F,
) -> Result<Vec<PageResult<T>>>
where
    T: Send,
    F: Fn(RenderedPage) -> Result<T> + Sync,
{
    let pages = doc.pages()?;
    let batch = batch_size(pages.len());
    let mut results = Vec::with_capacity(pages.len());

    for (i, chunk) in pages.chunks(batch).enumerate() {
        cancel.check()?;
        debug!(batch = i + 1, pages = chunk.len(), "rendering batch");
        let mut done: Vec<PageResult<T>> = engine::install(|| {
            chunk
                .par_iter()
                .map(|page| PageResult {
                    page: page.index + 1,
                    outcome: render(doc, page, options).and_then(&sink),
                })
                .collect()
        });
        for result in &done {
            if let Err(e) = &result.outcome {
                warn!(page = result.page, error = %e, "page failed");
            }
        }
        results.append(&mut done);
    }
    cancel.check()?;
    results.sort_by_key(|r| r.page);
    Ok(results)
}
