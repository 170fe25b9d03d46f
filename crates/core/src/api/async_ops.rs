//! Async variants of [`super::ops`].
//!
//! Each call runs the blocking operation on the blocking lane of a lazily
//! built tokio runtime. The returned futures do not need to be polled from
//! inside that runtime.

use super::ops::{self, PageImages};
use crate::document::{DocumentInfo, KeyLength};
use crate::engine::CancellationToken;
use crate::raster::CompressionLevel;
use crate::{PdfError, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Runtime};

static ASYNC_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Like `OnceLock::get_or_init`, but a failed init is not cached.
fn get_or_try_init<T, E>(
    cell: &OnceLock<T>,
    init: impl FnOnce() -> std::result::Result<T, E>,
) -> std::result::Result<&T, E> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = init()?;
    Ok(cell.get_or_init(|| value))
}

fn runtime() -> Result<&'static Runtime> {
    get_or_try_init(&ASYNC_RUNTIME, || {
        Builder::new_multi_thread()
            .thread_name("bluepdf-async")
            .enable_all()
            .build()
    })
    .map_err(|e| PdfError::Runtime(format!("cannot start async runtime: {e}")))
}

async fn offload_blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let join = runtime()?.spawn_blocking(job);
    join.await
        .map_err(|e| PdfError::Runtime(format!("blocking task failed: {e}")))?
}

pub async fn image_to_pdf_async(
    paths: Vec<PathBuf>,
    level: CompressionLevel,
    scratch: PathBuf,
) -> Result<PathBuf> {
    offload_blocking(move || ops::image_to_pdf(&paths, level, &scratch)).await
}

pub async fn merge_pdf_async(paths: Vec<PathBuf>, scratch: PathBuf) -> Result<PathBuf> {
    offload_blocking(move || ops::merge_pdf(&paths, &scratch)).await
}

pub async fn encrypt_pdf_async(
    path: PathBuf,
    password: String,
    key_length: KeyLength,
    scratch: PathBuf,
) -> Result<PathBuf> {
    offload_blocking(move || ops::encrypt_pdf(&path, &password, key_length, &scratch)).await
}

pub async fn decrypt_pdf_async(path: PathBuf, password: String, scratch: PathBuf) -> Result<PathBuf> {
    offload_blocking(move || ops::decrypt_pdf(&path, &password, &scratch)).await
}

pub async fn split_pdf_async(
    path: PathBuf,
    start: usize,
    end: usize,
    scratch: PathBuf,
) -> Result<PathBuf> {
    offload_blocking(move || ops::split_pdf(&path, start, end, &scratch)).await
}

pub async fn reorder_pdf_async(path: PathBuf, order: Vec<usize>, scratch: PathBuf) -> Result<PathBuf> {
    offload_blocking(move || ops::reorder_pdf(&path, &order, &scratch)).await
}

pub async fn rotate_pdf_async(path: PathBuf, degrees: i64, scratch: PathBuf) -> Result<PathBuf> {
    offload_blocking(move || ops::rotate_pdf(&path, degrees, &scratch)).await
}

pub async fn pdf_info_async(path: PathBuf, password: Option<String>) -> Result<DocumentInfo> {
    offload_blocking(move || ops::pdf_info(&path, password.as_deref())).await
}

/// Cancel through `cancel`; the token is shared with the running job.
pub async fn pdf_to_images_async(
    path: PathBuf,
    level: CompressionLevel,
    scratch: PathBuf,
    cancel: CancellationToken,
) -> Result<PageImages> {
    offload_blocking(move || ops::pdf_to_images(&path, level, &scratch, &cancel)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_built_once() {
        let a = runtime().unwrap() as *const Runtime;
        let b = runtime().unwrap() as *const Runtime;
        assert_eq!(a, b);
    }

    #[test]
    fn errors_cross_the_blocking_lane() {
        let dir = tempfile::tempdir().unwrap();
        let result = pollster::block_on(split_pdf_async(
            dir.path().join("absent.pdf"),
            1,
            1,
            dir.path().to_path_buf(),
        ));
        assert!(matches!(result, Err(PdfError::Io(_))));
    }
}
