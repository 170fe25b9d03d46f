//! Output files in the scratch directory.
//!
//! Data is written to a hidden temporary next to the final path and renamed
//! into place by [`OutputFile::publish`]. Dropping an unpublished
//! [`OutputFile`] removes the temporary.

use crate::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::debug;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<prefix>_<millis>_<pid>_<counter>.<ext>`, unique within the process
/// and across concurrently running processes.
pub fn unique_name(prefix: &str, ext: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{millis}_{}_{counter}.{ext}", std::process::id())
}

/// A pending output file.
#[derive(Debug)]
pub struct OutputFile {
    temp: NamedTempFile,
    path: PathBuf,
}

impl OutputFile {
    /// Reserve a new output named after `prefix` in `scratch`, creating the
    /// directory if needed.
    pub fn create(scratch: &Path, prefix: &str, ext: &str) -> Result<Self> {
        std::fs::create_dir_all(scratch)?;
        let path = scratch.join(unique_name(prefix, ext));
        let temp = tempfile::Builder::new()
            .prefix(".bluepdf-")
            .suffix(".part")
            .tempfile_in(scratch)?;
        Ok(Self { temp, path })
    }

    /// Final location once published.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.temp.write_all(data)?;
        Ok(())
    }

    /// Flush to disk and move into place.
    pub fn publish(self) -> Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        self.temp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "output published");
        Ok(self.path)
    }
}

/// Write `data` to a fresh output and publish it.
pub fn write_output(scratch: &Path, prefix: &str, ext: &str, data: &[u8]) -> Result<PathBuf> {
    let mut out = OutputFile::create(scratch, prefix, ext)?;
    out.write_all(data)?;
    out.publish()
}
