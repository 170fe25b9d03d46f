//! Process-wide execution resources.
//!
//! A rayon pool for CPU work (rendering, image codecs), built once; a
//! cancellation token shared between a caller and running work; and
//! [`SharedDocument`], which lets readers inspect a document concurrently
//! while rejecting overlapping mutations.

use crate::document::Document;
use crate::{PdfError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info, warn};

/// Engine-wide settings applied by [`init`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads for CPU work; `None` uses the available parallelism.
    pub worker_threads: Option<usize>,
}

static POOL: OnceLock<ThreadPool> = OnceLock::new();

fn default_thread_count() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

fn build_pool(config: &EngineConfig) -> Result<ThreadPool> {
    let threads = config
        .worker_threads
        .filter(|&n| n > 0)
        .unwrap_or_else(default_thread_count);
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("bluepdf-worker-{i}"))
        .build()
        .map_err(|e| PdfError::Runtime(e.to_string()))
}

/// Initialize the worker pool. Only the first call has an effect; a
/// failed build is not cached, so a later call may retry.
pub fn init(config: &EngineConfig) -> Result<()> {
    if POOL.get().is_some() {
        debug!("engine already initialized");
        return Ok(());
    }
    let pool = build_pool(config)?;
    let threads = pool.current_num_threads();
    if POOL.set(pool).is_ok() {
        info!(threads, "engine initialized");
    }
    Ok(())
}

/// Run `op` inside the engine pool, initializing it with defaults if
/// needed. Falls back to the global rayon pool if no pool can be built.
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    if POOL.get().is_none()
        && let Err(e) = init(&EngineConfig::default())
    {
        warn!(error = %e, "engine pool unavailable, using global pool");
    }
    match POOL.get() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

/// Shared flag for cancelling a long-running operation.
///
/// Work checks the flag at task boundaries; already-running tasks finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PdfError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A document shared between tasks.
///
/// Any number of readers may inspect it at once. Only one mutation may be
/// in flight; a second concurrent one fails with `DocumentBusy` instead of
/// waiting.
#[derive(Debug)]
pub struct SharedDocument {
    doc: RwLock<Document>,
    mutating: AtomicBool,
}

/// Clears the mutation flag when the mutation ends, even on panic.
struct MutationGuard<'a>(&'a AtomicBool);

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SharedDocument {
    pub fn new(doc: Document) -> Self {
        Self {
            doc: RwLock::new(doc),
            mutating: AtomicBool::new(false),
        }
    }

    /// Run `f` with shared access.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> Result<R> {
        let guard = self
            .doc
            .read()
            .map_err(|_| PdfError::Runtime("document lock poisoned".into()))?;
        Ok(f(&guard))
    }

    /// Run `f` with exclusive access, or fail with `DocumentBusy` if
    /// another mutation is in progress.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> Result<R>) -> Result<R> {
        if self.mutating.swap(true, Ordering::SeqCst) {
            return Err(PdfError::DocumentBusy);
        }
        let _flag = MutationGuard(&self.mutating);
        let mut guard = self
            .doc
            .write()
            .map_err(|_| PdfError::Runtime("document lock poisoned".into()))?;
        f(&mut guard)
    }

    pub fn into_inner(self) -> Result<Document> {
        self.doc
            .into_inner()
            .map_err(|_| PdfError::Runtime("document lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn init_is_idempotent() {
        init(&EngineConfig {
            worker_threads: Some(2),
        })
        .unwrap();
        init(&EngineConfig::default()).unwrap();
        assert!(install(|| rayon::current_num_threads()) >= 1);
    }

    #[test]
    fn token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(PdfError::Cancelled)));
    }

    #[test]
    fn concurrent_mutation_is_rejected() {
        let shared = Arc::new(SharedDocument::new(Document::new()));
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));

        let worker = {
            let shared = Arc::clone(&shared);
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            thread::spawn(move || {
                shared.mutate(|doc| {
                    entered.wait();
                    release.wait();
                    doc.set_version("2.0");
                    Ok(())
                })
            })
        };

        entered.wait();
        assert!(matches!(
            shared.mutate(|_| Ok(())),
            Err(PdfError::DocumentBusy)
        ));
        release.wait();
        worker.join().unwrap().unwrap();

        assert_eq!(shared.read(|doc| doc.version().to_string()).unwrap(), "2.0");
        shared.mutate(|doc| {
            doc.set_version("1.4");
            Ok(())
        })
        .unwrap();
        let shared = Arc::try_unwrap(shared).unwrap();
        assert_eq!(shared.into_inner().unwrap().version(), "1.4");
    }

    #[test]
    fn readers_share_access() {
        let shared = SharedDocument::new(Document::new());
        let counts = thread::scope(|s| {
            let a = s.spawn(|| shared.read(Document::object_count));
            let b = s.spawn(|| shared.read(Document::object_count));
            (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
        });
        assert_eq!(counts, (2, 2));
    }
}
