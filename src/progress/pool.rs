//! Bounded worker pool for read-progress lookups

use super::resolver::{ReadProgress, ReadProgressResolver};
use crate::download::record::DownloadRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedSender;

/// Result of one lookup, delivered back to the requesting controller
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressCompletion {
    pub id: u64,
    pub progress: Option<ReadProgress>,
}

/// Runs resolutions on tokio's blocking pool, at most `workers` at a time
#[derive(Clone)]
pub struct ReadProgressPool {
    resolver: Arc<ReadProgressResolver>,
    permits: Arc<Semaphore>,
    runtime: Handle,
}

impl ReadProgressPool {
    pub fn new(resolver: Arc<ReadProgressResolver>, workers: usize, runtime: Handle) -> Self {
        Self {
            resolver,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            runtime,
        }
    }

    pub fn resolver(&self) -> &Arc<ReadProgressResolver> {
        &self.resolver
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Queue a lookup for `record`
    ///
    /// The completion is sent on `completions` unless `alive` has been cleared
    /// by the time the work finishes.
    pub fn request(
        &self,
        record: DownloadRecord,
        alive: Arc<AtomicBool>,
        completions: UnboundedSender<ProgressCompletion>,
    ) {
        let resolver = Arc::clone(&self.resolver);
        let permits = Arc::clone(&self.permits);
        self.runtime.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if !alive.load(Ordering::Acquire) {
                return;
            }
            let id = record.id;
            let resolved = tokio::task::spawn_blocking(move || resolver.resolve(&record)).await;
            let progress = match resolved {
                Ok(progress) => progress,
                Err(e) => {
                    tracing::debug!(id, error = %e, "Read progress lookup aborted");
                    None
                }
            };
            if alive.load(Ordering::Acquire) {
                let _ = completions.send(ProgressCompletion { id, progress });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::layout::StorageLayout;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_request_delivers_completion() {
        let temp = TempDir::new().unwrap();
        let resolver = Arc::new(ReadProgressResolver::new(StorageLayout::new(temp.path()), None));
        let record = DownloadRecord::new(1, "tok", "One");
        resolver
            .store(&record, ReadProgress { current_page: 3, total_pages: 10 })
            .unwrap();

        let pool = ReadProgressPool::new(resolver, 2, Handle::current());
        let (tx, mut rx) = mpsc::unbounded_channel();
        pool.request(record, Arc::new(AtomicBool::new(true)), tx);

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.id, 1);
        assert_eq!(completion.progress.map(|p| p.current_page), Some(3));
    }

    #[tokio::test]
    async fn test_dead_requester_gets_nothing() {
        let temp = TempDir::new().unwrap();
        let resolver = Arc::new(ReadProgressResolver::new(StorageLayout::new(temp.path()), None));
        let pool = ReadProgressPool::new(resolver, 1, Handle::current());
        let (tx, mut rx) = mpsc::unbounded_channel();

        pool.request(
            DownloadRecord::new(1, "tok", "One"),
            Arc::new(AtomicBool::new(false)),
            tx,
        );

        // The only sender is moved into the task and dropped when it exits
        assert_eq!(rx.recv().await, None);
    }
}
