//! Read-progress lookup
//!
//! The reader leaves a small JSON marker inside each gallery directory and
//! mirrors it into a cache directory keyed by gallery id. Both sources are only
//! trusted when their `id` and `token` match the record being asked about.

use crate::download::record::DownloadRecord;
use crate::file::layout::StorageLayout;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Marker file name inside a record's directory
pub const MARKER_FILE_NAME: &str = ".read_progress";

/// Reading position in a gallery, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadProgress {
    pub current_page: i32,
    pub total_pages: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgressMarker {
    id: u64,
    token: String,
    current_page: i32,
    total_pages: i32,
}

impl ProgressMarker {
    fn matches(&self, record: &DownloadRecord) -> bool {
        self.id == record.id && self.token == record.token
    }
}

#[derive(Debug, Clone)]
pub struct ReadProgressResolver {
    layout: StorageLayout,
    cache_dir: Option<PathBuf>,
}

impl ReadProgressResolver {
    pub fn new(layout: StorageLayout, cache_dir: Option<PathBuf>) -> Self {
        Self { layout, cache_dir }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Resolve the read progress of `record`; `None` when nothing trustworthy is found
    ///
    /// Blocking: call it from a worker, never from the UI thread.
    pub fn resolve(&self, record: &DownloadRecord) -> Option<ReadProgress> {
        let marker = self.marker_path(record);
        if let Some(progress) = read_marker(&marker, record) {
            return Some(progress);
        }
        let cached = self.cache_path(record)?;
        read_marker(&cached, record)
    }

    /// Write the marker and the cache entry for `record`
    pub fn store(&self, record: &DownloadRecord, progress: ReadProgress) -> anyhow::Result<()> {
        let marker = ProgressMarker {
            id: record.id,
            token: record.token.clone(),
            current_page: progress.current_page,
            total_pages: progress.total_pages,
        };
        let content =
            serde_json::to_string(&marker).context("Failed to serialize progress marker")?;

        let dir = self.layout.record_dir(record);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create download directory: {}", dir.display()))?;
        std::fs::write(dir.join(MARKER_FILE_NAME), &content)
            .context("Failed to write progress marker")?;

        if let Some(path) = self.cache_path(record) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create progress cache")?;
            }
            std::fs::write(&path, &content).context("Failed to write progress cache entry")?;
        }
        Ok(())
    }

    /// Forget the progress of `record`; returns true if anything was removed
    pub fn reset(&self, record: &DownloadRecord) -> bool {
        let mut removed = remove_quietly(&self.marker_path(record));
        if let Some(path) = self.cache_path(record) {
            removed |= remove_quietly(&path);
        }
        removed
    }

    fn marker_path(&self, record: &DownloadRecord) -> PathBuf {
        self.layout.record_dir(record).join(MARKER_FILE_NAME)
    }

    fn cache_path(&self, record: &DownloadRecord) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", record.id)))
    }
}

fn read_marker(path: &Path, record: &DownloadRecord) -> Option<ReadProgress> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No progress marker");
            return None;
        }
    };
    let marker: ProgressMarker = match serde_json::from_str(&content) {
        Ok(marker) => marker,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Unreadable progress marker");
            return None;
        }
    };
    if !marker.matches(record) {
        tracing::debug!(
            path = %path.display(),
            id = record.id,
            "Progress marker belongs to another gallery"
        );
        return None;
    }
    Some(ReadProgress {
        current_page: marker.current_page,
        total_pages: marker.total_pages,
    })
}

fn remove_quietly(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove progress marker"
                );
            }
            false
        }
    }
}
