#![allow(dead_code)]

use shelf::app::preferences::{Preferences, PreferencesHandle};
use shelf::download::index::{
    DownloadIndex, IndexError, ListenerId, ProjectionHandle, ProjectionId, Subscription,
};
use shelf::download::{DownloadRecord, LocalLibrary};
use shelf::file::layout::StorageLayout;
use shelf::progress::{ReadProgressPool, ReadProgressResolver};
use shelf::ui::{DownloadListController, DownloadListDeps};
use shelf::util::i18n::LocalizationManager;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::runtime::Handle;

/// Preferences with the one-time guides already dismissed
pub fn quiet_preferences() -> Preferences {
    Preferences {
        guide_download_thumb: false,
        guide_download_labels: false,
        ..Preferences::default()
    }
}

/// A library, read-progress pool and preferences rooted in a temp directory
///
/// Must be created inside a tokio runtime.
pub struct Fixture {
    pub dir: TempDir,
    pub library: Arc<LocalLibrary>,
    pub resolver: Arc<ReadProgressResolver>,
    pub pool: ReadProgressPool,
    pub preferences: PreferencesHandle,
    pub i18n: Arc<LocalizationManager>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_preferences(quiet_preferences())
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        let dir = TempDir::new().unwrap();
        let resolver = Arc::new(ReadProgressResolver::new(
            StorageLayout::new(dir.path().join("downloads")),
            Some(dir.path().join("progress")),
        ));
        let library = Arc::new(
            LocalLibrary::open(dir.path().join("library.toml"))
                .unwrap()
                .with_progress(Arc::clone(&resolver)),
        );
        let pool = ReadProgressPool::new(Arc::clone(&resolver), 2, Handle::current());
        Self {
            dir,
            library,
            resolver,
            pool,
            preferences: PreferencesHandle::in_memory(preferences),
            i18n: Arc::new(LocalizationManager::bundled()),
        }
    }

    pub fn deps(&self) -> DownloadListDeps {
        self.deps_with_index(self.library.clone())
    }

    pub fn deps_with_index(&self, index: Arc<dyn DownloadIndex>) -> DownloadListDeps {
        DownloadListDeps {
            index,
            labels: self.library.clone(),
            preferences: self.preferences.clone(),
            i18n: Arc::clone(&self.i18n),
            progress: self.pool.clone(),
        }
    }

    pub fn controller(&self) -> DownloadListController {
        DownloadListController::new(self.deps(), None)
    }

    /// Append records to the end of their groups, in order
    pub fn seed(&self, records: impl IntoIterator<Item = DownloadRecord>) {
        for record in records {
            self.library.insert_record(record, usize::MAX).unwrap();
        }
    }
}

/// `count` plain records in the default group with ids `1..=count`
pub fn numbered_records(count: u64) -> Vec<DownloadRecord> {
    (1..=count)
        .map(|id| {
            DownloadRecord::new(id, format!("token{id}"), format!("Gallery {id}")).with_pages(0, 10)
        })
        .collect()
}

/// Bulk calls observed by a [`RecordingIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartRange(Vec<u64>),
    StopRange(Vec<u64>),
    DeleteRange(Vec<u64>),
    ChangeLabel(Vec<u64>, Option<String>),
    DeleteOne(u64),
}

/// Delegates to a library and records every bulk mutation
pub struct RecordingIndex {
    inner: Arc<LocalLibrary>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingIndex {
    pub fn new(inner: Arc<LocalLibrary>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DownloadIndex for RecordingIndex {
    fn default_projection(&self) -> ProjectionHandle {
        self.inner.default_projection()
    }

    fn projection_for_label(&self, label: &str) -> Option<ProjectionHandle> {
        self.inner.projection_for_label(label)
    }

    fn records(&self, projection: ProjectionId) -> Vec<DownloadRecord> {
        self.inner.records(projection)
    }

    fn record(&self, id: u64) -> Option<DownloadRecord> {
        self.inner.record(id)
    }

    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.inner.unsubscribe(id)
    }

    fn start_all(&self) -> Result<(), IndexError> {
        self.inner.start_all()
    }

    fn stop_all(&self) -> Result<(), IndexError> {
        self.inner.stop_all()
    }

    fn start_one(&self, id: u64) -> Result<(), IndexError> {
        self.inner.start_one(id)
    }

    fn start_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        self.log(Call::StartRange(ids.to_vec()));
        self.inner.start_range(ids)
    }

    fn stop_one(&self, id: u64) -> Result<(), IndexError> {
        self.inner.stop_one(id)
    }

    fn stop_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        self.log(Call::StopRange(ids.to_vec()));
        self.inner.stop_range(ids)
    }

    fn delete_one(&self, id: u64) -> Result<(), IndexError> {
        self.log(Call::DeleteOne(id));
        self.inner.delete_one(id)
    }

    fn delete_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        self.log(Call::DeleteRange(ids.to_vec()));
        self.inner.delete_range(ids)
    }

    fn change_label(
        &self,
        records: &[DownloadRecord],
        label: Option<&str>,
    ) -> Result<(), IndexError> {
        self.log(Call::ChangeLabel(
            records.iter().map(|r| r.id).collect(),
            label.map(str::to_string),
        ));
        self.inner.change_label(records, label)
    }

    fn reset_all_progress(&self) -> Result<(), IndexError> {
        self.inner.reset_all_progress()
    }

    fn reorder_projection(
        &self,
        projection: ProjectionId,
        order: &[u64],
    ) -> Result<(), IndexError> {
        self.inner.reorder_projection(projection, order)
    }
}
