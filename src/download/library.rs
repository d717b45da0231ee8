//! In-process download library
//!
//! Holds labels and download records, keeps one live projection per label plus
//! one for the default group, and persists everything to `library.toml`.
//! Implements both [`LabelStore`] and [`DownloadIndex`].

use super::index::{
    DownloadIndex, IndexError, IndexEvent, ListenerId, ProjectionHandle, ProjectionId,
    Subscription,
};
use super::label::{DEFAULT_LABEL_NAME, Label, LabelError, LabelId, LabelStore};
use super::record::{DownloadRecord, DownloadState};
use crate::progress::ReadProgressResolver;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, UnboundedSender};

const DEFAULT_PROJECTION: ProjectionId = ProjectionId(0);

/// On-disk shape of `library.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
struct LibraryFile {
    #[serde(default)]
    labels: Vec<Label>,
    /// Records grouped by projection, each group in display order
    #[serde(default)]
    records: Vec<DownloadRecord>,
}

#[derive(Debug)]
struct ProjectionList {
    id: ProjectionId,
    ids: Vec<u64>,
}

impl ProjectionList {
    fn new(id: ProjectionId) -> Self {
        Self { id, ids: Vec::new() }
    }

    fn position(&self, id: u64) -> Option<usize> {
        self.ids.iter().position(|&i| i == id)
    }
}

struct LibraryState {
    labels: Vec<Label>,
    records: HashMap<u64, DownloadRecord>,
    default_list: ProjectionList,
    /// Keyed by label id so a rename keeps the same list
    label_lists: HashMap<LabelId, ProjectionList>,
    next_projection: u64,
    listeners: Vec<(ListenerId, UnboundedSender<IndexEvent>)>,
    next_listener: u64,
}

impl Default for LibraryState {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            records: HashMap::new(),
            default_list: ProjectionList::new(DEFAULT_PROJECTION),
            label_lists: HashMap::new(),
            next_projection: 1,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }
}

impl LibraryState {
    fn label_by_name(&self, name: &str) -> Option<&Label> {
        self.labels.iter().find(|l| l.name == name)
    }

    fn allocate_projection(&mut self) -> ProjectionId {
        let id = ProjectionId(self.next_projection);
        self.next_projection += 1;
        id
    }

    fn push_label(&mut self, name: &str) -> Label {
        let label = Label {
            id: LabelId::new(),
            name: name.to_string(),
            order: self.labels.len(),
        };
        let projection = self.allocate_projection();
        self.label_lists
            .insert(label.id, ProjectionList::new(projection));
        self.labels.push(label.clone());
        label
    }

    fn list_for(&self, label: Option<&str>) -> Option<&ProjectionList> {
        match label {
            None => Some(&self.default_list),
            Some(name) => {
                let label = self.label_by_name(name)?;
                self.label_lists.get(&label.id)
            }
        }
    }

    fn list_for_mut(&mut self, label: Option<&str>) -> Option<&mut ProjectionList> {
        match label {
            None => Some(&mut self.default_list),
            Some(name) => {
                let id = self.label_by_name(name)?.id;
                self.label_lists.get_mut(&id)
            }
        }
    }

    fn list_by_projection(&self, projection: ProjectionId) -> Option<&ProjectionList> {
        if projection == DEFAULT_PROJECTION {
            return Some(&self.default_list);
        }
        self.label_lists.values().find(|l| l.id == projection)
    }

    fn list_by_projection_mut(&mut self, projection: ProjectionId) -> Option<&mut ProjectionList> {
        if projection == DEFAULT_PROJECTION {
            return Some(&mut self.default_list);
        }
        self.label_lists.values_mut().find(|l| l.id == projection)
    }

    fn projection_of(&self, record: &DownloadRecord) -> ProjectionId {
        self.list_for(record.label.as_deref())
            .map(|l| l.id)
            .unwrap_or(DEFAULT_PROJECTION)
    }

    fn renumber(&mut self) {
        for (order, label) in self.labels.iter_mut().enumerate() {
            label.order = order;
        }
    }

    /// Send to every listener, dropping the ones whose receiver is gone
    fn emit(&mut self, event: IndexEvent) {
        self.listeners
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Apply `f` to a record and announce the change if it reports one
    fn update<F>(&mut self, id: u64, f: F) -> bool
    where
        F: FnOnce(&mut DownloadRecord) -> bool,
    {
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        if !f(record) {
            return true;
        }
        let projection = self.projection_of(&self.records[&id]);
        self.emit(IndexEvent::Updated { projection, id });
        true
    }

    fn remove_record(&mut self, id: u64) -> Option<DownloadRecord> {
        let record = self.records.remove(&id)?;
        let list = self.list_for_mut(record.label.as_deref())?;
        let projection = list.id;
        if let Some(position) = list.position(id) {
            list.ids.remove(position);
            self.emit(IndexEvent::Removed {
                projection,
                id,
                position,
            });
        }
        Some(record)
    }

    fn to_file(&self) -> LibraryFile {
        let mut records = Vec::with_capacity(self.records.len());
        let mut lists = vec![&self.default_list];
        lists.extend(self.labels.iter().filter_map(|l| self.label_lists.get(&l.id)));
        for list in lists {
            records.extend(list.ids.iter().filter_map(|id| self.records.get(id).cloned()));
        }
        LibraryFile {
            labels: self.labels.clone(),
            records,
        }
    }

    fn from_file(file: LibraryFile) -> Self {
        let mut state = Self::default();
        let mut labels = file.labels;
        labels.sort_by_key(|l| l.order);
        for label in labels {
            if state.label_by_name(&label.name).is_some() || label.name == DEFAULT_LABEL_NAME {
                tracing::warn!(label = %label.name, "Skipping duplicate or reserved label");
                continue;
            }
            let projection = state.allocate_projection();
            state
                .label_lists
                .insert(label.id, ProjectionList::new(projection));
            state.labels.push(label);
        }
        state.renumber();

        for mut record in file.records {
            if state.records.contains_key(&record.id) {
                tracing::warn!(id = record.id, "Skipping duplicate download record");
                continue;
            }
            if let Some(name) = record.label.as_deref() {
                if state.label_by_name(name).is_none() {
                    tracing::warn!(
                        id = record.id,
                        label = name,
                        "Record label missing, moved to default group"
                    );
                    record.label = None;
                }
            }
            if let Some(list) = state.list_for_mut(record.label.as_deref()) {
                list.ids.push(record.id);
            }
            state.records.insert(record.id, record);
        }
        state
    }
}

/// Label store and download index backed by a single TOML file
#[derive(Clone, Default)]
pub struct LocalLibrary {
    state: Arc<RwLock<LibraryState>>,
    path: Option<PathBuf>,
    progress: Option<Arc<ReadProgressResolver>>,
}

impl LocalLibrary {
    /// Creates an empty, memory-only library
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the library stored at `path`, starting empty if the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read library file: {}", path.display()))?;
            let file: LibraryFile =
                toml::from_str(&content).context("Failed to parse library file")?;
            LibraryState::from_file(file)
        } else {
            LibraryState::default()
        };
        tracing::info!(
            path = %path.display(),
            labels = state.labels.len(),
            records = state.records.len(),
            "Library loaded"
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            path: Some(path),
            progress: None,
        })
    }

    /// Attach the resolver used by `reset_all_progress`
    pub fn with_progress(mut self, resolver: Arc<ReadProgressResolver>) -> Self {
        self.progress = Some(resolver);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the library to its file (temp file + rename)
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = toml::to_string_pretty(&self.read().to_file())
            .context("Failed to serialize library")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create library directory")?;
        }
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content).context("Failed to write temp library file")?;
        std::fs::rename(&temp_path, path).context("Failed to rename temp library file")?;
        Ok(())
    }

    /// Adds a record at the top of its group's projection
    pub fn add_record(&self, record: DownloadRecord) -> Result<(), IndexError> {
        self.insert_record(record, 0).map(|_| ())
    }

    /// Inserts a record into its group's projection at `position` (clamped to the end)
    ///
    /// An existing record with the same id is replaced. Returns the final position.
    pub fn insert_record(
        &self,
        record: DownloadRecord,
        position: usize,
    ) -> Result<usize, IndexError> {
        let position = {
            let mut state = self.write();
            if let Some(name) = record.label.as_deref() {
                if state.label_by_name(name).is_none() {
                    return Err(IndexError::UnknownLabel(name.to_string()));
                }
            }
            state.remove_record(record.id);

            let id = record.id;
            let label = record.label.clone();
            state.records.insert(id, record);
            let list = state
                .list_for_mut(label.as_deref())
                .ok_or_else(|| IndexError::UnknownLabel(label.clone().unwrap_or_default()))?;
            let position = position.min(list.ids.len());
            list.ids.insert(position, id);
            let projection = list.id;
            state.emit(IndexEvent::Added {
                projection,
                id,
                position,
            });
            position
        };
        self.persist();
        Ok(position)
    }

    /// Mutates a record in place (engine progress reports, state changes)
    pub fn update_record<F>(&self, id: u64, f: F) -> Result<(), IndexError>
    where
        F: FnOnce(&mut DownloadRecord),
    {
        let found = self.write().update(id, |record| {
            f(record);
            true
        });
        if !found {
            return Err(IndexError::UnknownRecord(id));
        }
        self.persist();
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, LibraryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LibraryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saves after a mutation; failures leave memory authoritative
    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist library");
        }
    }

    fn set_states<P>(
        &self,
        ids: impl IntoIterator<Item = u64>,
        eligible: P,
        to: DownloadState,
    ) -> usize
    where
        P: Fn(DownloadState) -> bool,
    {
        let mut changed = 0;
        {
            let mut state = self.write();
            for id in ids {
                state.update(id, |record| {
                    if !eligible(record.state) {
                        return false;
                    }
                    record.state = to;
                    if to == DownloadState::None {
                        record.speed = 0;
                    }
                    changed += 1;
                    true
                });
            }
        }
        if changed > 0 {
            self.persist();
        }
        changed
    }

    fn all_ids(&self) -> Vec<u64> {
        let state = self.read();
        let mut ids = state.default_list.ids.clone();
        for label in &state.labels {
            if let Some(list) = state.label_lists.get(&label.id) {
                ids.extend_from_slice(&list.ids);
            }
        }
        ids
    }

    fn require(&self, id: u64) -> Result<(), IndexError> {
        if self.read().records.contains_key(&id) {
            Ok(())
        } else {
            Err(IndexError::UnknownRecord(id))
        }
    }

    fn check_name(
        state: &LibraryState,
        name: &str,
        current: Option<&str>,
    ) -> Result<(), LabelError> {
        if name.is_empty() {
            return Err(LabelError::Empty);
        }
        if name == DEFAULT_LABEL_NAME {
            return Err(LabelError::Reserved(name.to_string()));
        }
        if current != Some(name) && state.label_by_name(name).is_some() {
            return Err(LabelError::Exists(name.to_string()));
        }
        Ok(())
    }
}

impl LabelStore for LocalLibrary {
    fn list(&self) -> Vec<Label> {
        self.read().labels.clone()
    }

    fn add(&self, name: &str) -> Result<Label, LabelError> {
        let label = {
            let mut state = self.write();
            Self::check_name(&state, name, None)?;
            let label = state.push_label(name);
            state.emit(IndexEvent::LabelsUpdated);
            label
        };
        tracing::info!(label = %label.name, "Label added");
        self.persist();
        Ok(label)
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), LabelError> {
        {
            let mut state = self.write();
            if state.label_by_name(old).is_none() {
                return Err(LabelError::NotFound(old.to_string()));
            }
            Self::check_name(&state, new, Some(old))?;
            if old == new {
                return Ok(());
            }
            for label in state.labels.iter_mut().filter(|l| l.name == old) {
                label.name = new.to_string();
            }
            for record in state.records.values_mut() {
                if record.label.as_deref() == Some(old) {
                    record.label = Some(new.to_string());
                }
            }
            state.emit(IndexEvent::LabelRenamed {
                from: old.to_string(),
                to: new.to_string(),
            });
            state.emit(IndexEvent::LabelsUpdated);
        }
        tracing::info!(from = old, to = new, "Label renamed");
        self.persist();
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), LabelError> {
        {
            let mut state = self.write();
            let Some(index) = state.labels.iter().position(|l| l.name == name) else {
                return Err(LabelError::NotFound(name.to_string()));
            };
            let label = state.labels.remove(index);
            state.renumber();
            let moved = state
                .label_lists
                .remove(&label.id)
                .map(|l| l.ids)
                .unwrap_or_default();
            for id in &moved {
                if let Some(record) = state.records.get_mut(id) {
                    record.label = None;
                }
            }
            state.default_list.ids.extend(moved);
            state.emit(IndexEvent::LabelSetChanged);
            state.emit(IndexEvent::LabelsUpdated);
            state.emit(IndexEvent::Reloaded {
                projection: DEFAULT_PROJECTION,
            });
        }
        tracing::info!(label = name, "Label deleted");
        self.persist();
        Ok(())
    }

    fn move_label(&self, from: usize, to: usize) {
        {
            let mut state = self.write();
            let len = state.labels.len();
            assert!(
                from < len && to < len,
                "label move {from} -> {to} out of range for {len} labels"
            );
            if from == to {
                return;
            }
            let label = state.labels.remove(from);
            state.labels.insert(to, label);
            state.renumber();
            state.emit(IndexEvent::LabelsUpdated);
        }
        self.persist();
    }

    fn contains(&self, name: &str) -> bool {
        self.read().label_by_name(name).is_some()
    }
}

impl DownloadIndex for LocalLibrary {
    fn default_projection(&self) -> ProjectionHandle {
        ProjectionHandle::new(DEFAULT_PROJECTION, None)
    }

    fn projection_for_label(&self, label: &str) -> Option<ProjectionHandle> {
        let state = self.read();
        let list = state.list_for(Some(label))?;
        Some(ProjectionHandle::new(list.id, Some(label.to_string())))
    }

    fn records(&self, projection: ProjectionId) -> Vec<DownloadRecord> {
        let state = self.read();
        state
            .list_by_projection(projection)
            .map(|list| {
                list.ids
                    .iter()
                    .filter_map(|id| state.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record(&self, id: u64) -> Option<DownloadRecord> {
        self.read().records.get(&id).cloned()
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.write();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, tx));
        Subscription { id, events: rx }
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.write().listeners.retain(|(listener, _)| *listener != id);
    }

    fn start_all(&self) -> Result<(), IndexError> {
        let started = self.set_states(
            self.all_ids(),
            |s| matches!(s, DownloadState::None | DownloadState::Failed),
            DownloadState::Wait,
        );
        tracing::info!(started, "Start all");
        Ok(())
    }

    fn stop_all(&self) -> Result<(), IndexError> {
        let stopped =
            self.set_states(self.all_ids(), DownloadState::is_running, DownloadState::None);
        tracing::info!(stopped, "Stop all");
        Ok(())
    }

    fn start_one(&self, id: u64) -> Result<(), IndexError> {
        self.require(id)?;
        self.set_states([id], |s| !s.is_running(), DownloadState::Wait);
        Ok(())
    }

    fn start_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        let started =
            self.set_states(ids.iter().copied(), |s| !s.is_running(), DownloadState::Wait);
        tracing::info!(requested = ids.len(), started, "Start range");
        Ok(())
    }

    fn stop_one(&self, id: u64) -> Result<(), IndexError> {
        self.require(id)?;
        self.set_states([id], DownloadState::is_running, DownloadState::None);
        Ok(())
    }

    fn stop_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        let stopped = self.set_states(
            ids.iter().copied(),
            DownloadState::is_running,
            DownloadState::None,
        );
        tracing::info!(requested = ids.len(), stopped, "Stop range");
        Ok(())
    }

    fn delete_one(&self, id: u64) -> Result<(), IndexError> {
        if self.write().remove_record(id).is_none() {
            return Err(IndexError::UnknownRecord(id));
        }
        tracing::info!(id, "Download deleted");
        self.persist();
        Ok(())
    }

    fn delete_range(&self, ids: &[u64]) -> Result<(), IndexError> {
        let deleted = {
            let mut state = self.write();
            ids.iter()
                .filter(|&&id| state.remove_record(id).is_some())
                .count()
        };
        tracing::info!(requested = ids.len(), deleted, "Delete range");
        if deleted > 0 {
            self.persist();
        }
        Ok(())
    }

    fn change_label(
        &self,
        records: &[DownloadRecord],
        label: Option<&str>,
    ) -> Result<(), IndexError> {
        let mut moved = 0;
        {
            let mut state = self.write();
            if let Some(name) = label {
                if state.label_by_name(name).is_none() {
                    return Err(IndexError::UnknownLabel(name.to_string()));
                }
            }
            let mut seen = HashSet::new();
            for requested in records {
                if !seen.insert(requested.id) {
                    continue;
                }
                let Some(current) = state.records.get(&requested.id) else {
                    continue;
                };
                if current.in_group(label) {
                    continue;
                }
                let Some(mut record) = state.remove_record(requested.id) else {
                    continue;
                };
                record.label = label.map(str::to_string);
                let id = record.id;
                state.records.insert(id, record);
                if let Some(list) = state.list_for_mut(label) {
                    list.ids.insert(0, id);
                    let projection = list.id;
                    state.emit(IndexEvent::Added {
                        projection,
                        id,
                        position: 0,
                    });
                }
                moved += 1;
            }
        }
        tracing::info!(
            target_label = label.unwrap_or(DEFAULT_LABEL_NAME),
            moved,
            "Changed label"
        );
        if moved > 0 {
            self.persist();
        }
        Ok(())
    }

    fn reset_all_progress(&self) -> Result<(), IndexError> {
        let records: Vec<DownloadRecord> = self.read().records.values().cloned().collect();
        if let Some(resolver) = &self.progress {
            let reset = records.iter().filter(|r| resolver.reset(r)).count();
            tracing::info!(reset, "Reading progress reset");
        }
        self.write().emit(IndexEvent::AllUpdated);
        Ok(())
    }

    fn reorder_projection(
        &self,
        projection: ProjectionId,
        order: &[u64],
    ) -> Result<(), IndexError> {
        {
            let mut state = self.write();
            let list = state
                .list_by_projection_mut(projection)
                .ok_or(IndexError::UnknownProjection)?;
            let mut current = list.ids.clone();
            let mut requested = order.to_vec();
            current.sort_unstable();
            requested.sort_unstable();
            if current != requested {
                return Err(IndexError::InvalidOrder);
            }
            list.ids = order.to_vec();
            state.emit(IndexEvent::Reloaded { projection });
        }
        self.persist();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ids(library: &LocalLibrary, label: Option<&str>) -> Vec<u64> {
        let handle = match label {
            None => library.default_projection(),
            Some(name) => library.projection_for_label(name).unwrap(),
        };
        library.records(handle.id()).iter().map(|r| r.id).collect()
    }

    fn drain(sub: &mut Subscription) -> Vec<IndexEvent> {
        let mut events = Vec::new();
        while let Ok(event) = sub.events.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_new_records_go_to_top() {
        let library = LocalLibrary::new();
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        library.add_record(DownloadRecord::new(2, "b", "Two")).unwrap();
        assert_eq!(ids(&library, None), vec![2, 1]);
    }

    #[test]
    fn test_projection_holds_only_its_label() {
        let library = LocalLibrary::new();
        library.add("Comics").unwrap();
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        library
            .add_record(DownloadRecord::new(2, "b", "Two").with_label("Comics"))
            .unwrap();
        library.add_record(DownloadRecord::new(3, "c", "Three")).unwrap();

        assert_eq!(ids(&library, None), vec![3, 1]);
        assert_eq!(ids(&library, Some("Comics")), vec![2]);
    }

    #[test]
    fn test_insert_with_unknown_label_fails() {
        let library = LocalLibrary::new();
        let result = library.add_record(DownloadRecord::new(1, "a", "One").with_label("Nope"));
        assert!(matches!(result, Err(IndexError::UnknownLabel(_))));
        assert!(library.record(1).is_none());
    }

    #[test]
    fn test_label_names_validated() {
        let library = LocalLibrary::new();
        assert_eq!(library.add(""), Err(LabelError::Empty));
        assert_eq!(
            library.add(DEFAULT_LABEL_NAME),
            Err(LabelError::Reserved(DEFAULT_LABEL_NAME.to_string()))
        );
        library.add("A").unwrap();
        assert_eq!(library.add("A"), Err(LabelError::Exists("A".to_string())));
        assert_eq!(library.list().len(), 1);
    }

    #[test]
    fn test_rename_keeps_projection_identity() {
        let library = LocalLibrary::new();
        library.add("Old").unwrap();
        library
            .add_record(DownloadRecord::new(1, "a", "One").with_label("Old"))
            .unwrap();
        let before = library.projection_for_label("Old").unwrap().id();

        library.rename("Old", "New").unwrap();

        assert!(library.projection_for_label("Old").is_none());
        assert_eq!(library.projection_for_label("New").unwrap().id(), before);
        assert_eq!(library.record(1).unwrap().label.as_deref(), Some("New"));
    }

    #[test]
    fn test_delete_merges_into_default_end() {
        let library = LocalLibrary::new();
        library.add("Comics").unwrap();
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        library
            .add_record(DownloadRecord::new(2, "b", "Two").with_label("Comics"))
            .unwrap();
        let mut sub = library.subscribe();

        library.delete("Comics").unwrap();

        assert_eq!(ids(&library, None), vec![1, 2]);
        assert_eq!(library.record(2).unwrap().label, None);
        assert!(drain(&mut sub).contains(&IndexEvent::LabelSetChanged));
    }

    #[test]
    fn test_move_label_renumbers() {
        let library = LocalLibrary::new();
        for name in ["A", "B", "C"] {
            library.add(name).unwrap();
        }
        library.move_label(0, 2);
        let labels = library.list();
        let names: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"]);
        assert!(labels.iter().enumerate().all(|(i, l)| l.order == i));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_move_label_out_of_range_panics() {
        let library = LocalLibrary::new();
        library.add("A").unwrap();
        library.move_label(0, 3);
    }

    #[test]
    fn test_start_all_only_idle_or_failed() {
        let library = LocalLibrary::new();
        library
            .add_record(DownloadRecord::new(1, "a", "One").with_state(DownloadState::Failed))
            .unwrap();
        library
            .add_record(DownloadRecord::new(2, "b", "Two").with_state(DownloadState::Finish))
            .unwrap();
        library.add_record(DownloadRecord::new(3, "c", "Three")).unwrap();

        library.start_all().unwrap();

        assert_eq!(library.record(1).unwrap().state, DownloadState::Wait);
        assert_eq!(library.record(2).unwrap().state, DownloadState::Finish);
        assert_eq!(library.record(3).unwrap().state, DownloadState::Wait);
    }

    #[test]
    fn test_stop_range_emits_updates() {
        let library = LocalLibrary::new();
        library
            .add_record(DownloadRecord::new(1, "a", "One").with_state(DownloadState::Download))
            .unwrap();
        library.add_record(DownloadRecord::new(2, "b", "Two")).unwrap();
        let mut sub = library.subscribe();

        library.stop_range(&[1, 2, 99]).unwrap();

        assert_eq!(library.record(1).unwrap().state, DownloadState::None);
        assert_eq!(
            drain(&mut sub),
            vec![IndexEvent::Updated {
                projection: DEFAULT_PROJECTION,
                id: 1
            }]
        );
    }

    #[test]
    fn test_single_ops_reject_unknown_ids() {
        let library = LocalLibrary::new();
        assert!(matches!(library.start_one(5), Err(IndexError::UnknownRecord(5))));
        assert!(matches!(library.delete_one(5), Err(IndexError::UnknownRecord(5))));
    }

    #[test]
    fn test_change_label_moves_to_top() {
        let library = LocalLibrary::new();
        library.add("Comics").unwrap();
        library
            .add_record(DownloadRecord::new(1, "a", "One").with_label("Comics"))
            .unwrap();
        library.add_record(DownloadRecord::new(2, "b", "Two")).unwrap();
        library.add_record(DownloadRecord::new(3, "c", "Three")).unwrap();

        let moving = vec![library.record(2).unwrap(), library.record(3).unwrap()];
        library.change_label(&moving, Some("Comics")).unwrap();

        assert_eq!(ids(&library, Some("Comics")), vec![3, 2, 1]);
        assert!(ids(&library, None).is_empty());
    }

    #[test]
    fn test_change_label_unknown_target_fails_whole_call() {
        let library = LocalLibrary::new();
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        let moving = vec![library.record(1).unwrap()];
        assert!(library.change_label(&moving, Some("Nope")).is_err());
        assert_eq!(ids(&library, None), vec![1]);
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let library = LocalLibrary::new();
        for id in 1..=3 {
            library.add_record(DownloadRecord::new(id, "t", "x")).unwrap();
        }
        let projection = library.default_projection().id();
        assert!(matches!(
            library.reorder_projection(projection, &[1, 2]),
            Err(IndexError::InvalidOrder)
        ));
        library.reorder_projection(projection, &[1, 2, 3]).unwrap();
        assert_eq!(ids(&library, None), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let library = LocalLibrary::new();
        let sub = library.subscribe();
        drop(sub);
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        assert!(library.read().listeners.is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.toml");

        let library = LocalLibrary::open(&path).unwrap();
        library.add("Comics").unwrap();
        library.add("Art").unwrap();
        library.add_record(DownloadRecord::new(1, "a", "One")).unwrap();
        library.add_record(DownloadRecord::new(2, "b", "Two")).unwrap();
        library
            .add_record(DownloadRecord::new(3, "c", "Three").with_label("Art"))
            .unwrap();

        let reopened = LocalLibrary::open(&path).unwrap();
        let names: Vec<String> = reopened.list().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Comics", "Art"]);
        assert_eq!(ids(&reopened, None), vec![2, 1]);
        assert_eq!(ids(&reopened, Some("Art")), vec![3]);
    }
}
