//! Download list controller
//!
//! Shows one label's projection of the download index. Index events and
//! read-progress completions arrive on channels and are applied by [`pump`],
//! so every mutation of controller state happens on the owning thread.
//!
//! [`pump`]: DownloadListController::pump

use super::batch::{Batch, BatchKind};
use super::events::{ChangeQueue, ListChange, NavRequest, ViewState};
use super::row::{DownloadRow, ReadLookup};
use super::sort::{SortKey, sort_records};
use crate::app::preferences::{DefaultLabelChoice, PreferencesHandle};
use crate::download::index::{
    DownloadIndex, IndexError, IndexEvent, ProjectionHandle, ProjectionId, Subscription,
};
use crate::download::label::{Label, LabelStore};
use crate::download::record::{DownloadRecord, DownloadState};
use crate::file::cleanup;
use crate::progress::{ProgressCompletion, ReadProgressPool};
use crate::util::i18n::LocalizationManager;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Lock and visibility state of the screen chrome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChromeState {
    pub long_press_enabled: bool,
    pub left_drawer_locked: bool,
    pub right_drawer_locked: bool,
    pub action_bar_expanded: bool,
}

impl ChromeState {
    fn browsing() -> Self {
        Self {
            long_press_enabled: true,
            left_drawer_locked: false,
            right_drawer_locked: false,
            action_bar_expanded: false,
        }
    }

    fn batch() -> Self {
        Self {
            long_press_enabled: false,
            left_drawer_locked: true,
            right_drawer_locked: true,
            action_bar_expanded: true,
        }
    }
}

/// One-time introduction overlays, shown in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guide {
    Thumb,
    Labels,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    StartAll,
    StopAll,
    ResetReadingProgress,
    SelectAll,
    EnterEditMode,
    SelectRead,
    SelectFinished,
    StartAllReversed,
    ScrollToTop,
    ScrollToBottom,
    Sort(SortKey),
}

/// State kept across screen re-creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedState {
    pub label: Option<String>,
}

/// Confirmation prompt for deleting a single download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: u64,
    pub message: String,
    /// Initial state of the "remove image files" toggle
    pub remove_files: bool,
}

/// Collaborators a download list needs
#[derive(Clone)]
pub struct DownloadListDeps {
    pub index: Arc<dyn DownloadIndex>,
    pub labels: Arc<dyn LabelStore>,
    pub preferences: PreferencesHandle,
    pub i18n: Arc<LocalizationManager>,
    pub progress: ReadProgressPool,
}

pub struct DownloadListController {
    deps: DownloadListDeps,
    subscription: Option<Subscription>,
    projection: Option<ProjectionHandle>,
    records: Vec<DownloadRecord>,
    active_label: Option<String>,
    title: String,
    view_state: ViewState,
    changes: ChangeQueue,
    nav: Vec<NavRequest>,

    selection: BTreeSet<usize>,
    batch_mode: bool,
    chrome: ChromeState,
    fast_scrolling: bool,

    drawer: Vec<Label>,
    reader_position: Option<usize>,

    read_cache: HashMap<u64, ReadLookup>,
    in_flight: HashSet<u64>,
    /// Ids whose resolution should check the item when it turns out read
    read_selection: HashSet<u64>,
    completions_tx: UnboundedSender<ProgressCompletion>,
    completions_rx: UnboundedReceiver<ProgressCompletion>,
    alive: Arc<AtomicBool>,
}

impl DownloadListController {
    /// Create a controller showing the saved label, else the most recent one
    pub fn new(deps: DownloadListDeps, saved: Option<SavedState>) -> Self {
        let subscription = deps.index.subscribe();
        let drawer = deps.labels.list();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let label = match saved {
            Some(saved) => saved.label,
            None => deps.preferences.get().recent_download_label,
        };

        let mut controller = Self {
            deps,
            subscription: Some(subscription),
            projection: None,
            records: Vec::new(),
            active_label: None,
            title: String::new(),
            view_state: ViewState::Empty,
            changes: ChangeQueue::new(),
            nav: Vec::new(),
            selection: BTreeSet::new(),
            batch_mode: false,
            chrome: ChromeState::browsing(),
            fast_scrolling: false,
            drawer,
            reader_position: None,
            read_cache: HashMap::new(),
            in_flight: HashSet::new(),
            read_selection: HashSet::new(),
            completions_tx,
            completions_rx,
            alive: Arc::new(AtomicBool::new(true)),
        };
        controller.set_active_label(label.as_deref());
        controller
    }

    // ---- accessors ----

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DownloadRecord] {
        &self.records
    }

    /// Active label, `None` for the default group
    pub fn label(&self) -> Option<&str> {
        self.active_label.as_deref()
    }

    pub fn projection_id(&self) -> Option<ProjectionId> {
        self.projection.as_ref().map(ProjectionHandle::id)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    pub fn chrome(&self) -> ChromeState {
        self.chrome
    }

    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode
    }

    pub fn selected_positions(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    pub fn is_checked(&self, position: usize) -> bool {
        self.selection.contains(&position)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn take_changes(&mut self) -> Vec<ListChange> {
        self.changes.drain()
    }

    pub fn take_nav_requests(&mut self) -> Vec<NavRequest> {
        std::mem::take(&mut self.nav)
    }

    pub fn saved_state(&self) -> SavedState {
        SavedState {
            label: self.active_label.clone(),
        }
    }

    /// Re-apply state saved by a previous instance of the screen
    pub fn restore(&mut self, saved: SavedState) {
        self.set_active_label(saved.label.as_deref());
    }

    // ---- active label ----

    /// Show `label` (`None` = default group); unknown labels fall back to the default group
    pub fn set_active_label(&mut self, label: Option<&str>) {
        let index = &self.deps.index;
        let handle = match label {
            Some(name) => index.projection_for_label(name).unwrap_or_else(|| {
                tracing::info!(label = name, "Label no longer exists, showing default group");
                index.default_projection()
            }),
            None => index.default_projection(),
        };
        self.records = index.records(handle.id());
        self.active_label = handle.label().map(str::to_string);
        self.projection = Some(handle);

        if self.batch_mode {
            self.batch_mode = false;
            self.chrome = ChromeState::browsing();
        }
        self.selection.clear();
        self.read_selection.clear();
        self.reader_position = None;

        let recent = self.active_label.clone();
        self.deps
            .preferences
            .update(|p| p.recent_download_label = recent);

        self.update_title();
        self.update_view_state();
        self.changes.push(ListChange::Reset);
        tracing::info!(
            label = self.active_label.as_deref().unwrap_or("<default>"),
            count = self.records.len(),
            "Showing downloads"
        );
    }

    /// Show the download `id` in its group; returns its position
    pub fn open_record(&mut self, id: u64) -> Option<usize> {
        let record = self.deps.index.record(id)?;
        if record.label != self.active_label {
            self.set_active_label(record.label.as_deref());
        }
        let position = self.position_of(id)?;
        self.nav.push(NavRequest::ScrollTo(position));
        Some(position)
    }

    /// Keep showing the same projection under its new name
    fn follow_rename(&mut self, from: &str, to: String) {
        let Some(id) = self.projection_id() else {
            return;
        };
        self.projection = Some(ProjectionHandle::new(id, Some(to.clone())));
        for record in self.records.iter_mut().filter(|r| r.in_group(Some(from))) {
            record.label = Some(to.clone());
        }
        self.active_label = Some(to.clone());
        self.deps
            .preferences
            .update(|p| p.recent_download_label = Some(to));
        self.update_title();
    }

    fn update_title(&mut self) {
        let name = match &self.active_label {
            Some(label) => label.clone(),
            None => self.default_label_name(),
        };
        self.title = self.deps.i18n.get_with_arg("downloads-title", "label", name);
    }

    fn update_view_state(&mut self) {
        self.view_state = ViewState::for_len(self.records.len());
    }

    fn default_label_name(&self) -> String {
        self.deps.i18n.get("default-label-name")
    }

    // ---- event application ----

    /// Apply every queued index event and read-progress completion
    ///
    /// Returns the number of items applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self
            .subscription
            .as_mut()
            .and_then(|s| s.events.try_recv().ok())
        {
            self.apply_event(event);
            applied += 1;
        }
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait until every outstanding read-progress lookup has been applied
    pub async fn await_read_progress(&mut self) {
        while self.is_alive() && !self.in_flight.is_empty() {
            match self.completions_rx.recv().await {
                Some(completion) => self.apply_completion(completion),
                None => break,
            }
        }
    }

    fn is_current(&self, projection: ProjectionId) -> bool {
        self.projection_id() == Some(projection)
    }

    fn apply_event(&mut self, event: IndexEvent) {
        match event {
            IndexEvent::Added {
                projection,
                id,
                position,
            } => {
                if !self.is_current(projection) {
                    tracing::trace!(id, "Ignoring add for another projection");
                    return;
                }
                if self.position_of(id).is_some() {
                    return;
                }
                let Some(record) = self.deps.index.record(id) else {
                    return;
                };
                let position = position.min(self.records.len());
                self.records.insert(position, record);
                self.selection = self
                    .selection
                    .iter()
                    .map(|&p| if p >= position { p + 1 } else { p })
                    .collect();
                if let Some(reader) = self.reader_position.filter(|&r| r >= position) {
                    self.reader_position = Some(reader + 1);
                }
                self.changes.push(ListChange::Inserted(position));
                self.update_view_state();
                tracing::debug!(id, position, "Download added");
            }
            IndexEvent::Updated { projection, id } => {
                if !self.is_current(projection) {
                    tracing::trace!(id, "Ignoring update for another projection");
                    return;
                }
                let (Some(position), Some(record)) =
                    (self.position_of(id), self.deps.index.record(id))
                else {
                    return;
                };
                self.records[position] = record;
                self.changes.push(ListChange::Changed(position));
            }
            IndexEvent::Removed { projection, id, .. } => {
                if !self.is_current(projection) {
                    tracing::trace!(id, "Ignoring removal for another projection");
                    return;
                }
                let Some(position) = self.position_of(id) else {
                    return;
                };
                self.records.remove(position);
                self.read_cache.remove(&id);
                self.selection = self
                    .selection
                    .iter()
                    .filter(|&&p| p != position)
                    .map(|&p| if p > position { p - 1 } else { p })
                    .collect();
                if let Some(reader) = self.reader_position {
                    if reader == position {
                        self.reader_position = None;
                    } else if reader > position {
                        self.reader_position = Some(reader - 1);
                    }
                }
                self.changes.push(ListChange::Removed(position));
                self.update_view_state();
                tracing::debug!(id, position, "Download removed");
            }
            IndexEvent::Reloaded { projection } => {
                if !self.is_current(projection) {
                    tracing::trace!("Ignoring reload for another projection");
                    return;
                }
                self.records = self.deps.index.records(projection);
                self.exit_batch_mode();
                self.selection.clear();
                self.update_view_state();
                self.changes.push(ListChange::Reset);
            }
            IndexEvent::AllUpdated => {
                // Lookups started before the reset report on a channel nobody reads
                let (completions_tx, completions_rx) = mpsc::unbounded_channel();
                self.completions_tx = completions_tx;
                self.completions_rx = completions_rx;
                self.in_flight.clear();
                self.read_selection.clear();
                self.read_cache.clear();
                if let Some(projection) = self.projection_id() {
                    self.records = self.deps.index.records(projection);
                }
                self.changes.push(ListChange::Reset);
            }
            IndexEvent::LabelRenamed { from, to } => {
                if self.active_label.as_deref() == Some(from.as_str()) {
                    tracing::info!(from = %from, to = %to, "Active label renamed");
                    self.follow_rename(&from, to);
                }
            }
            IndexEvent::LabelSetChanged => {
                self.set_active_label(None);
            }
            IndexEvent::LabelsUpdated => {
                self.drawer = self.deps.labels.list();
            }
        }
    }

    fn apply_completion(&mut self, completion: ProgressCompletion) {
        if !self.is_alive() {
            return;
        }
        let ProgressCompletion { id, progress } = completion;
        self.in_flight.remove(&id);
        let lookup = match progress {
            Some(progress) => ReadLookup::Resolved(progress),
            None => ReadLookup::Unknown,
        };
        self.read_cache.insert(id, lookup);

        let Some(position) = self.position_of(id) else {
            self.read_selection.remove(&id);
            return;
        };
        if self.read_selection.remove(&id) && self.batch_mode && is_read(lookup) {
            self.selection.insert(position);
        }
        self.changes.push(ListChange::Changed(position));
    }

    // ---- rows and read progress ----

    /// Render model for `position`, queuing a read-progress lookup if needed
    ///
    /// # Panics
    /// If `position` is out of range.
    pub fn row(&mut self, position: usize) -> DownloadRow {
        let record = self.record_at(position).clone();
        let lookup = self.read_lookup(&record);
        DownloadRow::build(&record, lookup, &self.deps.i18n)
    }

    fn read_lookup(&mut self, record: &DownloadRecord) -> ReadLookup {
        if let Some(lookup) = self.read_cache.get(&record.id) {
            return *lookup;
        }
        self.request_read_progress(record);
        ReadLookup::Pending
    }

    fn request_read_progress(&mut self, record: &DownloadRecord) {
        if !self.is_alive() || !self.in_flight.insert(record.id) {
            return;
        }
        self.deps.progress.request(
            record.clone(),
            Arc::clone(&self.alive),
            self.completions_tx.clone(),
        );
    }

    // ---- selection and batch mode ----

    pub fn enter_batch_mode(&mut self) {
        if self.batch_mode {
            return;
        }
        self.batch_mode = true;
        self.chrome = ChromeState::batch();
    }

    pub fn exit_batch_mode(&mut self) {
        self.read_selection.clear();
        if !self.batch_mode {
            return;
        }
        self.batch_mode = false;
        self.chrome = ChromeState::browsing();
        self.chrome.right_drawer_locked = self.fast_scrolling;
        for position in std::mem::take(&mut self.selection) {
            self.changes.push(ListChange::Changed(position));
        }
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn toggle(&mut self, position: usize) {
        self.record_at(position);
        if !self.selection.remove(&position) {
            self.selection.insert(position);
        }
        self.changes.push(ListChange::Changed(position));
        if self.batch_mode && self.selection.is_empty() {
            self.exit_batch_mode();
        }
    }

    pub fn on_item_click(&mut self, position: usize) {
        if self.batch_mode {
            self.toggle(position);
        } else {
            self.open_reader(position);
        }
    }

    /// Returns false when long press is disabled (already in batch mode)
    pub fn on_item_long_click(&mut self, position: usize) -> bool {
        if !self.chrome.long_press_enabled {
            return false;
        }
        self.enter_batch_mode();
        self.toggle(position);
        true
    }

    /// Freeze the current selection into a batch
    pub fn capture_batch(&self, kind: BatchKind) -> Batch {
        Batch::capture(kind, self.selection.iter().copied(), &self.records)
    }

    /// Leave batch mode and issue the batch's single bulk call
    ///
    /// For a delete with file removal, resolves to the background removal task.
    pub fn dispatch_batch(
        &mut self,
        batch: Batch,
    ) -> Result<Option<JoinHandle<usize>>, IndexError> {
        self.exit_batch_mode();
        if let BatchKind::Delete { remove_files } = batch.kind {
            self.deps
                .preferences
                .update(|p| p.remove_image_files = remove_files);
        }
        batch.dispatch(self.deps.index.as_ref())?;
        match batch.kind {
            BatchKind::Delete { remove_files: true } => Ok(Some(self.remove_files(&batch.records))),
            _ => Ok(None),
        }
    }

    pub fn batch_start(&mut self) -> Result<(), IndexError> {
        let batch = self.capture_batch(BatchKind::Start);
        self.dispatch_batch(batch).map(|_| ())
    }

    pub fn batch_stop(&mut self) -> Result<(), IndexError> {
        let batch = self.capture_batch(BatchKind::Stop);
        self.dispatch_batch(batch).map(|_| ())
    }

    pub fn batch_delete(
        &mut self,
        remove_files: bool,
    ) -> Result<Option<JoinHandle<usize>>, IndexError> {
        let batch = self.capture_batch(BatchKind::Delete { remove_files });
        self.dispatch_batch(batch)
    }

    pub fn batch_move(&mut self, label: Option<&str>) -> Result<(), IndexError> {
        let batch = self.capture_batch(BatchKind::Move {
            label: label.map(str::to_string),
        });
        self.dispatch_batch(batch).map(|_| ())
    }

    /// Message and remembered toggle for a batch delete prompt
    pub fn batch_delete_prompt(&self) -> (String, bool) {
        let count = self.selection.len();
        (
            self.deps
                .i18n
                .get_with_arg("delete-downloads-message", "count", count as i64),
            self.deps.preferences.get().remove_image_files,
        )
    }

    fn remove_files(&self, records: &[DownloadRecord]) -> JoinHandle<usize> {
        let layout = self.deps.progress.resolver().layout();
        let dirs = records.iter().map(|r| layout.record_dir(r)).collect();
        cleanup::remove_dirs(self.deps.progress.runtime(), dirs)
    }

    // ---- single item buttons ----

    /// # Panics
    /// If `position` is out of range.
    pub fn start_item(&mut self, position: usize) -> Result<(), IndexError> {
        let id = self.record_at(position).id;
        self.deps.index.start_one(id)
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn stop_item(&mut self, position: usize) -> Result<(), IndexError> {
        let id = self.record_at(position).id;
        self.deps.index.stop_one(id)
    }

    /// Ask before deleting the item at `position`
    ///
    /// # Panics
    /// If `position` is out of range.
    pub fn delete_item(&self, position: usize) -> DeleteConfirmation {
        let record = self.record_at(position);
        DeleteConfirmation {
            id: record.id,
            message: self.deps.i18n.get_with_arg(
                "delete-download-message",
                "title",
                record.title.as_str(),
            ),
            remove_files: self.deps.preferences.get().remove_image_files,
        }
    }

    pub fn confirm_delete(
        &mut self,
        confirmation: &DeleteConfirmation,
        remove_files: bool,
    ) -> Result<Option<JoinHandle<usize>>, IndexError> {
        let record = self
            .deps
            .index
            .record(confirmation.id)
            .ok_or(IndexError::UnknownRecord(confirmation.id))?;
        self.deps.index.delete_one(record.id)?;
        self.deps
            .preferences
            .update(|p| p.remove_image_files = remove_files);
        Ok(remove_files.then(|| self.remove_files(std::slice::from_ref(&record))))
    }

    // ---- toolbar ----

    /// Handle a toolbar action; every action is ignored while in batch mode
    pub fn on_toolbar_action(&mut self, action: ToolbarAction) -> Result<(), IndexError> {
        if self.batch_mode {
            tracing::debug!(?action, "Ignoring toolbar action in batch mode");
            return Ok(());
        }
        match action {
            ToolbarAction::StartAll => self.deps.index.start_all()?,
            ToolbarAction::StopAll => self.deps.index.stop_all()?,
            ToolbarAction::ResetReadingProgress => self.deps.index.reset_all_progress()?,
            ToolbarAction::SelectAll => self.select_where(|_| true),
            ToolbarAction::EnterEditMode => self.enter_batch_mode(),
            ToolbarAction::SelectRead => self.select_read(),
            ToolbarAction::SelectFinished => {
                self.select_where(|r| r.state == DownloadState::Finish)
            }
            ToolbarAction::StartAllReversed => {
                let ids: Vec<u64> = self
                    .records
                    .iter()
                    .rev()
                    .filter(|r| r.state != DownloadState::Finish)
                    .map(|r| r.id)
                    .collect();
                if !ids.is_empty() {
                    self.deps.index.start_range(&ids)?;
                }
            }
            ToolbarAction::ScrollToTop => {
                if !self.records.is_empty() {
                    self.nav.push(NavRequest::ScrollTo(0));
                }
            }
            ToolbarAction::ScrollToBottom => {
                if let Some(last) = self.records.len().checked_sub(1) {
                    self.nav.push(NavRequest::ScrollTo(last));
                }
            }
            ToolbarAction::Sort(key) => self.sort(key)?,
        }
        Ok(())
    }

    fn select_where<P>(&mut self, predicate: P)
    where
        P: Fn(&DownloadRecord) -> bool,
    {
        let positions: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| predicate(*r))
            .map(|(p, _)| p)
            .collect();
        self.enter_batch_mode();
        for position in positions {
            if self.selection.insert(position) {
                self.changes.push(ListChange::Changed(position));
            }
        }
    }

    /// Check items whose reader has moved past the first page
    ///
    /// Items with unresolved progress are checked when their lookup completes.
    fn select_read(&mut self) {
        self.enter_batch_mode();
        let mut positions = Vec::new();
        let records = self.records.clone();
        for (position, record) in records.iter().enumerate() {
            match self.read_cache.get(&record.id).copied() {
                Some(lookup) if is_read(lookup) => positions.push(position),
                Some(_) => {}
                None => {
                    self.read_selection.insert(record.id);
                    self.request_read_progress(record);
                }
            }
        }
        for position in positions {
            if self.selection.insert(position) {
                self.changes.push(ListChange::Changed(position));
            }
        }
    }

    fn sort(&mut self, key: SortKey) -> Result<(), IndexError> {
        let Some(projection) = self.projection_id() else {
            return Ok(());
        };
        if self.records.is_empty() {
            return Ok(());
        }
        let mut sorted = self.records.clone();
        sort_records(&mut sorted, key);
        let order: Vec<u64> = sorted.iter().map(|r| r.id).collect();
        self.deps.index.reorder_projection(projection, &order)?;
        self.records = sorted;
        self.selection.clear();
        self.changes.push(ListChange::Reset);
        tracing::info!(?key, "Downloads reordered");
        Ok(())
    }

    // ---- drawer ----

    /// Default group first, then the labels in store order
    pub fn drawer_labels(&self) -> Vec<String> {
        std::iter::once(self.default_label_name())
            .chain(self.drawer.iter().map(|l| l.name.clone()))
            .collect()
    }

    /// # Panics
    /// If `index` is past the end of [`drawer_labels`](Self::drawer_labels).
    pub fn select_drawer_label(&mut self, index: usize) {
        let label = match index {
            0 => None,
            i => {
                let len = self.drawer.len() + 1;
                let entry = self
                    .drawer
                    .get(i - 1)
                    .unwrap_or_else(|| panic!("drawer entry {i} out of range for {len} entries"));
                Some(entry.name.clone())
            }
        };
        if label != self.active_label {
            self.set_active_label(label.as_deref());
        }
        self.nav.push(NavRequest::CloseDrawer);
    }

    pub fn open_label_editor(&mut self) {
        self.nav.push(NavRequest::OpenLabelEditor);
    }

    pub fn default_label_preference(&self) -> DefaultLabelChoice {
        self.deps.preferences.get().default_label_choice()
    }

    pub fn set_default_label_preference(&mut self, choice: DefaultLabelChoice) {
        tracing::info!(?choice, "Default download label changed");
        self.deps
            .preferences
            .update(|p| p.set_default_label_choice(choice));
    }

    // ---- fast scroll, back, reader ----

    pub fn on_fast_scroll_start(&mut self) {
        self.fast_scrolling = true;
        self.chrome.right_drawer_locked = true;
    }

    pub fn on_fast_scroll_end(&mut self) {
        self.fast_scrolling = false;
        if !self.batch_mode {
            self.chrome.right_drawer_locked = false;
        }
    }

    /// Returns true if the press was consumed by this screen
    pub fn on_back(&mut self) -> bool {
        if self.current_guide().is_some() {
            return true;
        }
        if self.batch_mode {
            self.exit_batch_mode();
            return true;
        }
        self.nav.push(NavRequest::Back);
        false
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn open_reader(&mut self, position: usize) {
        self.record_at(position);
        self.reader_position = Some(position);
        self.nav.push(NavRequest::OpenReader {
            position,
            label: self.active_label.clone(),
        });
    }

    /// The reader returned; `next` asks to open another position
    pub fn on_reader_closed(&mut self, next: Option<usize>) {
        if let Some(position) = self.reader_position.take() {
            if let Some(record) = self.records.get(position) {
                self.read_cache.remove(&record.id);
                self.changes.push(ListChange::Changed(position));
            }
        }
        if let Some(next) = next.filter(|&n| n < self.records.len()) {
            self.nav.push(NavRequest::ScrollTo(next));
            self.open_reader(next);
        }
    }

    // ---- guides ----

    pub fn current_guide(&self) -> Option<Guide> {
        let preferences = self.deps.preferences.get();
        if preferences.guide_download_thumb && !self.records.is_empty() {
            Some(Guide::Thumb)
        } else if preferences.guide_download_labels {
            Some(Guide::Labels)
        } else {
            None
        }
    }

    pub fn dismiss_guide(&mut self) {
        match self.current_guide() {
            Some(Guide::Thumb) => self
                .deps
                .preferences
                .update(|p| p.guide_download_thumb = false),
            Some(Guide::Labels) => {
                self.deps
                    .preferences
                    .update(|p| p.guide_download_labels = false);
                self.nav.push(NavRequest::OpenDrawerRight);
            }
            None => {}
        }
    }

    // ---- teardown ----

    /// Unsubscribe and drop all screen state; late completions are ignored
    pub fn teardown(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(subscription) = self.subscription.take() {
            self.deps.index.unsubscribe(subscription.id);
        }
        self.projection = None;
        self.records.clear();
        self.selection.clear();
        self.read_cache.clear();
        self.in_flight.clear();
        self.read_selection.clear();
        self.changes.drain();
        self.nav.clear();
    }

    fn position_of(&self, id: u64) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn record_at(&self, position: usize) -> &DownloadRecord {
        let len = self.records.len();
        self.records
            .get(position)
            .unwrap_or_else(|| panic!("download position {position} out of range for {len} items"))
    }
}

fn is_read(lookup: ReadLookup) -> bool {
    matches!(lookup, ReadLookup::Resolved(progress) if progress.current_page > 0)
}
