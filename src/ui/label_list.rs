//! Label editor controller
//!
//! Renders the label collection in store order, validates edits before they
//! reach the store, and keeps the pinned overlay driven by swipe gestures.

use super::events::{ChangeQueue, ListChange, ViewState};
use super::pin::PinOverlay;
use crate::download::label::{Label, LabelError, LabelId, LabelStore, validate_label_name};
use std::ops::Range;
use std::sync::Arc;

/// Horizontal offset of a pinned row, as a fraction of the row width
pub const PINNED_SLIDE: f32 = -0.5;

/// Part of a label row a gesture started in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRegion {
    SwipeHandle,
    DragHandle,
    Body,
}

/// Outcome of a swipe gesture on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeResult {
    Left,
    Right,
    Cancelled,
}

/// What the view needs to draw one label row
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub id: LabelId,
    pub name: String,
    pub pinned: bool,
    pub slide: f32,
}

pub struct LabelListController {
    store: Arc<dyn LabelStore>,
    labels: Vec<Label>,
    pins: PinOverlay,
    /// Names refused in addition to the built-in default name
    reserved: Vec<String>,
    changes: ChangeQueue,
    view_state: ViewState,
}

impl LabelListController {
    pub fn new(store: Arc<dyn LabelStore>, reserved: Vec<String>) -> Self {
        let labels = store.list();
        let view_state = ViewState::for_len(labels.len());
        Self {
            store,
            labels,
            pins: PinOverlay::new(),
            reserved,
            changes: ChangeQueue::new(),
            view_state,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn view_state(&self) -> ViewState {
        self.view_state
    }

    /// Render deltas queued since the last call
    pub fn take_changes(&mut self) -> Vec<ListChange> {
        self.changes.drain()
    }

    /// Re-read the labels after an outside change and re-render everything
    pub fn refresh(&mut self) {
        self.reload();
        self.changes.push(ListChange::Reset);
    }

    pub fn add_label(&mut self, name: &str) -> Result<LabelId, LabelError> {
        self.validate(name, None)?;
        let label = self.store.add(name)?;
        self.reload();
        let position = self
            .position_of(label.id)
            .unwrap_or(self.labels.len().saturating_sub(1));
        self.changes.push(ListChange::Inserted(position));
        tracing::info!(label = name, position, "Label created");
        Ok(label.id)
    }

    pub fn rename_label(&mut self, id: LabelId, new_name: &str) -> Result<(), LabelError> {
        let position = self
            .position_of(id)
            .ok_or_else(|| LabelError::NotFound(id.to_string()))?;
        let current = self.labels[position].name.clone();
        self.validate(new_name, Some(&current))?;
        self.store.rename(&current, new_name)?;
        self.reload();
        self.changes.push(ListChange::Changed(position));
        tracing::info!(from = %current, to = new_name, "Label renamed");
        Ok(())
    }

    pub fn delete_label(&mut self, id: LabelId) -> Result<(), LabelError> {
        let position = self
            .position_of(id)
            .ok_or_else(|| LabelError::NotFound(id.to_string()))?;
        let name = self.labels[position].name.clone();
        self.store.delete(&name)?;
        self.pins.remove(id);
        self.reload();
        self.changes.push(ListChange::Removed(position));
        tracing::info!(label = %name, "Label deleted");
        Ok(())
    }

    /// Persist a drag-reorder
    ///
    /// # Panics
    /// If either position is out of range.
    pub fn move_label(&mut self, from: usize, to: usize) {
        let len = self.labels.len();
        assert!(
            from < len && to < len,
            "label move {from} -> {to} out of range for {len} labels"
        );
        if from == to {
            return;
        }
        self.store.move_label(from, to);
        self.reload();
        self.changes.push(ListChange::Moved { from, to });
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn is_pinned(&self, position: usize) -> bool {
        self.pins.is_pinned(self.item_id(position))
    }

    /// Returns true if the pinned flag changed
    ///
    /// # Panics
    /// If `position` is out of range.
    pub fn set_pinned(&mut self, position: usize, pinned: bool) -> bool {
        let id = self.item_id(position);
        let changed = self.pins.set(id, pinned);
        if changed {
            self.changes.push(ListChange::Changed(position));
        }
        changed
    }

    pub fn on_swipe(&mut self, position: usize, result: SwipeResult) {
        let pinned = matches!(result, SwipeResult::Left);
        self.set_pinned(position, pinned);
    }

    /// Whether a swipe starting in `region` should be tracked
    pub fn swipe_reaction(&self, region: RowRegion) -> bool {
        region == RowRegion::SwipeHandle
    }

    pub fn can_start_drag(&self, region: RowRegion) -> bool {
        region == RowRegion::DragHandle
    }

    /// Positions a dragged row may be dropped on
    pub fn drag_range(&self) -> Range<usize> {
        0..self.labels.len()
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn item_id(&self, position: usize) -> LabelId {
        self.label_at(position).id
    }

    /// # Panics
    /// If `position` is out of range.
    pub fn row(&self, position: usize) -> LabelRow {
        let label = self.label_at(position);
        let pinned = self.pins.is_pinned(label.id);
        LabelRow {
            id: label.id,
            name: label.name.clone(),
            pinned,
            slide: if pinned { PINNED_SLIDE } else { 0.0 },
        }
    }

    pub fn teardown(&mut self) {
        self.pins.clear();
        self.changes.drain();
    }

    fn label_at(&self, position: usize) -> &Label {
        let len = self.labels.len();
        self.labels
            .get(position)
            .unwrap_or_else(|| panic!("label position {position} out of range for {len} labels"))
    }

    fn position_of(&self, id: LabelId) -> Option<usize> {
        self.labels.iter().position(|l| l.id == id)
    }

    fn validate(&self, name: &str, current: Option<&str>) -> Result<(), LabelError> {
        let reserved: Vec<&str> = self.reserved.iter().map(String::as_str).collect();
        validate_label_name(name, &reserved, current, self.store.as_ref())
    }

    fn reload(&mut self) {
        self.labels = self.store.list();
        self.view_state = ViewState::for_len(self.labels.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::library::LocalLibrary;
    use pretty_assertions::assert_eq;

    fn controller() -> (Arc<LocalLibrary>, LabelListController) {
        let library = Arc::new(LocalLibrary::new());
        let controller =
            LabelListController::new(library.clone(), vec!["Standard".to_string()]);
        (library, controller)
    }

    fn names(library: &LocalLibrary) -> Vec<String> {
        library.list().into_iter().map(|l| l.name).collect()
    }

    #[test]
    fn test_add_appends_and_signals_insert() {
        let (library, mut controller) = controller();
        assert_eq!(controller.view_state(), ViewState::Empty);

        controller.add_label("A").unwrap();
        controller.add_label("B").unwrap();

        assert_eq!(names(&library), vec!["A", "B"]);
        assert_eq!(
            controller.take_changes(),
            vec![ListChange::Inserted(0), ListChange::Inserted(1)]
        );
        assert_eq!(controller.view_state(), ViewState::Populated);
    }

    #[test]
    fn test_localized_reserved_name_rejected() {
        let (library, mut controller) = controller();
        assert_eq!(
            controller.add_label("Standard"),
            Err(LabelError::Reserved("Standard".to_string()))
        );
        assert!(names(&library).is_empty());
        assert!(controller.take_changes().is_empty());
    }

    #[test]
    fn test_rename_keeps_position_and_pin() {
        let (library, mut controller) = controller();
        controller.add_label("A").unwrap();
        let id = controller.add_label("B").unwrap();
        controller.set_pinned(1, true);
        controller.take_changes();

        controller.rename_label(id, "C").unwrap();

        assert_eq!(names(&library), vec!["A", "C"]);
        assert_eq!(controller.take_changes(), vec![ListChange::Changed(1)]);
        assert!(controller.is_pinned(1));
    }

    #[test]
    fn test_rename_to_existing_fails() {
        let (library, mut controller) = controller();
        let a = controller.add_label("A").unwrap();
        controller.add_label("B").unwrap();
        controller.take_changes();

        assert_eq!(
            controller.rename_label(a, "B"),
            Err(LabelError::Exists("B".to_string()))
        );
        assert_eq!(names(&library), vec!["A", "B"]);
        assert!(controller.take_changes().is_empty());
    }

    #[test]
    fn test_delete_drops_pin_and_signals_removal() {
        let (_library, mut controller) = controller();
        controller.add_label("A").unwrap();
        let b = controller.add_label("B").unwrap();
        controller.set_pinned(1, true);
        controller.take_changes();

        controller.delete_label(b).unwrap();

        assert_eq!(controller.take_changes(), vec![ListChange::Removed(1)]);
        assert!(!controller.pins.is_pinned(b));
    }

    #[test]
    fn test_move_same_position_is_noop() {
        let (_library, mut controller) = controller();
        controller.add_label("A").unwrap();
        controller.take_changes();
        controller.move_label(0, 0);
        assert!(controller.take_changes().is_empty());
    }

    #[test]
    fn test_pin_is_idempotent() {
        let (_library, mut controller) = controller();
        controller.add_label("A").unwrap();
        controller.take_changes();

        controller.on_swipe(0, SwipeResult::Left);
        controller.on_swipe(0, SwipeResult::Left);
        assert_eq!(controller.take_changes(), vec![ListChange::Changed(0)]);
        assert_eq!(controller.row(0).slide, PINNED_SLIDE);

        controller.on_swipe(0, SwipeResult::Cancelled);
        controller.on_swipe(0, SwipeResult::Right);
        assert_eq!(controller.take_changes(), vec![ListChange::Changed(0)]);
        assert_eq!(controller.row(0).slide, 0.0);
    }

    #[test]
    fn test_gesture_regions() {
        let (_library, controller) = controller();
        assert!(controller.swipe_reaction(RowRegion::SwipeHandle));
        assert!(!controller.swipe_reaction(RowRegion::Body));
        assert!(controller.can_start_drag(RowRegion::DragHandle));
        assert!(!controller.can_start_drag(RowRegion::SwipeHandle));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_pin_out_of_range_panics() {
        let (_library, mut controller) = controller();
        controller.set_pinned(0, true);
    }
}
