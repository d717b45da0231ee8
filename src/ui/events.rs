//! Render deltas and navigation requests produced by the controllers

/// A change the view must apply to its rendered list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Inserted(usize),
    Changed(usize),
    Removed(usize),
    Moved { from: usize, to: usize },
    /// Re-render everything
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Empty,
    Populated,
}

impl ViewState {
    pub fn for_len(len: usize) -> Self {
        if len == 0 {
            ViewState::Empty
        } else {
            ViewState::Populated
        }
    }
}

/// Requests for the navigation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavRequest {
    CloseDrawer,
    OpenDrawerRight,
    OpenLabelEditor,
    OpenReader {
        position: usize,
        label: Option<String>,
    },
    ScrollTo(usize),
    Back,
}

/// Pending render deltas, drained by the view
///
/// A `Reset` supersedes everything queued before it.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    changes: Vec<ListChange>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: ListChange) {
        if change == ListChange::Reset {
            self.changes.clear();
        }
        self.changes.push(change);
    }

    pub fn drain(&mut self) -> Vec<ListChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_supersedes_queued_deltas() {
        let mut queue = ChangeQueue::new();
        queue.push(ListChange::Inserted(0));
        queue.push(ListChange::Changed(3));
        queue.push(ListChange::Reset);
        queue.push(ListChange::Reset);
        queue.push(ListChange::Removed(1));

        assert_eq!(queue.drain(), vec![ListChange::Reset, ListChange::Removed(1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_view_state_for_len() {
        assert_eq!(ViewState::for_len(0), ViewState::Empty);
        assert_eq!(ViewState::for_len(2), ViewState::Populated);
    }
}
