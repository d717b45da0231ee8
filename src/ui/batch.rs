//! Multi-select batch actions
//!
//! A batch is captured from the selection at the moment the action is invoked
//! and dispatched later as exactly one bulk call on the index.

use crate::download::index::{DownloadIndex, IndexError};
use crate::download::record::DownloadRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchKind {
    Start,
    Stop,
    Delete { remove_files: bool },
    /// Move to a label, `None` = default group
    Move { label: Option<String> },
}

/// Ids (and for delete/move, records) frozen at capture time
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub kind: BatchKind,
    pub ids: Vec<u64>,
    pub records: Vec<DownloadRecord>,
}

impl Batch {
    /// Collect the records at `positions` in ascending position order
    ///
    /// Positions outside `projection` are dropped.
    pub fn capture<I>(kind: BatchKind, positions: I, projection: &[DownloadRecord]) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut positions: Vec<usize> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();

        let picked: Vec<&DownloadRecord> = positions
            .into_iter()
            .filter_map(|p| projection.get(p))
            .collect();
        let ids = picked.iter().map(|r| r.id).collect();
        let records = match kind {
            BatchKind::Delete { .. } | BatchKind::Move { .. } => {
                picked.into_iter().cloned().collect()
            }
            BatchKind::Start | BatchKind::Stop => Vec::new(),
        };
        Self { kind, ids, records }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Issue the single bulk call for this batch
    pub fn dispatch(&self, index: &dyn DownloadIndex) -> Result<(), IndexError> {
        if self.is_empty() {
            return Ok(());
        }
        let result = match &self.kind {
            BatchKind::Start => index.start_range(&self.ids),
            BatchKind::Stop => index.stop_range(&self.ids),
            BatchKind::Delete { .. } => index.delete_range(&self.ids),
            BatchKind::Move { label } => index.change_label(&self.records, label.as_deref()),
        };
        match &result {
            Ok(()) => tracing::info!(kind = ?self.kind, count = self.ids.len(), "Batch dispatched"),
            Err(e) => tracing::error!(kind = ?self.kind, error = %e, "Batch failed"),
        }
        result
    }
}
