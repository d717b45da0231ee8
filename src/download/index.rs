//! Download index contract
//!
//! The index owns every download record and keeps one live, ordered projection
//! per label plus one for the default group. Screens never edit projections
//! directly; they read snapshots through a [`ProjectionHandle`] and mutate only
//! through the index's methods. Every mutation is announced as an
//! [`IndexEvent`] on each subscriber's channel.

use super::record::DownloadRecord;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Identity of one live projection list
///
/// Stable for the lifetime of the list, including across label renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectionId(pub(crate) u64);

/// Opaque reference to a live projection held by a screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionHandle {
    id: ProjectionId,
    label: Option<String>,
}

impl ProjectionHandle {
    pub(crate) fn new(id: ProjectionId, label: Option<String>) -> Self {
        Self { id, label }
    }

    pub fn id(&self) -> ProjectionId {
        self.id
    }

    /// Label the projection was obtained for, `None` for the default group
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Change notification emitted by the index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    /// A record was inserted into `projection` at `position`
    Added {
        projection: ProjectionId,
        id: u64,
        position: usize,
    },
    /// A record's fields changed in place
    Updated { projection: ProjectionId, id: u64 },
    /// A record left `projection`; `position` is where it was
    Removed {
        projection: ProjectionId,
        id: u64,
        position: usize,
    },
    /// The whole projection was replaced or reordered
    Reloaded { projection: ProjectionId },
    /// Every record may have changed (e.g. read progress reset)
    AllUpdated,
    LabelRenamed { from: String, to: String },
    /// A label was deleted and its records merged into the default group
    LabelSetChanged,
    /// The label list changed (added, renamed, moved or deleted)
    LabelsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A live event subscription; drop or pass its id to `unsubscribe` to end it
#[derive(Debug)]
pub struct Subscription {
    pub id: ListenerId,
    pub events: UnboundedReceiver<IndexEvent>,
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Download record not found: {0}")]
    UnknownRecord(u64),

    #[error("Label not found: {0}")]
    UnknownLabel(String),

    #[error("Projection is no longer live")]
    UnknownProjection,

    #[error("Reorder does not match the projection contents")]
    InvalidOrder,
}

/// Authoritative, label-partitioned set of downloads
pub trait DownloadIndex: Send + Sync {
    fn default_projection(&self) -> ProjectionHandle;

    /// Projection for `label`, or `None` if the label does not exist
    fn projection_for_label(&self, label: &str) -> Option<ProjectionHandle>;

    /// Current contents of a projection in display order
    ///
    /// Returns an empty list for a projection that is no longer live.
    fn records(&self, projection: ProjectionId) -> Vec<DownloadRecord>;

    fn record(&self, id: u64) -> Option<DownloadRecord>;

    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: ListenerId);

    fn start_all(&self) -> Result<(), IndexError>;

    fn stop_all(&self) -> Result<(), IndexError>;

    fn start_one(&self, id: u64) -> Result<(), IndexError>;

    /// Start every listed download; ids no longer present are skipped
    fn start_range(&self, ids: &[u64]) -> Result<(), IndexError>;

    fn stop_one(&self, id: u64) -> Result<(), IndexError>;

    fn stop_range(&self, ids: &[u64]) -> Result<(), IndexError>;

    fn delete_one(&self, id: u64) -> Result<(), IndexError>;

    fn delete_range(&self, ids: &[u64]) -> Result<(), IndexError>;

    /// Move records into `label` (`None` = default group)
    fn change_label(
        &self,
        records: &[DownloadRecord],
        label: Option<&str>,
    ) -> Result<(), IndexError>;

    fn reset_all_progress(&self) -> Result<(), IndexError>;

    /// Replace the order of a projection; `order` must be a permutation of its ids
    fn reorder_projection(&self, projection: ProjectionId, order: &[u64])
    -> Result<(), IndexError>;
}
