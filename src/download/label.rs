//! Download labels and the label store contract
//!
//! A label is a named, user-ordered group of downloads. Its `id` is stable
//! across renames so ephemeral UI state can be keyed by it.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Name of the implicit group holding unlabeled downloads. Never a valid label name.
pub const DEFAULT_LABEL_NAME: &str = "Default";

/// Stable label identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(Uuid);

impl LabelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LabelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LabelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    /// Rank in the user-defined order (0 = first)
    pub order: usize,
}

/// Label name validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("Label name is empty")]
    Empty,

    #[error("Label name '{0}' is reserved")]
    Reserved(String),

    #[error("Label '{0}' already exists")]
    Exists(String),

    #[error("Label not found: {0}")]
    NotFound(String),
}

/// Ordered, persisted collection of labels
///
/// Implementations own name uniqueness and the persisted order.
pub trait LabelStore: Send + Sync {
    /// All labels in their persisted order
    fn list(&self) -> Vec<Label>;

    /// Append a new label at the end of the order
    fn add(&self, name: &str) -> Result<Label, LabelError>;

    fn rename(&self, old: &str, new: &str) -> Result<(), LabelError>;

    fn delete(&self, name: &str) -> Result<(), LabelError>;

    /// Move the label at `from` to `to`. Both must be in range.
    fn move_label(&self, from: usize, to: usize);

    fn contains(&self, name: &str) -> bool;
}

/// Validate a label name against the reserved names and the store
///
/// `current` is the label's own name when renaming; it never counts as a duplicate.
pub fn validate_label_name(
    name: &str,
    reserved: &[&str],
    current: Option<&str>,
    store: &dyn LabelStore,
) -> Result<(), LabelError> {
    if name.is_empty() {
        return Err(LabelError::Empty);
    }
    if name == DEFAULT_LABEL_NAME || reserved.contains(&name) {
        return Err(LabelError::Reserved(name.to_string()));
    }
    if current != Some(name) && store.contains(name) {
        return Err(LabelError::Exists(name.to_string()));
    }
    Ok(())
}
