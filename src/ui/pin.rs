//! Ephemeral pinned flags for labels
//!
//! Keyed by [`LabelId`] so a rename never loses the flag. Lives only in memory.

use crate::download::label::LabelId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PinOverlay {
    pins: HashMap<LabelId, bool>,
}

impl PinOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pinned(&self, id: LabelId) -> bool {
        self.pins.get(&id).copied().unwrap_or(false)
    }

    /// Set the flag; returns true if the value actually changed
    pub fn set(&mut self, id: LabelId, pinned: bool) -> bool {
        let previous = self.pins.insert(id, pinned).unwrap_or(false);
        previous != pinned
    }

    pub fn remove(&mut self, id: LabelId) {
        self.pins.remove(&id);
    }

    pub fn clear(&mut self) {
        self.pins.clear();
    }
}
