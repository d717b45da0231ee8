use serde::{Deserialize, Serialize};

/// Lifecycle state of a download as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    #[default]
    None,
    Wait,
    Download,
    Failed,
    Finish,
}

impl DownloadState {
    /// Returns true while the engine owns the download (queued or transferring)
    pub fn is_running(self) -> bool {
        matches!(self, DownloadState::Wait | DownloadState::Download)
    }
}

/// A single download as owned by the download index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: u64,
    /// Opaque token paired with `id`; read-progress markers must carry both
    pub token: String,
    pub title: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub category: u32,
    #[serde(default)]
    pub rating: f32,
    /// Label name, `None` for the default group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub state: DownloadState,
    /// Total page count; zero or negative when not yet known
    #[serde(default)]
    pub total: i32,
    /// Finished page count; negative when not yet known
    #[serde(default)]
    pub finished: i32,
    /// Transfer speed in bytes per second
    #[serde(default)]
    pub speed: i64,
    /// Legacy retry count shown next to a failed state
    #[serde(default)]
    pub legacy: i32,
}

impl DownloadRecord {
    pub fn new(id: u64, token: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            token: token.into(),
            title: title.into(),
            uploader: String::new(),
            category: 0,
            rating: 0.0,
            label: None,
            state: DownloadState::None,
            total: 0,
            finished: 0,
            speed: 0,
            legacy: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_state(mut self, state: DownloadState) -> Self {
        self.state = state;
        self
    }

    pub fn with_pages(mut self, finished: i32, total: i32) -> Self {
        self.finished = finished;
        self.total = total;
        self
    }

    pub fn with_category(mut self, category: u32) -> Self {
        self.category = category;
        self
    }

    /// Returns true if this record belongs to the given group (`None` = default)
    pub fn in_group(&self, label: Option<&str>) -> bool {
        self.label.as_deref() == label
    }
}
