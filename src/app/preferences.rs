//! Persisted user preferences (`<config>/preferences.toml`)
//!
//! Written on every change by a background task. Failures to save are logged
//! and the in-memory value stays authoritative for the session.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Label shown last, `None` for the default group
    pub recent_download_label: Option<String>,
    /// Whether new downloads skip the label prompt
    pub has_default_download_label: bool,
    /// Label new downloads go to when `has_default_download_label` is set
    pub default_download_label: Option<String>,
    /// Last state of the "remove image files" delete toggle
    pub remove_image_files: bool,
    /// One-time guides still to be shown
    pub guide_download_thumb: bool,
    pub guide_download_labels: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            recent_download_label: None,
            has_default_download_label: false,
            default_download_label: None,
            remove_image_files: true,
            guide_download_thumb: true,
            guide_download_labels: true,
        }
    }
}

/// Where new downloads are filed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultLabelChoice {
    AskEachTime,
    DefaultGroup,
    Label(String),
}

impl Preferences {
    pub fn default_label_choice(&self) -> DefaultLabelChoice {
        match (&self.has_default_download_label, &self.default_download_label) {
            (false, _) => DefaultLabelChoice::AskEachTime,
            (true, None) => DefaultLabelChoice::DefaultGroup,
            (true, Some(label)) => DefaultLabelChoice::Label(label.clone()),
        }
    }

    pub fn set_default_label_choice(&mut self, choice: DefaultLabelChoice) {
        match choice {
            DefaultLabelChoice::AskEachTime => {
                self.has_default_download_label = false;
                self.default_download_label = None;
            }
            DefaultLabelChoice::DefaultGroup => {
                self.has_default_download_label = true;
                self.default_download_label = None;
            }
            DefaultLabelChoice::Label(label) => {
                self.has_default_download_label = true;
                self.default_download_label = Some(label);
            }
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse preferences")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content).context("Failed to write temp preferences file")?;
        std::fs::rename(&temp_path, path).context("Failed to rename temp preferences file")?;
        Ok(())
    }
}

/// Work for the background preferences writer
#[derive(Debug)]
enum WriteRequest {
    Save(Preferences),
    Flush(oneshot::Sender<()>),
}

/// Shared preferences, saved in the background on every update when backed by a file
#[derive(Debug, Clone, Default)]
pub struct PreferencesHandle {
    inner: Arc<RwLock<Preferences>>,
    writer: Option<UnboundedSender<WriteRequest>>,
}

impl PreferencesHandle {
    pub fn in_memory(preferences: Preferences) -> Self {
        Self {
            inner: Arc::new(RwLock::new(preferences)),
            writer: None,
        }
    }

    /// Load `path` and start its writer task on `runtime`
    pub fn open(path: impl Into<PathBuf>, runtime: &Handle) -> anyhow::Result<Self> {
        let path = path.into();
        let preferences = Preferences::load(&path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run_writer(path, rx));
        Ok(Self {
            inner: Arc::new(RwLock::new(preferences)),
            writer: Some(tx),
        })
    }

    /// Snapshot of the current values
    pub fn get(&self) -> Preferences {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` and queue a save; never touches the disk on the caller's thread
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Preferences),
    {
        let snapshot = {
            let mut preferences = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut preferences);
            preferences.clone()
        };
        if let Some(writer) = &self.writer {
            if writer.send(WriteRequest::Save(snapshot)).is_err() {
                tracing::warn!("Preferences writer stopped, change kept in memory only");
            }
        }
    }

    /// Wait until every update queued so far has been written
    pub async fn flush(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if writer.send(WriteRequest::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

/// Write queued snapshots in order, skipping ones superseded before their turn
async fn run_writer(path: PathBuf, mut requests: UnboundedReceiver<WriteRequest>) {
    while let Some(request) = requests.recv().await {
        let mut latest = None;
        let mut flushes = Vec::new();
        let mut next = Some(request);
        while let Some(request) = next {
            match request {
                WriteRequest::Save(snapshot) => latest = Some(snapshot),
                WriteRequest::Flush(done) => flushes.push(done),
            }
            next = requests.try_recv().ok();
        }

        if let Some(snapshot) = latest {
            let target = path.clone();
            match tokio::task::spawn_blocking(move || snapshot.save(&target)).await {
                Ok(Ok(())) => tracing::trace!(path = %path.display(), "Preferences saved"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Failed to save preferences"),
                Err(e) => tracing::warn!(error = %e, "Preferences save task failed"),
            }
        }
        for done in flushes {
            let _ = done.send(());
        }
    }
}
