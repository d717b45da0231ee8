use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration (saved to `<config>/settings.toml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root holding one directory per download
    pub download_root: PathBuf,
    /// Read-progress cache directory; relative paths resolve against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_cache: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_root: crate::util::paths::resolve_default_download_directory(),
            progress_cache: Some(PathBuf::from("progress")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Concurrent read-progress lookups
    #[serde(default = "default_read_progress_workers")]
    pub read_progress: usize,
}

fn default_read_progress_workers() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            read_progress: default_read_progress_workers(),
        }
    }
}

impl Config {
    /// Load from the config directory, falling back to defaults if the file is absent
    pub fn load() -> anyhow::Result<Self> {
        let path = crate::util::paths::get_app_config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = crate::util::paths::get_app_config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate().context("Cannot save invalid config")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;

        // Atomic write using temp file + rename
        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, &content).context("Failed to write temp config file")?;
        std::fs::rename(&temp_path, path).context("Failed to rename temp config file")?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers.read_progress == 0 {
            anyhow::bail!("workers.read_progress must be at least 1");
        }
        if self.storage.download_root.as_os_str().is_empty() {
            anyhow::bail!("storage.download_root must not be empty");
        }
        Ok(())
    }

    /// Progress cache directory resolved against the config directory
    pub fn progress_cache_dir(&self) -> Option<PathBuf> {
        self.storage
            .progress_cache
            .as_deref()
            .map(crate::util::paths::resolve_relative_to_config)
    }
}
