use super::config::Config;
use super::preferences::PreferencesHandle;
use crate::download::library::LocalLibrary;
use crate::file::layout::StorageLayout;
use crate::progress::{ReadProgressPool, ReadProgressResolver};
use crate::ui::download_list::{DownloadListController, DownloadListDeps, SavedState};
use crate::ui::label_list::LabelListController;
use crate::util::i18n::LocalizationManager;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Everything the screens share, wired from configuration
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub preferences: PreferencesHandle,
    pub i18n: Arc<LocalizationManager>,
    pub library: Arc<LocalLibrary>,
    pub progress: ReadProgressPool,
}

impl AppState {
    /// Create LocalizationManager, falling back to the built-in English strings
    fn create_i18n(language: &str) -> Arc<LocalizationManager> {
        Arc::new(LocalizationManager::new(language).unwrap_or_else(|e| {
            tracing::error!("Failed to load translations for '{}': {}", language, e);
            LocalizationManager::bundled()
        }))
    }

    /// Load config, preferences and the library from the config directory
    pub fn load(runtime: Handle) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let preferences =
            PreferencesHandle::open(crate::util::paths::get_preferences_path()?, &runtime)
                .context("Failed to load preferences")?;
        let library_path = crate::util::paths::get_library_path()?;
        Self::new(config, preferences, Some(library_path), runtime)
    }

    /// Wire the shared state; `library_path = None` keeps the library in memory
    pub fn new(
        config: Config,
        preferences: PreferencesHandle,
        library_path: Option<PathBuf>,
        runtime: Handle,
    ) -> anyhow::Result<Self> {
        let i18n = Self::create_i18n(&config.general.language);
        let resolver = Arc::new(ReadProgressResolver::new(
            StorageLayout::new(&config.storage.download_root),
            config.progress_cache_dir(),
        ));
        let library = match library_path {
            Some(path) => LocalLibrary::open(path)?,
            None => LocalLibrary::new(),
        }
        .with_progress(Arc::clone(&resolver));
        let progress = ReadProgressPool::new(resolver, config.workers.read_progress, runtime);

        Ok(Self {
            config,
            preferences,
            i18n,
            library: Arc::new(library),
            progress,
        })
    }

    pub fn download_list(&self, saved: Option<SavedState>) -> DownloadListController {
        DownloadListController::new(
            DownloadListDeps {
                index: self.library.clone(),
                labels: self.library.clone(),
                preferences: self.preferences.clone(),
                i18n: Arc::clone(&self.i18n),
                progress: self.progress.clone(),
            },
            saved,
        )
    }

    pub fn label_list(&self) -> LabelListController {
        LabelListController::new(self.library.clone(), vec![self.i18n.get("default-label-name")])
    }
}
