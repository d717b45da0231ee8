use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

const APP_DIR_NAME: &str = "shelf";

// Global config directory override (for --config flag and tests)
static CONFIG_DIR_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Set config directory override (used by --config flag and tests)
pub fn set_config_dir_override(path: Option<PathBuf>) {
    *CONFIG_DIR_OVERRIDE
        .write()
        .unwrap_or_else(PoisonError::into_inner) = path;
}

pub fn get_config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Find config directory by searching in priority order:
/// 1. Override from --config flag or set_config_dir_override()
/// 2. Environment variable SHELF_CONFIG_DIR
/// 3. User config directory (`~/.config/shelf/` on Unix, `%APPDATA%\shelf\` on Windows)
/// 4. Current working directory (`./config/`)
/// 5. Executable directory (`<exe_dir>/config/`)
///
/// If none exists, creates the user config directory.
pub fn find_config_directory() -> Result<PathBuf> {
    if let Some(override_path) = get_config_dir_override() {
        if override_path.exists() || std::env::var("SHELF_TEST_MODE").is_ok() {
            tracing::debug!("Using config directory override: {:?}", override_path);
            return Ok(override_path);
        }
        tracing::warn!("Config directory override does not exist: {:?}", override_path);
    }

    if let Ok(env_path) = std::env::var("SHELF_CONFIG_DIR") {
        let env_config = PathBuf::from(env_path);
        if env_config.exists() {
            tracing::debug!("Found config directory from SHELF_CONFIG_DIR: {:?}", env_config);
            return Ok(env_config);
        }
    }

    if let Ok(user_config) = get_user_config_dir() {
        if user_config.exists() {
            return Ok(user_config);
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let cwd_config = cwd.join("config");
        if cwd_config.exists() {
            return Ok(cwd_config);
        }
    }

    if let Some(exe_dir) = exe_dir() {
        let exe_config = exe_dir.join("config");
        if exe_config.exists() {
            return Ok(exe_config);
        }
    }

    let user_config = get_user_config_dir()?;
    std::fs::create_dir_all(&user_config).context("Failed to create user config directory")?;
    tracing::info!("Created config directory at: {:?}", user_config);
    Ok(user_config)
}

/// Platform-specific user config directory
fn get_user_config_dir() -> Result<PathBuf> {
    let base_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine user config directory"))?;
    Ok(base_dir.join(APP_DIR_NAME))
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
}

pub fn get_app_config_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("settings.toml"))
}

pub fn get_preferences_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("preferences.toml"))
}

pub fn get_library_path() -> Result<PathBuf> {
    Ok(find_config_directory()?.join("library.toml"))
}

pub fn get_logs_dir() -> Result<PathBuf> {
    Ok(find_config_directory()?.join(".logs"))
}

/// Default download root: `<cwd>/Downloads`, else `<exe_dir>/Downloads`
pub fn resolve_default_download_directory() -> PathBuf {
    if let Ok(cwd) = std::env::current_dir() {
        return cwd.join("Downloads");
    }
    if let Some(dir) = exe_dir() {
        return dir.join("Downloads");
    }
    PathBuf::from("Downloads")
}

/// Resolve a relative path against the config directory; absolute paths pass through
pub fn resolve_relative_to_config(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match find_config_directory() {
        Ok(config_dir) => config_dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Locate a bundled resource directory (e.g. `locales`)
///
/// Searched in order: the user data directory, the config directory, the
/// current working directory, the executable directory, and the crate root.
pub fn find_resource_directory(name: &str) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(data_dir) = dirs::data_dir() {
        candidates.push(data_dir.join(APP_DIR_NAME).join(name));
    }
    if let Ok(config_dir) = find_config_directory() {
        candidates.push(config_dir.join(name));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join(name));
    }
    if let Some(dir) = exe_dir() {
        candidates.push(dir.join(name));
    }
    candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join(name));

    candidates
        .into_iter()
        .find(|c| c.is_dir())
        .ok_or_else(|| anyhow::anyhow!("Resource directory '{}' not found", name))
}
