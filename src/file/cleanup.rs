//! Background removal of download directories

use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Remove `dirs` recursively on the blocking pool
///
/// Missing directories are skipped; other failures are logged and skipped.
/// The task resolves to the number of directories actually removed.
pub fn remove_dirs(runtime: &Handle, dirs: Vec<PathBuf>) -> JoinHandle<usize> {
    runtime.spawn_blocking(move || {
        let mut removed = 0;
        for dir in dirs {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::debug!(path = %dir.display(), "Removed download directory");
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Failed to remove download directory"
                    );
                }
            }
        }
        removed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_remove_dirs_skips_missing() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("1-One");
        std::fs::create_dir_all(present.join("pages")).unwrap();
        std::fs::write(present.join("pages/001.jpg"), b"x").unwrap();
        let missing = temp.path().join("2-Two");

        let removed = remove_dirs(&Handle::current(), vec![present.clone(), missing])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!present.exists());
    }
}
