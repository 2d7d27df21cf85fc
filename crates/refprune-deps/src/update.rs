//! Safe file update operations

use crate::Result;
use refprune_fs::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File updater that performs atomic writes
pub struct FileUpdater {
    dry_run: bool,
}

impl FileUpdater {
    /// Create a new file updater
    ///
    /// # Arguments
    /// * `dry_run` - If true, don't actually write changes
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Replace a file's contents all-or-nothing.
    ///
    /// The new contents go to `<file>.<ext>.tmp` next to the original (same
    /// filesystem), then the temp file is renamed over it. On failure the
    /// temp file is removed and the original is untouched.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or renamed
    pub async fn update_file<F: FileSystem + ?Sized>(
        &self,
        fs: &Arc<F>,
        path: &Path,
        new_contents: &str,
    ) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        let temp_path = temp_path(path);
        if let Err(e) = fs.write(&temp_path, new_contents).await {
            let _ = fs.remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs.rename(&temp_path, path).await {
            let _ = fs.remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = new_contents.len(), "manifest written");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use refprune_fs::NativeFileSystem;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_update_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("App.csproj");
        let fs = Arc::new(NativeFileSystem::new(temp_dir.path()).unwrap());

        std::fs::write(&file_path, "<Project />").unwrap();

        let updater = FileUpdater::new(false);
        updater
            .update_file(&fs, &file_path, "<Project Sdk=\"x\" />")
            .await
            .unwrap();

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "<Project Sdk=\"x\" />");
        assert!(!temp_dir.path().join("App.csproj.tmp").exists());
    }

    #[tokio::test]
    async fn test_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("App.csproj");
        let fs = Arc::new(NativeFileSystem::new(temp_dir.path()).unwrap());

        std::fs::write(&file_path, "<Project />").unwrap();

        let updater = FileUpdater::new(true);
        updater
            .update_file(&fs, &file_path, "changed")
            .await
            .unwrap();

        let content = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(content, "<Project />");
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        assert_eq!(
            temp_path(Path::new("/r/App/App.csproj")),
            PathBuf::from("/r/App/App.csproj.tmp")
        );
    }
}
