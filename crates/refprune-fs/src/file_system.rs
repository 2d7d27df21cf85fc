//! FileSystem trait used by the graph builder and manifest writer.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// Options for manifest discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Follow symbolic links (default: false).
    pub follow_symlinks: bool,

    /// Maximum directory depth (default: 64).
    pub max_depth: usize,

    /// Include hidden files and directories (default: false).
    pub include_hidden: bool,

    /// Respect .gitignore files (default: true).
    pub respect_gitignore: bool,

    /// Extra glob patterns to skip, relative to the discovery root.
    /// Build output directories are skipped by default.
    pub ignore_patterns: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: 64,
            include_hidden: false,
            respect_gitignore: true,
            ignore_patterns: vec!["**/bin/**".to_string(), "**/obj/**".to_string()],
        }
    }
}

/// Async filesystem operations scoped to a single root directory.
///
/// Every path argument is validated against [`FileSystem::root`]; paths that
/// escape it fail with `io::ErrorKind::PermissionDenied`.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Check if a path exists and is a regular file.
    async fn is_file(&self, path: &Path) -> io::Result<bool>;

    /// Read file contents as a string.
    ///
    /// # Errors
    ///
    /// Returns `io::ErrorKind::NotFound` if the file doesn't exist and
    /// `io::ErrorKind::InvalidData` if it is not valid UTF-8.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string contents to a file, overwriting it.
    async fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Rename a file. Atomic on POSIX when both paths share a filesystem.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Recursively find files under `root` whose extension (with leading dot)
    /// is one of `extensions`. Results are canonical and sorted.
    async fn discover_files(
        &self,
        root: &Path,
        extensions: &[&str],
        options: &DiscoveryOptions,
    ) -> io::Result<BTreeSet<PathBuf>>;

    /// Canonicalize a path, resolving `.`/`..` and symlinks.
    ///
    /// Returns `io::ErrorKind::NotFound` if the path doesn't exist.
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// The root this filesystem is scoped to.
    fn root(&self) -> &Path;
}
