//! Native filesystem implementation using std::fs + tokio.

use crate::{DiscoveryOptions, FileSystem};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::task;

/// Native filesystem scoped to a root directory.
///
/// Blocking std::fs calls run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct NativeFileSystem {
    root: PathBuf,
}

impl NativeFileSystem {
    /// Create a filesystem scoped to `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or can't be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Root does not exist: {} ({e})", root.as_ref().display()),
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve `path` against the root and make sure it stays inside it.
    ///
    /// Paths that don't exist yet are normalised syntactically after
    /// canonicalizing their parent, so a temp file next to a manifest validates.
    fn validate_path(&self, path: &Path) -> io::Result<PathBuf> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let resolved = match absolute.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => match (absolute.parent(), absolute.file_name()) {
                (Some(parent), Some(name)) => match parent.canonicalize() {
                    Ok(parent) => parent.join(name),
                    Err(_) => normalize_lexically(&absolute),
                },
                _ => normalize_lexically(&absolute),
            },
        };

        if !resolved.starts_with(&self.root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "Path traversal detected: {} is outside root {}",
                    resolved.display(),
                    self.root.display()
                ),
            ));
        }

        Ok(resolved)
    }
}

/// Remove `.` and `..` components without touching the disk.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f).await.map_err(io::Error::other)?
}

#[async_trait::async_trait]
impl FileSystem for NativeFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        blocking(move || Ok(validated.exists())).await
    }

    async fn is_file(&self, path: &Path) -> io::Result<bool> {
        let validated = self.validate_path(path)?;
        blocking(move || Ok(validated.is_file())).await
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let validated = self.validate_path(path)?;
        blocking(move || std::fs::read_to_string(&validated)).await
    }

    async fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        let contents = contents.to_string();
        blocking(move || std::fs::write(&validated, contents)).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = self.validate_path(from)?;
        let to = self.validate_path(to)?;
        blocking(move || std::fs::rename(&from, &to)).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        let validated = self.validate_path(path)?;
        blocking(move || {
            if std::fs::symlink_metadata(&validated)?.file_type().is_symlink() {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "Refusing to remove symlink",
                ));
            }
            std::fs::remove_file(&validated)
        })
        .await
    }

    async fn discover_files(
        &self,
        root: &Path,
        extensions: &[&str],
        options: &DiscoveryOptions,
    ) -> io::Result<BTreeSet<PathBuf>> {
        let walk_root = self.validate_path(root)?;
        let extensions: Vec<String> = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        let options = options.clone();
        let scope = self.root.clone();

        blocking(move || discover_files_sync(&walk_root, &extensions, &options, &scope)).await
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let validated = self.validate_path(path)?;
        blocking(move || validated.canonicalize()).await
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

fn discover_files_sync(
    walk_root: &Path,
    extensions: &[String],
    options: &DiscoveryOptions,
    scope: &Path,
) -> io::Result<BTreeSet<PathBuf>> {
    let mut walker = WalkBuilder::new(walk_root);
    walker
        .follow_links(options.follow_symlinks)
        .hidden(!options.include_hidden)
        .git_ignore(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .max_depth(Some(options.max_depth));

    if !options.ignore_patterns.is_empty() {
        let mut overrides = OverrideBuilder::new(walk_root);
        for pattern in &options.ignore_patterns {
            overrides
                .add(&format!("!{pattern}"))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        }
        let overrides = overrides
            .build()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        walker.overrides(overrides);
    }

    let mut discovered = BTreeSet::new();
    for entry in walker.build() {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.contains(&format!(".{}", ext.to_ascii_lowercase())) {
            continue;
        }

        let canonical = path.canonicalize()?;
        if canonical.starts_with(scope) {
            discovered.insert(canonical);
        }
    }

    Ok(discovered)
}
