//! Proposed manifest edits produced by the detectors

use crate::error::{ReferenceKind, Result};
use crate::manifest::{Document, ManifestMutator};
use crate::model::Project;
use crate::update::FileUpdater;
use refprune_core::VersionValue;
use refprune_fs::FileSystem;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a suggestion changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionKind {
    /// Drop a package reference that is already brought in transitively
    RemovePackage {
        /// Package id as declared
        package: String,
        /// What already provides it (`project Lib`, `package Serilog.AspNetCore`)
        provided_by: String,
    },
    /// Drop a project reference that is reachable through another one
    RemoveProjectReference {
        /// `Include` text as declared
        include: String,
        /// Name of the sibling reference it is reachable through
        reachable_through: String,
    },
    /// Move a package reference to a newer version
    UpgradePackage {
        /// Package id as declared
        package: String,
        /// Declared version text
        from: String,
        /// Version to move to
        to: VersionValue,
    },
}

/// A proposed edit to one project's manifest.
///
/// [`apply`](Suggestion::apply) re-reads the manifest, edits it and replaces
/// the file in one step. Applying twice is a no-op, also when the calls
/// overlap.
pub struct Suggestion {
    project: PathBuf,
    project_name: String,
    kind: SuggestionKind,
    fs: Arc<dyn FileSystem>,
    applied: AtomicBool,
    /// Held across read/mutate/write
    apply_lock: Mutex<()>,
}

impl Suggestion {
    /// Create a suggestion against `project`
    pub fn new(project: &Project, kind: SuggestionKind, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            project: project.path.clone(),
            project_name: project.name.clone(),
            kind,
            fs,
            applied: AtomicBool::new(false),
            apply_lock: Mutex::new(()),
        }
    }

    /// Manifest the suggestion edits
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Display name of the edited project
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// The proposed change
    pub fn kind(&self) -> &SuggestionKind {
        &self.kind
    }

    /// Human-readable description
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether [`apply`](Suggestion::apply) has already succeeded
    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::SeqCst)
    }

    /// Write the change to disk.
    ///
    /// Returns `Ok(false)` when the suggestion was already applied.
    ///
    /// # Errors
    ///
    /// A reference that is no longer declared fails with a mutation error;
    /// the file is not modified in that case.
    pub async fn apply(&self) -> Result<bool> {
        let _guard = self.apply_lock.lock().await;
        if self.is_applied() {
            return Ok(false);
        }

        let text = self.fs.read_to_string(&self.project).await?;
        let mut document = Document::parse(&text)?;
        let mut mutator = ManifestMutator::new(&mut document, &self.project_name);
        match &self.kind {
            SuggestionKind::RemovePackage { package, .. } => {
                mutator.remove_reference(ReferenceKind::Package, package)?
            }
            SuggestionKind::RemoveProjectReference { include, .. } => {
                mutator.remove_reference(ReferenceKind::Project, include)?
            }
            SuggestionKind::UpgradePackage { package, to, .. } => {
                mutator.set_reference_version(package, &to.to_string())?
            }
        }

        FileUpdater::new(false)
            .update_file(&self.fs, &self.project, &document.to_xml())
            .await?;
        self.applied.store(true, Ordering::SeqCst);
        tracing::info!(project = %self.project_name, change = %self, "suggestion applied");
        Ok(true)
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SuggestionKind::RemovePackage {
                package,
                provided_by,
            } => write!(
                f,
                "{}: remove package reference '{package}', already provided by {provided_by}",
                self.project_name
            ),
            SuggestionKind::RemoveProjectReference {
                include,
                reachable_through,
            } => write!(
                f,
                "{}: remove project reference '{include}', already reachable through {reachable_through}",
                self.project_name
            ),
            SuggestionKind::UpgradePackage { package, from, to } => write!(
                f,
                "{}: upgrade '{package}' from {from} to {to}",
                self.project_name
            ),
        }
    }
}

impl fmt::Debug for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suggestion")
            .field("project", &self.project)
            .field("kind", &self.kind)
            .field("applied", &self.is_applied())
            .finish_non_exhaustive()
    }
}
