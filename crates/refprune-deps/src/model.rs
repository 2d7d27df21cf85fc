//! The project graph produced by [`GraphBuilder`](crate::GraphBuilder)

use crate::manifest::Document;
use refprune_core::{TargetFramework, VersionValue};
use refprune_fs::FileSystem;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Index of a project in a [`Model`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(pub(crate) usize);

/// A `<PackageReference>` declared by one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    /// Package id as declared
    pub name: String,
    /// Version text as declared (empty when the reference carries none)
    pub version_text: String,
    /// Parsed version; `None` for empty text or MSBuild expressions
    pub version: Option<VersionValue>,
}

impl PackageReference {
    /// Create a reference, parsing its version text
    pub fn new(name: impl Into<String>, version_text: impl Into<String>) -> Self {
        let version_text = version_text.into();
        let version = VersionValue::parse(&version_text).ok();
        Self {
            name: name.into(),
            version_text,
            version,
        }
    }

    /// Whether this reference names `package` (ids are case-insensitive)
    pub fn is_named(&self, package: &str) -> bool {
        self.name.eq_ignore_ascii_case(package)
    }
}

/// A `<ProjectReference>` resolved to a project in the same model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReference {
    /// `Include` text as written in the manifest
    pub include: String,
    /// The referenced project
    pub project: ProjectId,
}

/// One manifest and what it declares
#[derive(Debug, Clone)]
pub struct Project {
    /// Position in the model
    pub id: ProjectId,
    /// Canonical absolute manifest path
    pub path: PathBuf,
    /// Display name (manifest file stem)
    pub name: String,
    /// Declared package references
    pub packages: Vec<PackageReference>,
    /// Declared project references
    pub project_references: Vec<ProjectReference>,
    /// Target frameworks from `TargetFramework` / `TargetFrameworks`
    pub target_frameworks: Vec<TargetFramework>,
    /// Parsed manifest as it was read
    pub document: Document,
}

impl Project {
    /// Direct package reference named `package`
    pub fn package(&self, package: &str) -> Option<&PackageReference> {
        self.packages.iter().find(|p| p.is_named(package))
    }
}

/// The analyzed project graph
#[derive(Clone)]
pub struct Model {
    pub(crate) root: PathBuf,
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) projects: Vec<Project>,
    pub(crate) index: HashMap<PathBuf, ProjectId>,
    pub(crate) roots: BTreeSet<ProjectId>,
    pub(crate) packages: BTreeMap<(String, Option<VersionValue>), PackageReference>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("root", &self.root)
            .field("projects", &self.projects)
            .field("roots", &self.roots)
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub(crate) fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root,
            fs,
            projects: Vec::new(),
            index: HashMap::new(),
            roots: BTreeSet::new(),
            packages: BTreeMap::new(),
        }
    }

    /// Filesystem the manifests were read from; suggestions write through it
    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Directory the model was built from
    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    /// Project by id
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to another model.
    pub fn project(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    /// Project by canonical manifest path
    pub fn find(&self, path: &Path) -> Option<&Project> {
        self.index.get(path).map(|id| self.project(*id))
    }

    /// Every project, in discovery order
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Projects no other project references
    pub fn roots(&self) -> impl Iterator<Item = &Project> {
        self.roots.iter().map(|id| self.project(*id))
    }

    /// Every distinct `(package, version)` declared anywhere in the model
    pub fn packages(&self) -> impl Iterator<Item = &PackageReference> {
        self.packages.values()
    }

    /// Number of projects
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether no manifest was found
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub(crate) fn register_packages(&mut self, packages: &[PackageReference]) {
        for package in packages {
            self.packages
                .entry((package.name.to_ascii_lowercase(), package.version.clone()))
                .or_insert_with(|| package.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refprune_fs::NativeFileSystem;

    #[test]
    fn test_package_registry_deduplicates() {
        let fs = Arc::new(NativeFileSystem::new(std::env::temp_dir()).unwrap());
        let mut model = Model::new(std::env::temp_dir(), fs);
        model.register_packages(&[
            PackageReference::new("Serilog", "3.1.1"),
            PackageReference::new("serilog", "3.1.1.0"),
            PackageReference::new("Serilog", "2.12.0"),
        ]);
        model.register_packages(&[PackageReference::new("SERILOG", "3.1.1")]);
        assert_eq!(model.packages().count(), 2);
    }

    #[test]
    fn test_reference_parses_version() {
        let reference = PackageReference::new("Polly", "$(PollyVersion)");
        assert_eq!(reference.version, None);
        assert!(reference.is_named("polly"));
        assert_eq!(
            PackageReference::new("Polly", "8.2.0").version,
            Some(VersionValue::new(8, 2, 0, 0))
        );
    }
}
