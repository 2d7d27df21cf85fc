//! Builds a [`Model`] from the manifests under a directory
//!
//! Project references are followed depth-first. Each manifest path gets a
//! slot before its references are visited; meeting a slot that is still in
//! progress means the references form a cycle.

use crate::error::{Result, StructuralError};
use crate::manifest::{Document, NodeId, MANIFEST_EXTENSIONS};
use crate::model::{Model, PackageReference, Project, ProjectId, ProjectReference};
use futures::future::BoxFuture;
use refprune_config::Settings;
use refprune_core::TargetFramework;
use refprune_fs::{normalize_lexically, DiscoveryOptions, FileSystem, NativeFileSystem};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Discovers manifests and links them into a project graph
pub struct GraphBuilder<F: FileSystem = NativeFileSystem> {
    fs: Arc<F>,
    options: DiscoveryOptions,
}

impl GraphBuilder<NativeFileSystem> {
    /// Builder over the native filesystem, scoped to `root`
    ///
    /// # Errors
    ///
    /// Returns an error if `root` doesn't exist.
    pub fn native(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Arc::new(NativeFileSystem::new(root)?)))
    }
}

enum Slot {
    InProgress,
    Built(ProjectId),
}

struct BuildState {
    root: PathBuf,
    slots: HashMap<PathBuf, Slot>,
    projects: Vec<Option<Project>>,
    /// Manifests currently being built, outermost first
    stack: Vec<PathBuf>,
}

/// What one manifest declares, before its project references are resolved
struct Declarations {
    document: Document,
    packages: Vec<PackageReference>,
    project_includes: Vec<String>,
    target_frameworks: Vec<TargetFramework>,
}

impl<F: FileSystem + 'static> GraphBuilder<F> {
    /// Create a builder with default discovery options
    pub fn new(fs: Arc<F>) -> Self {
        Self {
            fs,
            options: DiscoveryOptions::default(),
        }
    }

    /// Replace the discovery options
    pub fn with_options(mut self, options: DiscoveryOptions) -> Self {
        self.options = options;
        self
    }

    /// Add the settings' extra ignore patterns to discovery
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.options
            .ignore_patterns
            .extend(settings.ignore_patterns.iter().cloned());
        self
    }

    /// Filesystem the builder reads from
    pub fn filesystem(&self) -> &Arc<F> {
        &self.fs
    }

    /// Build the project graph of every manifest under `root`.
    ///
    /// # Errors
    ///
    /// Any unreadable or unparseable manifest, dangling or out-of-root
    /// project reference, or reference cycle fails the whole build.
    pub async fn build(&self, root: &Path) -> Result<Model> {
        let root = self
            .fs
            .canonicalize(root)
            .await
            .map_err(|source| StructuralError::Discovery {
                root: root.to_path_buf(),
                source,
            })?;
        let manifests = self
            .fs
            .discover_files(&root, MANIFEST_EXTENSIONS, &self.options)
            .await
            .map_err(|source| StructuralError::Discovery {
                root: root.clone(),
                source,
            })?;
        tracing::info!(root = %root.display(), manifests = manifests.len(), "building project graph");

        let mut state = BuildState {
            root: root.clone(),
            slots: HashMap::new(),
            projects: Vec::new(),
            stack: Vec::new(),
        };
        let mut discovered = Vec::with_capacity(manifests.len());
        for manifest in manifests {
            discovered.push(self.build_project(&mut state, manifest).await?);
        }

        let projects: Vec<Project> = state.projects.into_iter().flatten().collect();
        let referenced: HashSet<ProjectId> = projects
            .iter()
            .flat_map(|p| p.project_references.iter().map(|r| r.project))
            .collect();

        let fs: Arc<dyn FileSystem> = self.fs.clone();
        let mut model = Model::new(root, fs);
        model.roots = discovered
            .into_iter()
            .filter(|id| !referenced.contains(id))
            .collect();
        for project in projects {
            model.register_packages(&project.packages);
            model.index.insert(project.path.clone(), project.id);
            model.projects.push(project);
        }

        tracing::info!(
            projects = model.len(),
            roots = model.roots.len(),
            packages = model.packages.len(),
            "project graph built"
        );
        Ok(model)
    }

    fn build_project<'a>(
        &'a self,
        state: &'a mut BuildState,
        path: PathBuf,
    ) -> BoxFuture<'a, Result<ProjectId>> {
        Box::pin(async move {
            match state.slots.get(&path) {
                Some(Slot::Built(id)) => return Ok(*id),
                Some(Slot::InProgress) => {
                    let start = state.stack.iter().position(|p| *p == path).unwrap_or(0);
                    let mut cycle = state.stack[start..].to_vec();
                    cycle.push(path);
                    return Err(StructuralError::Cycle { cycle }.into());
                }
                None => {}
            }

            let id = ProjectId(state.projects.len());
            state.projects.push(None);
            state.slots.insert(path.clone(), Slot::InProgress);
            state.stack.push(path.clone());

            let declarations = self.read_declarations(&path).await?;
            let mut project_references = Vec::with_capacity(declarations.project_includes.len());
            for include in declarations.project_includes {
                let target = self.resolve_reference(&state.root, &path, &include).await?;
                let project = self.build_project(state, target).await?;
                project_references.push(ProjectReference { include, project });
            }

            state.stack.pop();
            state.slots.insert(path.clone(), Slot::Built(id));

            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!(
                project = %name,
                packages = declarations.packages.len(),
                references = project_references.len(),
                "project built"
            );
            state.projects[id.0] = Some(Project {
                id,
                path,
                name,
                packages: declarations.packages,
                project_references,
                target_frameworks: declarations.target_frameworks,
                document: declarations.document,
            });
            Ok(id)
        })
    }

    async fn read_declarations(&self, path: &Path) -> Result<Declarations> {
        let text = self
            .fs
            .read_to_string(path)
            .await
            .map_err(|source| StructuralError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let document = Document::parse(&text).map_err(|e| StructuralError::Unparseable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let Some(root) = document.root() else {
            return Err(StructuralError::Unparseable {
                path: path.to_path_buf(),
                reason: "no root element".into(),
            }
            .into());
        };

        Ok(Declarations {
            packages: package_references(&document, root),
            project_includes: project_includes(&document, root),
            target_frameworks: target_frameworks(&document, root),
            document,
        })
    }

    /// Resolve a `ProjectReference` include to a canonical manifest path
    async fn resolve_reference(&self, root: &Path, from: &Path, include: &str) -> Result<PathBuf> {
        let outside = || StructuralError::OutsideRoot {
            from: from.to_path_buf(),
            include: include.to_string(),
        };

        let relative = include.trim().replace('\\', "/");
        let directory = from.parent().unwrap_or(root);
        let target = normalize_lexically(&directory.join(relative));
        if !target.starts_with(root) {
            return Err(outside().into());
        }

        match self.fs.is_file(&target).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(StructuralError::MissingProject {
                    from: from.to_path_buf(),
                    include: include.to_string(),
                    target,
                }
                .into())
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return Err(outside().into()),
            Err(source) => return Err(StructuralError::Unreadable { path: target, source }.into()),
        }

        let canonical = self
            .fs
            .canonicalize(&target)
            .await
            .map_err(|source| StructuralError::Unreadable {
                path: target.clone(),
                source,
            })?;
        if !canonical.starts_with(root) {
            return Err(outside().into());
        }
        Ok(canonical)
    }
}

fn package_references(document: &Document, root: NodeId) -> Vec<PackageReference> {
    document
        .descendants_named(root, "PackageReference")
        .into_iter()
        .filter_map(|node| {
            // `Update` items amend references declared elsewhere
            let name = document.attribute(node, "Include")?;
            let version = document
                .attribute(node, "Version")
                .or_else(|| {
                    document
                        .children_named(node, "Version")
                        .next()
                        .and_then(|v| document.text(v))
                })
                .unwrap_or_default();
            Some(PackageReference::new(name.trim(), version.trim()))
        })
        .collect()
}

fn project_includes(document: &Document, root: NodeId) -> Vec<String> {
    document
        .descendants_named(root, "ProjectReference")
        .into_iter()
        .filter_map(|node| document.attribute(node, "Include"))
        .filter(|include| !include.trim().is_empty())
        .collect()
}

fn target_frameworks(document: &Document, root: NodeId) -> Vec<TargetFramework> {
    let mut frameworks: Vec<TargetFramework> = Vec::new();
    for property in ["TargetFramework", "TargetFrameworks"] {
        for node in document.descendants_named(root, property) {
            let Some(value) = document.text(node) else {
                continue;
            };
            for framework in TargetFramework::parse_list(&value) {
                if !frameworks
                    .iter()
                    .any(|f| f.moniker.eq_ignore_ascii_case(&framework.moniker))
                {
                    frameworks.push(framework);
                }
            }
        }
    }
    frameworks
}
