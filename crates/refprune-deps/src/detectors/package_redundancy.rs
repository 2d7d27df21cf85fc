//! Package references already satisfied transitively
//!
//! A direct package reference is redundant when the same package arrives
//! through a referenced project (declared there, or pulled in by one of its
//! packages) or through the dependency closure of another direct package.

use super::{Detector, PROJECT_CONCURRENCY};
use crate::model::{Model, PackageReference, Project};
use crate::suggestion::{Suggestion, SuggestionKind};
use crate::traversal;
use crate::Result;
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use refprune_registry::{HttpTransport, RegistryClient, RegistryTransport};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Finds package references that other references already bring in
pub struct PackageRedundancyDetector<T: RegistryTransport = HttpTransport> {
    registry: RegistryClient<T>,
}

type Closure = Option<Arc<BTreeSet<String>>>;

impl<T: RegistryTransport> PackageRedundancyDetector<T> {
    /// Create a detector resolving closures through `registry`
    pub fn new(registry: RegistryClient<T>) -> Self {
        Self { registry }
    }

    /// Closure of one reference; `None` when it can't be resolved
    async fn closure(&self, project: &Project, package: &PackageReference) -> Result<Closure> {
        let Some(version) = &package.version else {
            tracing::debug!(
                project = %project.name,
                package = %package.name,
                version = %package.version_text,
                "no concrete version, closure skipped"
            );
            return Ok(None);
        };

        match self.registry.dependency_closure(&package.name, version).await {
            Ok(closure) => Ok(Some(closure)),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    project = %project.name,
                    package = %package.name,
                    version = %version,
                    error = %e,
                    "could not resolve dependency closure, excluding it"
                );
                Ok(None)
            }
        }
    }

    /// Suggestions for one project
    ///
    /// # Errors
    ///
    /// Only fatal registry errors are returned.
    pub async fn analyze_project(&self, model: &Model, project: &Project) -> Result<Vec<Suggestion>> {
        // package id -> what provides it, from projects below this one
        let mut provided: HashMap<String, String> = HashMap::new();
        let mut inherited: Vec<(&Project, &PackageReference)> = Vec::new();
        for id in traversal::reachable(model, project.id) {
            let below = model.project(id);
            for package in &below.packages {
                provided
                    .entry(package.name.to_ascii_lowercase())
                    .or_insert_with(|| format!("project {}", below.name));
                inherited.push((below, package));
            }
        }

        let inherited_closures =
            join_all(inherited.iter().map(|(below, package)| self.closure(below, package))).await;
        for ((below, _), closure) in inherited.iter().zip(inherited_closures) {
            for name in closure?.iter().flat_map(|c| c.iter()) {
                provided
                    .entry(name.clone())
                    .or_insert_with(|| format!("project {}", below.name));
            }
        }

        let direct_closures: Vec<Closure> =
            join_all(project.packages.iter().map(|package| self.closure(project, package)))
                .await
                .into_iter()
                .collect::<Result<_>>()?;

        let mut suggestions = Vec::new();
        for (i, package) in project.packages.iter().enumerate() {
            let name = package.name.to_ascii_lowercase();
            let provided_by = provided.get(&name).cloned().or_else(|| {
                project
                    .packages
                    .iter()
                    .zip(&direct_closures)
                    .enumerate()
                    .find(|(j, (_, closure))| {
                        *j != i && closure.iter().any(|c| c.contains(&name))
                    })
                    .map(|(_, (other, _))| format!("package {}", other.name))
            });

            if let Some(provided_by) = provided_by {
                suggestions.push(Suggestion::new(
                    project,
                    SuggestionKind::RemovePackage {
                        package: package.name.clone(),
                        provided_by,
                    },
                    model.filesystem().clone(),
                ));
            }
        }
        Ok(suggestions)
    }
}

impl<T: RegistryTransport> Detector for PackageRedundancyDetector<T> {
    fn name(&self) -> &'static str {
        "package-redundancy"
    }

    fn analyze<'a>(&'a self, model: &'a Model) -> BoxStream<'a, Result<Suggestion>> {
        tracing::info!(detector = self.name(), projects = model.len(), "analysis started");
        stream::iter(model.projects())
            .map(move |project| self.analyze_project(model, project))
            .buffered(PROJECT_CONCURRENCY)
            .flat_map(|outcome| {
                let items: Vec<Result<Suggestion>> = match outcome {
                    Ok(suggestions) => suggestions.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            })
            .boxed()
    }
}
