//! Package references with a newer acceptable version

use super::{Detector, PROJECT_CONCURRENCY};
use crate::model::{Model, PackageReference, Project};
use crate::suggestion::{Suggestion, SuggestionKind};
use crate::Result;
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use refprune_registry::{HttpTransport, RegistryClient, RegistryTransport};

/// Proposes moving each package reference to the latest acceptable version
pub struct UpgradeDetector<T: RegistryTransport = HttpTransport> {
    registry: RegistryClient<T>,
}

impl<T: RegistryTransport> UpgradeDetector<T> {
    /// Create a detector resolving versions through `registry`
    pub fn new(registry: RegistryClient<T>) -> Self {
        Self { registry }
    }

    async fn check(
        &self,
        project: &Project,
        package: &PackageReference,
    ) -> Result<Option<SuggestionKind>> {
        let Some(current) = &package.version else {
            return Ok(None);
        };

        match self
            .registry
            .latest_version(&package.name, &project.target_frameworks)
            .await
        {
            Ok(latest) if latest > *current => Ok(Some(SuggestionKind::UpgradePackage {
                package: package.name.clone(),
                from: package.version_text.clone(),
                to: latest,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    project = %project.name,
                    package = %package.name,
                    error = %e,
                    "could not resolve latest version, skipping"
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
        let checks = join_all(project.packages.iter().map(|p| self.check(project, p))).await;

        let mut suggestions = Vec::new();
        for check in checks {
            if let Some(kind) = check? {
                suggestions.push(Suggestion::new(project, kind, model.filesystem().clone()));
            }
        }
        Ok(suggestions)
    }
}

impl<T: RegistryTransport> Detector for UpgradeDetector<T> {
    fn name(&self) -> &'static str {
        "upgrade"
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
