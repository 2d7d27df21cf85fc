//! Project references already reachable through a sibling reference

use super::Detector;
use crate::model::{Model, Project};
use crate::suggestion::{Suggestion, SuggestionKind};
use crate::traversal;
use crate::Result;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeSet;

/// Flags `A -> C` when `A -> B` and `C` is reachable from `B`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectRedundancyDetector;

impl ProjectRedundancyDetector {
    /// Create the detector
    pub fn new() -> Self {
        Self
    }

    /// Suggestions for one project
    pub fn analyze_project(&self, model: &Model, project: &Project) -> Vec<Suggestion> {
        let references = &project.project_references;
        let reachable: Vec<BTreeSet<_>> = references
            .iter()
            .map(|r| traversal::reachable(model, r.project))
            .collect();

        let mut suggestions = Vec::new();
        for (i, reference) in references.iter().enumerate() {
            let through = references
                .iter()
                .enumerate()
                .find(|(j, _)| *j != i && reachable[*j].contains(&reference.project));
            if let Some((_, sibling)) = through {
                suggestions.push(Suggestion::new(
                    project,
                    SuggestionKind::RemoveProjectReference {
                        include: reference.include.clone(),
                        reachable_through: model.project(sibling.project).name.clone(),
                    },
                    model.filesystem().clone(),
                ));
            }
        }
        suggestions
    }
}

impl Detector for ProjectRedundancyDetector {
    fn name(&self) -> &'static str {
        "project-redundancy"
    }

    fn analyze<'a>(&'a self, model: &'a Model) -> BoxStream<'a, Result<Suggestion>> {
        let suggestions: Vec<Result<Suggestion>> = model
            .projects()
            .flat_map(|project| self.analyze_project(model, project))
            .map(Ok)
            .collect();
        tracing::info!(
            detector = self.name(),
            suggestions = suggestions.len(),
            "analysis finished"
        );
        stream::iter(suggestions).boxed()
    }
}
