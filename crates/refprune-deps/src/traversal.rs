//! Depth-first walks over project references

use crate::model::{Model, Project, ProjectId};
use std::collections::BTreeSet;

/// Pre-order depth-first iterator over the projects reachable from a start
/// project. A project reachable along several paths is yielded once per path.
///
/// The model is acyclic (the builder rejects cycles), so the walk terminates.
#[derive(Debug, Clone)]
pub struct Traversal<'m> {
    model: &'m Model,
    stack: Vec<ProjectId>,
}

/// Walk the references of `start`, yielding `start` itself first when
/// `include_self` is set
pub fn enumerate(model: &Model, start: ProjectId, include_self: bool) -> Traversal<'_> {
    let stack = if include_self {
        vec![start]
    } else {
        children_reversed(model, start)
    };
    Traversal { model, stack }
}

/// Distinct projects reachable from `start` in one or more hops.
///
/// Each project is expanded at most once, so this stays linear in the size
/// of the graph where [`enumerate`] would repeat shared sub-graphs.
pub fn reachable(model: &Model, start: ProjectId) -> BTreeSet<ProjectId> {
    reachable_counted(model, start).0
}

/// `reachable` plus the number of projects expanded
fn reachable_counted(model: &Model, start: ProjectId) -> (BTreeSet<ProjectId>, usize) {
    let mut seen = BTreeSet::from([start]);
    let mut stack = vec![start];
    let mut expanded = 0;
    while let Some(id) = stack.pop() {
        expanded += 1;
        for reference in &model.project(id).project_references {
            if seen.insert(reference.project) {
                stack.push(reference.project);
            }
        }
    }
    seen.remove(&start);
    (seen, expanded - 1)
}

fn children_reversed(model: &Model, id: ProjectId) -> Vec<ProjectId> {
    model
        .project(id)
        .project_references
        .iter()
        .rev()
        .map(|r| r.project)
        .collect()
}

impl<'m> Iterator for Traversal<'m> {
    type Item = &'m Project;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack.extend(children_reversed(self.model, id));
        Some(self.model.project(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Document;
    use crate::model::ProjectReference;
    use refprune_fs::NativeFileSystem;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn graph(edges: &[(String, Vec<usize>)]) -> Model {
        let fs = Arc::new(NativeFileSystem::new(std::env::temp_dir()).unwrap());
        let mut model = Model::new(PathBuf::from("/r"), fs);
        for (i, (name, references)) in edges.iter().enumerate() {
            model.projects.push(Project {
                id: ProjectId(i),
                path: PathBuf::from(format!("/r/{name}.csproj")),
                name: name.clone(),
                packages: Vec::new(),
                project_references: references
                    .iter()
                    .map(|r| ProjectReference {
                        include: format!("{}.csproj", edges[*r].0),
                        project: ProjectId(*r),
                    })
                    .collect(),
                target_frameworks: Vec::new(),
                document: Document::parse("<Project />").unwrap(),
            });
        }
        model
    }

    // A -> B -> D, A -> C -> D
    fn diamond() -> Model {
        graph(&[
            ("A".into(), vec![1, 2]),
            ("B".into(), vec![3]),
            ("C".into(), vec![3]),
            ("D".into(), vec![]),
        ])
    }

    // P_i references every P_j with j < i
    fn dense(n: usize) -> Model {
        let edges: Vec<(String, Vec<usize>)> =
            (0..n).map(|i| (format!("P{i}"), (0..i).collect())).collect();
        graph(&edges)
    }

    fn names<'m>(walk: impl Iterator<Item = &'m Project>) -> Vec<&'m str> {
        walk.map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_pre_order_with_duplicates() {
        let model = diamond();
        assert_eq!(names(enumerate(&model, ProjectId(0), true)), vec!["A", "B", "D", "C", "D"]);
        assert_eq!(names(enumerate(&model, ProjectId(0), false)), vec!["B", "D", "C", "D"]);
        assert!(enumerate(&model, ProjectId(3), false).next().is_none());
    }

    #[test]
    fn test_restartable_and_deterministic() {
        let model = diamond();
        let walk = enumerate(&model, ProjectId(0), false);
        let first = names(walk.clone());
        assert_eq!(first, names(walk));
        assert_eq!(first, names(enumerate(&model, ProjectId(0), false)));
    }

    #[test]
    fn test_reachable_is_distinct() {
        let model = diamond();
        let reached = reachable(&model, ProjectId(0));
        assert_eq!(reached.into_iter().collect::<Vec<_>>(), vec![ProjectId(1), ProjectId(2), ProjectId(3)]);
    }

    #[test]
    fn test_reachable_expands_each_project_once() {
        let model = dense(40);
        let top = ProjectId(39);

        let (reached, expanded) = reachable_counted(&model, top);
        assert_eq!(reached.len(), 39);
        assert_eq!(expanded, 39);
        assert_eq!(reachable(&model, top), reached);

        // Full enumeration repeats shared sub-graphs; compare on a small slice
        assert_eq!(enumerate(&dense(8), ProjectId(7), false).count(), 127);
    }
}
