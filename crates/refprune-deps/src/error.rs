//! Error types for refprune-deps

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using refprune-deps Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in refprune-deps
#[derive(Debug, Error)]
pub enum Error {
    /// The project graph could not be built
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// A manifest edit could not be applied
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// Package metadata could not be resolved
    #[error(transparent)]
    Registry(#[from] refprune_registry::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// XML syntax error
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Well-formed XML that is not a usable manifest
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),
}

/// Fatal problems with the project tree itself
#[derive(Debug, Error)]
pub enum StructuralError {
    /// Manifest discovery failed
    #[error("Cannot discover manifests under {}: {source}", root.display())]
    Discovery {
        /// Analysis root
        root: PathBuf,
        /// Underlying failure
        source: io::Error,
    },

    /// Manifest could not be read
    #[error("Cannot read manifest {}: {source}", path.display())]
    Unreadable {
        /// Manifest path
        path: PathBuf,
        /// Underlying failure
        source: io::Error,
    },

    /// Manifest could not be parsed
    #[error("Cannot parse manifest {}: {reason}", path.display())]
    Unparseable {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Project reference to a file that doesn't exist
    #[error("Project reference '{include}' in {} points to missing file {}", from.display(), target.display())]
    MissingProject {
        /// Referencing manifest
        from: PathBuf,
        /// Raw `Include` text
        include: String,
        /// Resolved target path
        target: PathBuf,
    },

    /// Project reference leaving the analysis root
    #[error("Project reference '{include}' in {} is outside the analysis root", from.display())]
    OutsideRoot {
        /// Referencing manifest
        from: PathBuf,
        /// Raw `Include` text
        include: String,
    },

    /// Projects referencing each other in a loop
    #[error("Project reference cycle: {}", DisplayCycle(cycle))]
    Cycle {
        /// Manifests on the cycle, first repeated at the end
        cycle: Vec<PathBuf>,
    },
}

struct DisplayCycle<'a>(&'a [PathBuf]);

impl fmt::Display for DisplayCycle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", path.display())?;
        }
        Ok(())
    }
}

/// Kind of reference item in a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `<PackageReference>`
    Package,
    /// `<ProjectReference>`
    Project,
}

impl ReferenceKind {
    /// Element name of this reference kind
    pub fn element_name(self) -> &'static str {
        match self {
            ReferenceKind::Package => "PackageReference",
            ReferenceKind::Project => "ProjectReference",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Package => f.write_str("package"),
            ReferenceKind::Project => f.write_str("project"),
        }
    }
}

/// A manifest edit that cannot be performed; the file is left untouched
#[derive(Debug, Error)]
pub enum MutationError {
    /// The edited reference is not declared
    #[error("{project}: no {kind} reference to '{reference}'")]
    MissingReference {
        /// Project display name
        project: String,
        /// Reference kind searched for
        kind: ReferenceKind,
        /// Reference name or path searched for
        reference: String,
    },

    /// The manifest has no root element to edit
    #[error("{project}: manifest has no root element")]
    NoRootElement {
        /// Project display name
        project: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_every_project() {
        let err = StructuralError::Cycle {
            cycle: vec![
                PathBuf::from("/r/A/A.csproj"),
                PathBuf::from("/r/B/B.csproj"),
                PathBuf::from("/r/A/A.csproj"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Project reference cycle: /r/A/A.csproj -> /r/B/B.csproj -> /r/A/A.csproj"
        );
    }

    #[test]
    fn test_mutation_message_names_project_and_reference() {
        let err = MutationError::MissingReference {
            project: "App".into(),
            kind: ReferenceKind::Package,
            reference: "Serilog".into(),
        };
        assert_eq!(err.to_string(), "App: no package reference to 'Serilog'");
    }
}
