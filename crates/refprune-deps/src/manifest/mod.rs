//! MSBuild manifest documents: parsing, editing and canonical serialization

mod document;
mod mutator;
mod writer;

pub use document::{Document, Element, LineEnding, NodeId, NodeKind};
pub use mutator::ManifestMutator;
pub use writer::{CANONICAL_PROPERTY_ORDER, SELF_CLOSING_ELEMENTS};

/// File extensions of the manifests refprune analyzes
pub const MANIFEST_EXTENSIONS: &[&str] = &[".csproj", ".fsproj", ".vbproj"];
