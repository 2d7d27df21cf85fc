//! # refprune-deps
//!
//! Project graph analysis for MSBuild solutions.
//!
//! This crate provides functionality to:
//! - Discover `*.csproj` / `*.fsproj` / `*.vbproj` manifests and link their
//!   project references into a [`Model`]
//! - Walk the graph depth-first ([`traversal`])
//! - Detect redundant package and project references, and packages with a
//!   newer acceptable version ([`detectors`])
//! - Apply the resulting [`Suggestion`]s by rewriting manifests canonically
//!   ([`manifest`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use refprune_config::Settings;
//! use refprune_deps::{Detector, GraphBuilder, PackageRedundancyDetector};
//! use refprune_registry::RegistryClient;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = GraphBuilder::native(".")?.build(Path::new(".")).await?;
//! let registry = RegistryClient::new(Arc::new(Settings::default()))?;
//! let detector = PackageRedundancyDetector::new(registry);
//!
//! let mut suggestions = detector.analyze(&model);
//! while let Some(suggestion) = suggestions.next().await {
//!     println!("{}", suggestion?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod detectors;
pub mod error;
pub mod manifest;
pub mod model;
pub mod suggestion;
pub mod traversal;
pub mod update;

pub use builder::GraphBuilder;
pub use detectors::{
    Detector, PackageRedundancyDetector, ProjectRedundancyDetector, UpgradeDetector,
};
pub use error::{Error, MutationError, ReferenceKind, Result, StructuralError};
pub use manifest::{Document, ManifestMutator};
pub use model::{Model, PackageReference, Project, ProjectId, ProjectReference};
pub use suggestion::{Suggestion, SuggestionKind};
pub use update::FileUpdater;
