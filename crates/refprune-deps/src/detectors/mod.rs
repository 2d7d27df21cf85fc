//! Detectors: analyses over a [`Model`] that propose [`Suggestion`]s
//!
//! Detectors stream their findings so callers can print or apply them as
//! they arrive. Per-package registry failures are logged and skipped; an
//! `Err` item means the analysis cannot continue meaningfully (for example
//! the registry's service index is unusable).

mod package_redundancy;
mod project_redundancy;
mod upgrade;

pub use package_redundancy::PackageRedundancyDetector;
pub use project_redundancy::ProjectRedundancyDetector;
pub use upgrade::UpgradeDetector;

use crate::model::Model;
use crate::suggestion::Suggestion;
use crate::Result;
use futures::stream::BoxStream;

/// Projects analyzed concurrently by the registry-backed detectors
pub(crate) const PROJECT_CONCURRENCY: usize = 4;

/// An analysis producing suggestions for a model
pub trait Detector: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Analyze `model`. Dropping the stream cancels the analysis.
    fn analyze<'a>(&'a self, model: &'a Model) -> BoxStream<'a, Result<Suggestion>>;
}
