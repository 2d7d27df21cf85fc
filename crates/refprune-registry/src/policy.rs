//! "Latest acceptable version" selection
//!
//! Some packages publish in lock-step with the platform runtime (one minor
//! line per runtime release). Bumping such a package to the newest train can
//! silently move a project onto a runtime it doesn't target, so unless
//! cross-runtime upgrades are allowed the newest version on one of the
//! project's own trains wins.

use refprune_config::Settings;
use refprune_core::{RuntimeTrain, TargetFramework, VersionValue};

/// Inputs of the selection policy, taken from [`Settings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePolicy {
    /// Skip runtime locking entirely
    pub allow_cross_runtime: bool,
    /// Number of newest versions that must all sit on runtime trains
    pub lock_window: usize,
    /// Known runtime release trains
    pub runtime_trains: Vec<RuntimeTrain>,
}

impl From<&Settings> for UpgradePolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            allow_cross_runtime: settings.allow_cross_runtime,
            lock_window: settings.lock_window,
            runtime_trains: settings.runtime_trains.clone(),
        }
    }
}

impl UpgradePolicy {
    /// Whether the newest `lock_window` versions all belong to runtime trains
    pub fn is_runtime_locked(&self, descending: &[VersionValue]) -> bool {
        !descending.is_empty()
            && descending
                .iter()
                .take(self.lock_window)
                .all(|v| self.runtime_trains.iter().any(|t| t.contains(v)))
    }

    /// Pick the version to upgrade to from a descending version list
    pub fn select<'a>(
        &self,
        descending: &'a [VersionValue],
        frameworks: &[TargetFramework],
    ) -> Option<&'a VersionValue> {
        let latest = descending.first()?;
        if self.allow_cross_runtime || !self.is_runtime_locked(descending) {
            return Some(latest);
        }

        let targeted: Vec<RuntimeTrain> = frameworks.iter().filter_map(|f| f.runtime).collect();
        let on_target = descending
            .iter()
            .find(|v| targeted.iter().any(|t| t.contains(v)));
        if on_target.is_none() {
            tracing::debug!(
                latest = %latest,
                "runtime-locked package has no version on a targeted train"
            );
        }
        Some(on_target.unwrap_or(latest))
    }
}
