//! In-memory registry transport for tests

use crate::cache::Operation;
use crate::error::{Error, Result};
use crate::transport::RegistryTransport;
use crate::types::{PackageDependency, ServiceIndex};
use refprune_core::VersionValue;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Flat-container address advertised by [`InMemoryTransport::new`]
pub const MEMORY_PACKAGE_BASE: &str = "https://registry.invalid/flat/";
/// Registration address advertised by [`InMemoryTransport::new`]
pub const MEMORY_REGISTRATIONS: &str = "https://registry.invalid/registration/";

#[derive(Debug, Default)]
struct CallCounters {
    service_index: AtomicUsize,
    versions: AtomicUsize,
    dependencies: AtomicUsize,
}

/// Test double serving a fixed set of published packages.
///
/// Meant for exercising [`RegistryClient`](crate::RegistryClient) consumers
/// without network access. Every call yields to the scheduler once before
/// answering so concurrent lookups actually overlap, and every call is
/// counted.
#[derive(Debug)]
pub struct InMemoryTransport {
    index: ServiceIndex,
    /// Lowercase id -> published (version text, dependencies)
    packages: HashMap<String, Vec<(String, Vec<PackageDependency>)>>,
    failing: HashSet<String>,
    calls: CallCounters,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// Create a registry advertising both required services and no packages
    pub fn new() -> Self {
        Self::with_service_index(ServiceIndex::from_pairs([
            ("PackageBaseAddress/3.0.0", MEMORY_PACKAGE_BASE),
            ("RegistrationsBaseUrl/3.6.0", MEMORY_REGISTRATIONS),
        ]))
    }

    /// Create a registry with a custom service index
    pub fn with_service_index(index: ServiceIndex) -> Self {
        Self {
            index,
            packages: HashMap::new(),
            failing: HashSet::new(),
            calls: CallCounters::default(),
        }
    }

    /// Publish `id` at `version` with `(id, range)` dependencies
    pub fn publish(mut self, id: &str, version: &str, dependencies: &[(&str, &str)]) -> Self {
        let dependencies = dependencies
            .iter()
            .map(|(dep, range)| PackageDependency::new(*dep, *range))
            .collect();
        self.packages
            .entry(id.to_ascii_lowercase())
            .or_default()
            .push((version.to_string(), dependencies));
        self
    }

    /// Make every lookup of `id` fail with a server error
    pub fn fail(mut self, id: &str) -> Self {
        self.failing.insert(id.to_ascii_lowercase());
        self
    }

    /// Number of uncached calls made for `operation`
    pub fn calls(&self, operation: Operation) -> usize {
        let counter = match operation {
            Operation::ServiceIndex => &self.calls.service_index,
            Operation::ListVersions => &self.calls.versions,
            Operation::ListDependencies => &self.calls.dependencies,
            // Closures are derived from dependency lists, never fetched
            Operation::DependencyClosure => return 0,
        };
        counter.load(Ordering::SeqCst)
    }

    fn check_failing(&self, id: &str, url: &Url) -> Result<()> {
        if self.failing.contains(&id.to_ascii_lowercase()) {
            return Err(Error::Status {
                status: 500,
                url: url.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RegistryTransport for InMemoryTransport {
    async fn service_index(&self, _source: &Url) -> Result<ServiceIndex> {
        self.calls.service_index.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.index.clone())
    }

    async fn versions(&self, package_base: &Url, id: &str) -> Result<Vec<String>> {
        self.calls.versions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_failing(id, package_base)?;

        self.packages
            .get(&id.to_ascii_lowercase())
            .map(|published| published.iter().map(|(v, _)| v.clone()).collect())
            .ok_or_else(|| Error::PackageNotFound(id.to_string(), package_base.to_string()))
    }

    async fn dependencies(
        &self,
        registrations: &Url,
        id: &str,
        version: &VersionValue,
    ) -> Result<Vec<PackageDependency>> {
        self.calls.dependencies.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_failing(id, registrations)?;

        self.packages
            .get(&id.to_ascii_lowercase())
            .and_then(|published| {
                published
                    .iter()
                    .find(|(v, _)| VersionValue::parse(v).is_ok_and(|v| &v == version))
            })
            .map(|(_, deps)| deps.clone())
            .ok_or_else(|| {
                Error::PackageNotFound(format!("{id} {version}"), registrations.to_string())
            })
    }
}
