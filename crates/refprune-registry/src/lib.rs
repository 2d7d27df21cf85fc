//! Cached NuGet v3 metadata resolution
//!
//! [`RegistryClient`] answers three questions about published packages (which
//! versions exist, what a version depends on, and what it pulls in
//! transitively) plus the "latest acceptable version" policy built on top.
//! Every answer is memoized for the lifetime of the client, and concurrent
//! identical requests share a single fetch.
//!
//! # Example
//!
//! ```no_run
//! use refprune_config::Settings;
//! use refprune_registry::RegistryClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::new(Arc::new(Settings::default()))?;
//! let versions = client.list_versions("Newtonsoft.Json", false).await?;
//! println!("latest stable: {}", versions[0]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod cache;
mod client;
mod error;
mod memory;
mod policy;
mod transport;
mod types;

pub use cache::{AsyncCache, CacheKey, CredentialScope, Operation, PackageIdentity};
pub use error::{Error, Result};
pub use memory::{InMemoryTransport, MEMORY_PACKAGE_BASE, MEMORY_REGISTRATIONS};
pub use policy::UpgradePolicy;
pub use transport::{HttpTransport, RegistryTransport};
pub use types::{lower_bound, PackageDependency, ServiceEndpoints, ServiceIndex, ServiceResource};

use refprune_config::Settings;
use refprune_core::{TargetFramework, VersionValue};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// Resource type serving version lists
pub const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

/// Registration resource types, most preferred first
pub const REGISTRATIONS_BASE_URL: &[&str] = &[
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl",
];

struct Inner<T> {
    transport: Arc<T>,
    settings: Arc<Settings>,
    policy: UpgradePolicy,
    credential: CredentialScope,
    endpoints: AsyncCache<CacheKey, Arc<ServiceEndpoints>>,
    versions: AsyncCache<CacheKey, Arc<Vec<VersionValue>>>,
    dependencies: AsyncCache<CacheKey, Arc<Vec<PackageDependency>>>,
    closures: AsyncCache<CacheKey, Arc<BTreeSet<String>>>,
}

/// Cached client for package metadata.
///
/// Cloning is cheap; clones share caches.
pub struct RegistryClient<T: RegistryTransport = HttpTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: RegistryTransport> Clone for RegistryClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl RegistryClient<HttpTransport> {
    /// Create a client speaking HTTP to the configured source
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(settings: Arc<Settings>) -> Result<Self> {
        let transport = HttpTransport::new(&settings)?;
        Ok(Self::with_transport(transport, settings))
    }
}

impl<T: RegistryTransport> RegistryClient<T> {
    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: T, settings: Arc<Settings>) -> Self {
        let credential = CredentialScope::new(settings.credential.as_ref().map(|c| c.expose()));
        Self {
            inner: Arc::new(Inner {
                transport: Arc::new(transport),
                policy: UpgradePolicy::from(settings.as_ref()),
                settings,
                credential,
                endpoints: AsyncCache::new(),
                versions: AsyncCache::new(),
                dependencies: AsyncCache::new(),
                closures: AsyncCache::new(),
            }),
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Settings the client was created with
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    fn key(&self, operation: Operation, package: Option<PackageIdentity>) -> CacheKey {
        CacheKey {
            operation,
            package,
            endpoint: self.inner.settings.source.clone(),
            credential: self.inner.credential.clone(),
        }
    }

    /// Sub-service addresses of the configured source.
    ///
    /// # Errors
    ///
    /// Fails with a fatal error when the service index cannot be loaded or
    /// lacks a required resource.
    pub async fn endpoints(&self) -> Result<Arc<ServiceEndpoints>> {
        let key = self.key(Operation::ServiceIndex, None);
        let transport = self.inner.transport.clone();
        let source = self.inner.settings.source.clone();

        self.inner
            .endpoints
            .get_or_fetch(key, move || async move {
                let index =
                    transport
                        .service_index(&source)
                        .await
                        .map_err(|e| Error::ServiceIndex {
                            source_url: source.to_string(),
                            source: Box::new(e),
                        })?;
                resolve_endpoints(&source, &index).map(Arc::new)
            })
            .await
    }

    /// Published versions of `id`, newest first.
    ///
    /// Versions the registry lists but that don't parse are skipped.
    pub async fn list_versions(
        &self,
        id: &str,
        include_prerelease: bool,
    ) -> Result<Arc<Vec<VersionValue>>> {
        let endpoints = self.endpoints().await?;
        let key = self.key(Operation::ListVersions, Some(PackageIdentity::package(id)));
        let transport = self.inner.transport.clone();
        let package = id.to_string();

        let all = self
            .inner
            .versions
            .get_or_fetch(key, move || async move {
                let raw = transport.versions(&endpoints.package_base, &package).await?;
                let mut versions: Vec<VersionValue> = raw
                    .iter()
                    .filter_map(|v| match VersionValue::parse(v) {
                        Ok(version) => Some(version),
                        Err(e) => {
                            tracing::debug!(package = %package, error = %e, "skipping version");
                            None
                        }
                    })
                    .collect();
                versions.sort_by(|a, b| b.cmp(a));
                versions.dedup();
                Ok(Arc::new(versions))
            })
            .await?;

        if include_prerelease {
            return Ok(all);
        }
        Ok(Arc::new(
            all.iter().filter(|v| !v.is_prerelease()).cloned().collect(),
        ))
    }

    /// Direct dependencies of `id` at `version`, unioned across dependency groups
    pub async fn list_dependencies(
        &self,
        id: &str,
        version: &VersionValue,
    ) -> Result<Arc<Vec<PackageDependency>>> {
        let endpoints = self.endpoints().await?;
        let key = self.key(
            Operation::ListDependencies,
            Some(PackageIdentity::versioned(id, version)),
        );
        let transport = self.inner.transport.clone();
        let package = id.to_string();
        let version = version.clone();

        self.inner
            .dependencies
            .get_or_fetch(key, move || async move {
                transport
                    .dependencies(&endpoints.registrations, &package, &version)
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Lowercase ids of every package `id` at `version` pulls in transitively.
    ///
    /// Each dependency is followed at the lower bound of its range. Failures
    /// below the root truncate that branch with a warning; a failure on the
    /// root itself is returned.
    pub async fn dependency_closure(
        &self,
        id: &str,
        version: &VersionValue,
    ) -> Result<Arc<BTreeSet<String>>> {
        let key = self.key(
            Operation::DependencyClosure,
            Some(PackageIdentity::versioned(id, version)),
        );
        let client = self.clone();
        let package = id.to_string();
        let version = version.clone();

        self.inner
            .closures
            .get_or_fetch(key, move || async move {
                client.walk_closure(package, version).await.map(Arc::new)
            })
            .await
    }

    // Breadth-first over cached direct-dependency lists. Not recursive through
    // the closure cache, so dependency cycles can't wait on themselves.
    async fn walk_closure(&self, id: String, version: VersionValue) -> Result<BTreeSet<String>> {
        let root = self.list_dependencies(&id, &version).await?;

        let mut closure = BTreeSet::new();
        let mut visited: HashSet<(String, Option<VersionValue>)> = HashSet::new();
        visited.insert((id.to_ascii_lowercase(), Some(version)));
        let mut queue: VecDeque<PackageDependency> = root.iter().cloned().collect();

        while let Some(dependency) = queue.pop_front() {
            let name = dependency.id.to_ascii_lowercase();
            closure.insert(name.clone());
            if !visited.insert((name, dependency.min_version.clone())) {
                continue;
            }
            let Some(min_version) = &dependency.min_version else {
                continue;
            };

            match self.list_dependencies(&dependency.id, min_version).await {
                Ok(next) => queue.extend(next.iter().cloned()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        package = %dependency.id,
                        version = %min_version,
                        error = %e,
                        "could not resolve transitive dependencies"
                    );
                }
            }
        }

        closure.remove(&id.to_ascii_lowercase());
        Ok(closure)
    }

    /// Newest version of `id` acceptable for a project targeting `frameworks`
    ///
    /// # Errors
    ///
    /// [`Error::NoVersions`] when nothing acceptable is published.
    pub async fn latest_version(
        &self,
        id: &str,
        frameworks: &[TargetFramework],
    ) -> Result<VersionValue> {
        let versions = self
            .list_versions(id, self.inner.settings.include_prerelease)
            .await?;
        self.inner
            .policy
            .select(&versions, frameworks)
            .cloned()
            .ok_or_else(|| Error::NoVersions(id.to_string()))
    }
}

fn resolve_endpoints(source: &Url, index: &ServiceIndex) -> Result<ServiceEndpoints> {
    let address = |kinds: &[&str], service: &'static str| -> Result<Url> {
        let raw = index.find(kinds).ok_or_else(|| Error::MissingService {
            source_url: source.to_string(),
            service,
        })?;
        // Url::join replaces the last segment unless the base ends in '/'
        let raw = if raw.ends_with('/') {
            raw.to_string()
        } else {
            format!("{raw}/")
        };
        Url::parse(&raw).map_err(|e| Error::ServiceIndex {
            source_url: source.to_string(),
            source: Box::new(e.into()),
        })
    };

    Ok(ServiceEndpoints {
        package_base: address(&[PACKAGE_BASE_ADDRESS], PACKAGE_BASE_ADDRESS)?,
        registrations: address(REGISTRATIONS_BASE_URL, "RegistrationsBaseUrl")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Url {
        Url::parse("https://feed.test/v3/index.json").unwrap()
    }

    #[test]
    fn test_resolve_endpoints_adds_trailing_slash() {
        let index = ServiceIndex::from_pairs([
            ("PackageBaseAddress/3.0.0", "https://feed.test/flat"),
            ("RegistrationsBaseUrl", "https://feed.test/reg/"),
            ("RegistrationsBaseUrl/3.6.0", "https://feed.test/reg-gz/"),
        ]);
        let endpoints = resolve_endpoints(&source(), &index).unwrap();
        assert_eq!(endpoints.package_base.as_str(), "https://feed.test/flat/");
        assert_eq!(endpoints.registrations.as_str(), "https://feed.test/reg-gz/");
    }

    #[test]
    fn test_resolve_endpoints_missing_registration_is_fatal() {
        let index = ServiceIndex::from_pairs([("PackageBaseAddress/3.0.0", "https://feed.test/flat/")]);
        let err = resolve_endpoints(&source(), &index).unwrap_err();
        assert!(matches!(err, Error::MissingService { .. }));
        assert!(err.is_fatal());
    }
}
