//! Process-lifetime memoizing cache with single-flight fetches
//!
//! The first caller for a key starts the fetch and stores it as a shared
//! future; concurrent and later callers await that same future. Outcomes,
//! failures included, are kept until the cache is dropped.

use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared, TryFutureExt};
use parking_lot::Mutex;
use refprune_core::VersionValue;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use url::Url;

/// Which registry operation a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Service index lookup
    ServiceIndex,
    /// Published version list of a package
    ListVersions,
    /// Direct dependencies of one package version
    ListDependencies,
    /// Transitive dependency closure of one package version
    DependencyClosure,
}

/// Package id (case-folded) and optional version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    /// Lowercase package id
    pub id: String,
    /// Version, for per-version operations
    pub version: Option<VersionValue>,
}

impl PackageIdentity {
    /// Identity for package-level operations
    pub fn package(id: &str) -> Self {
        Self {
            id: id.to_ascii_lowercase(),
            version: None,
        }
    }

    /// Identity for per-version operations
    pub fn versioned(id: &str, version: &VersionValue) -> Self {
        Self {
            id: id.to_ascii_lowercase(),
            version: Some(version.clone()),
        }
    }
}

/// Fingerprint of the credential a response was fetched with.
///
/// Hashing keeps the token itself out of keys and logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialScope(Option<String>);

impl CredentialScope {
    /// Scope for an optional bearer token
    pub fn new(token: Option<&str>) -> Self {
        Self(token.map(|t| hex::encode(&Sha256::digest(t.as_bytes())[..8])))
    }

    /// Scope for anonymous requests
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl fmt::Debug for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(fingerprint) => write!(f, "bearer:{fingerprint}"),
            None => f.write_str("anonymous"),
        }
    }
}

/// Composite key for every cached registry call
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Operation performed
    pub operation: Operation,
    /// Package the operation concerns (`None` for the service index)
    pub package: Option<PackageIdentity>,
    /// Service index the data came from
    pub endpoint: Url,
    /// Credential the data was fetched with
    pub credential: CredentialScope,
}

type SharedFetch<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

/// Async memoizing cache with single-flight semantics
pub struct AsyncCache<K, V> {
    entries: Mutex<HashMap<K, SharedFetch<V>>>,
}

impl<K, V> AsyncCache<K, V>
where
    K: Eq + Hash + fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, running `fetch` only if no caller
    /// has requested this key before.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let shared = {
            let mut entries = self.entries.lock();
            match entries.get(&key) {
                Some(existing) => {
                    tracing::trace!(?key, "registry cache hit");
                    existing.clone()
                }
                None => {
                    tracing::debug!(?key, "registry fetch");
                    let fetch = fetch().map_err(Arc::new).boxed().shared();
                    entries.insert(key, fetch.clone());
                    fetch
                }
            }
        };

        shared.await.map_err(Error::Cached)
    }

    /// Number of keys ever requested
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no key has been requested yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for AsyncCache<K, V>
where
    K: Eq + Hash + fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
