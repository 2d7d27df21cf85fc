//! Registry transports: where raw metadata documents come from
//!
//! [`RegistryClient`](crate::RegistryClient) owns caching and policy; a
//! transport only performs one uncached fetch per call.

use crate::client::HttpClient;
use crate::error::{Error, Result};
use crate::types::{PackageDependency, ServiceIndex};
use refprune_config::Settings;
use refprune_core::VersionValue;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Source of uncached registry documents
#[async_trait::async_trait]
pub trait RegistryTransport: Send + Sync + 'static {
    /// Fetch the service index of a source
    async fn service_index(&self, source: &Url) -> Result<ServiceIndex>;

    /// Every published version of `id`, as listed by the flat container
    async fn versions(&self, package_base: &Url, id: &str) -> Result<Vec<String>>;

    /// Direct dependencies of `id` at `version`, across all dependency groups
    async fn dependencies(
        &self,
        registrations: &Url,
        id: &str,
        version: &VersionValue,
    ) -> Result<Vec<PackageDependency>>;
}

/// NuGet v3 flat-container version list
#[derive(Debug, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Registration leaf for one package version
#[derive(Debug, Deserialize)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: CatalogRef,
}

/// nuget.org links the catalog entry; other feeds inline it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogRef {
    Link(String),
    Inline(CatalogEntry),
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "dependencyGroups", default)]
    dependency_groups: Vec<DependencyGroup>,
}

#[derive(Debug, Deserialize)]
struct DependencyGroup {
    #[serde(default)]
    dependencies: Vec<CatalogDependency>,
}

#[derive(Debug, Deserialize)]
struct CatalogDependency {
    id: String,
    #[serde(default)]
    range: Option<String>,
}

/// Transport speaking the NuGet v3 HTTP protocol
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    /// Create a transport from run settings (timeout, rate limit, credential)
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(
                Duration::from_secs(settings.timeout_secs),
                settings.requests_per_second,
                settings.credential.as_ref().map(|c| c.expose()),
            )?,
        })
    }
}

#[async_trait::async_trait]
impl RegistryTransport for HttpTransport {
    async fn service_index(&self, source: &Url) -> Result<ServiceIndex> {
        self.http
            .get_json(source.as_str())
            .await?
            .ok_or_else(|| Error::Status {
                status: 404,
                url: source.to_string(),
            })
    }

    async fn versions(&self, package_base: &Url, id: &str) -> Result<Vec<String>> {
        let url = package_base.join(&format!("{}/index.json", id.to_ascii_lowercase()))?;
        let index: Option<VersionIndex> = self.http.get_json(url.as_str()).await?;
        index
            .map(|i| i.versions)
            .ok_or_else(|| Error::PackageNotFound(id.to_string(), package_base.to_string()))
    }

    async fn dependencies(
        &self,
        registrations: &Url,
        id: &str,
        version: &VersionValue,
    ) -> Result<Vec<PackageDependency>> {
        let not_found = || Error::PackageNotFound(format!("{id} {version}"), registrations.to_string());

        let url = registrations.join(&format!(
            "{}/{}.json",
            id.to_ascii_lowercase(),
            version.normalized()
        ))?;
        let leaf: RegistrationLeaf = self.http.get_json(url.as_str()).await?.ok_or_else(not_found)?;

        let entry = match leaf.catalog_entry {
            CatalogRef::Inline(entry) => entry,
            CatalogRef::Link(link) => self.http.get_json(&link).await?.ok_or_else(not_found)?,
        };

        let mut dependencies: Vec<PackageDependency> = Vec::new();
        for dependency in entry.dependency_groups.into_iter().flat_map(|g| g.dependencies) {
            if !dependencies
                .iter()
                .any(|d| d.id.eq_ignore_ascii_case(&dependency.id))
            {
                dependencies.push(PackageDependency::new(
                    dependency.id,
                    dependency.range.unwrap_or_default(),
                ));
            }
        }
        Ok(dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linked_catalog_entry() {
        let leaf: RegistrationLeaf = serde_json::from_str(
            r#"{
                "@id": "https://api.nuget.org/v3/registration5-semver1/serilog/3.1.1.json",
                "catalogEntry": "https://api.nuget.org/v3/catalog0/data/serilog.3.1.1.json",
                "listed": true
            }"#,
        )
        .unwrap();
        assert!(matches!(leaf.catalog_entry, CatalogRef::Link(_)));
    }

    #[test]
    fn test_parse_inline_catalog_entry() {
        let leaf: RegistrationLeaf = serde_json::from_str(
            r#"{
                "catalogEntry": {
                    "@id": "https://feed/catalog/x.json",
                    "id": "Serilog.Sinks.Console",
                    "dependencyGroups": [
                        {
                            "targetFramework": "net6.0",
                            "dependencies": [{ "@id": "x", "id": "Serilog", "range": "[3.1.1, )" }]
                        },
                        { "targetFramework": ".NETStandard2.0" }
                    ]
                }
            }"#,
        )
        .unwrap();

        let CatalogRef::Inline(entry) = leaf.catalog_entry else {
            panic!("expected inline catalog entry");
        };
        assert_eq!(entry.dependency_groups.len(), 2);
        assert_eq!(entry.dependency_groups[0].dependencies[0].id, "Serilog");
        assert!(entry.dependency_groups[1].dependencies.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_nuget_org() {
        let transport = HttpTransport::new(&Settings::default()).unwrap();
        let index = transport
            .service_index(&Settings::default().source)
            .await
            .unwrap();
        let base = Url::parse(index.find(&["PackageBaseAddress/3.0.0"]).unwrap()).unwrap();
        let versions = transport.versions(&base, "Newtonsoft.Json").await.unwrap();
        assert!(versions.iter().any(|v| v == "13.0.1"));
    }
}
