//! Core domain types for registry metadata

use refprune_core::VersionValue;
use serde::Deserialize;
use url::Url;

/// Service index document (`index.json`) of a NuGet v3 source
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceIndex {
    /// Advertised resources
    #[serde(default)]
    pub resources: Vec<ServiceResource>,
}

/// One capability-tagged address in a service index
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceResource {
    /// Base address
    #[serde(rename = "@id")]
    pub id: String,
    /// Capability tag, e.g. `PackageBaseAddress/3.0.0`
    #[serde(rename = "@type")]
    pub kind: String,
}

impl ServiceIndex {
    /// Build an index from `(type, address)` pairs
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            resources: pairs
                .into_iter()
                .map(|(kind, id)| ServiceResource {
                    id: id.to_string(),
                    kind: kind.to_string(),
                })
                .collect(),
        }
    }

    /// First address whose type is one of `kinds`, honouring the order of `kinds`
    pub fn find(&self, kinds: &[&str]) -> Option<&str> {
        kinds.iter().find_map(|kind| {
            self.resources
                .iter()
                .find(|r| r.kind.eq_ignore_ascii_case(kind))
                .map(|r| r.id.as_str())
        })
    }
}

/// Sub-service addresses extracted from a service index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    /// Flat container (`PackageBaseAddress/3.0.0`), serves version lists
    pub package_base: Url,
    /// Registration hive, serves per-version dependency lists
    pub registrations: Url,
}

/// A direct dependency of one published package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDependency {
    /// Dependency package id
    pub id: String,
    /// Version range as published (`[1.0.0, )`)
    pub range: String,
    /// Lowest version admitted by the range, when it has one
    pub min_version: Option<VersionValue>,
}

impl PackageDependency {
    /// Create a dependency from its published range
    pub fn new(id: impl Into<String>, range: impl Into<String>) -> Self {
        let range = range.into();
        let min_version = lower_bound(&range);
        Self {
            id: id.into(),
            range,
            min_version,
        }
    }
}

/// Lowest version named by a NuGet version range.
///
/// `1.0`, `[1.0, )`, `(1.0, 2.0]` and `[1.0]` all yield `1.0`; `(, 2.0]` and
/// empty ranges yield `None`.
pub fn lower_bound(range: &str) -> Option<VersionValue> {
    let range = range.trim();
    let inner = range
        .trim_start_matches(&['[', '('][..])
        .trim_end_matches(&[']', ')'][..]);
    let lower = inner.split(',').next()?.trim();
    if lower.is_empty() {
        return None;
    }
    VersionValue::parse(lower).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_bound() {
        let v = |s: &str| VersionValue::parse(s).unwrap();
        assert_eq!(lower_bound("1.0"), Some(v("1.0")));
        assert_eq!(lower_bound("[4.3.0, )"), Some(v("4.3.0")));
        assert_eq!(lower_bound("(1.0, 2.0]"), Some(v("1.0")));
        assert_eq!(lower_bound("[2.1.0]"), Some(v("2.1.0")));
        assert_eq!(lower_bound("(, 2.0]"), None);
        assert_eq!(lower_bound(""), None);
    }

    #[test]
    fn test_find_honours_preference_order() {
        let index = ServiceIndex::from_pairs([
            ("RegistrationsBaseUrl", "https://x/reg/"),
            ("RegistrationsBaseUrl/3.6.0", "https://x/reg-gz-semver2/"),
        ]);
        assert_eq!(
            index.find(&["RegistrationsBaseUrl/3.6.0", "RegistrationsBaseUrl"]),
            Some("https://x/reg-gz-semver2/")
        );
        assert_eq!(index.find(&["PackageBaseAddress/3.0.0"]), None);
    }
}
