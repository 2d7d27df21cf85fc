use refprune_core::{RuntimeTrain, DEFAULT_RUNTIME_TRAINS};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Public NuGet v3 service index
pub const DEFAULT_SOURCE: &str = "https://api.nuget.org/v3/index.json";

/// How many of the newest versions must sit on runtime trains before a
/// package is treated as runtime-locked
pub const DEFAULT_LOCK_WINDOW: usize = 5;

/// Settings for one run. Built once, then shared read-only as `Arc<Settings>`
/// by the registry client and the detectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Package source service index
    #[serde(default = "default_source")]
    pub source: Url,

    /// Bearer credential attached to every registry request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,

    /// Consider pre-release versions when picking upgrades
    #[serde(default)]
    pub include_prerelease: bool,

    /// Allow upgrades that jump to a different platform-runtime train
    #[serde(default)]
    pub allow_cross_runtime: bool,

    /// Number of newest versions inspected for runtime locking
    #[serde(default = "default_lock_window")]
    pub lock_window: usize,

    /// Known platform-runtime release trains (`"8.0"`, ...)
    #[serde(default = "default_runtime_trains")]
    pub runtime_trains: Vec<RuntimeTrain>,

    /// Client-side request budget against the registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<u32>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra glob patterns skipped during manifest discovery
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: default_source(),
            credential: None,
            include_prerelease: false,
            allow_cross_runtime: false,
            lock_window: DEFAULT_LOCK_WINDOW,
            runtime_trains: default_runtime_trains(),
            requests_per_second: None,
            timeout_secs: default_timeout_secs(),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Bearer token. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

fn default_source() -> Url {
    Url::parse(DEFAULT_SOURCE).expect("default source is a valid URL")
}

fn default_lock_window() -> usize {
    DEFAULT_LOCK_WINDOW
}

fn default_runtime_trains() -> Vec<RuntimeTrain> {
    DEFAULT_RUNTIME_TRAINS.to_vec()
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.source.as_str(), DEFAULT_SOURCE);
        assert_eq!(settings.lock_window, 5);
        assert!(settings.runtime_trains.contains(&RuntimeTrain::new(8, 0)));
    }

    #[test]
    fn test_overrides() {
        let settings: Settings = toml::from_str(
            r#"
source = "https://pkgs.example.com/v3/index.json"
credential = "s3cret"
allow_cross_runtime = true
lock_window = 3
runtime_trains = ["6.0", "8.0"]
"#,
        )
        .unwrap();

        assert_eq!(settings.source.host_str(), Some("pkgs.example.com"));
        assert_eq!(settings.credential.as_ref().unwrap().expose(), "s3cret");
        assert!(settings.allow_cross_runtime);
        assert_eq!(settings.lock_window, 3);
        assert_eq!(
            settings.runtime_trains,
            vec![RuntimeTrain::new(6, 0), RuntimeTrain::new(8, 0)]
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("s3cret");
        assert!(!format!("{credential:?}").contains("s3cret"));
    }
}
