//! Target framework monikers and platform-runtime release trains

use crate::{Error, Result, VersionValue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Platform-runtime release trains that packages commonly ship in lock-step with.
///
/// Overridable through `Settings::runtime_trains`.
pub const DEFAULT_RUNTIME_TRAINS: &[RuntimeTrain] = &[
    RuntimeTrain::new(1, 0),
    RuntimeTrain::new(1, 1),
    RuntimeTrain::new(2, 0),
    RuntimeTrain::new(2, 1),
    RuntimeTrain::new(2, 2),
    RuntimeTrain::new(3, 0),
    RuntimeTrain::new(3, 1),
    RuntimeTrain::new(5, 0),
    RuntimeTrain::new(6, 0),
    RuntimeTrain::new(7, 0),
    RuntimeTrain::new(8, 0),
    RuntimeTrain::new(9, 0),
    RuntimeTrain::new(10, 0),
];

/// A `major.minor` platform-runtime release line (e.g. `8.0`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuntimeTrain {
    /// Major runtime version
    pub major: u64,
    /// Minor runtime version
    pub minor: u64,
}

impl RuntimeTrain {
    /// Create a train from its components
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Whether the given version belongs to this train
    pub fn contains(&self, version: &VersionValue) -> bool {
        version.train() == (self.major, self.minor)
    }
}

impl fmt::Display for RuntimeTrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for RuntimeTrain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| Error::InvalidRuntimeTrain(s.to_string()))?;
        let major = major.parse().map_err(|_| Error::InvalidRuntimeTrain(s.to_string()))?;
        let minor = minor.parse().map_err(|_| Error::InvalidRuntimeTrain(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for RuntimeTrain {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RuntimeTrain> for String {
    fn from(train: RuntimeTrain) -> Self {
        train.to_string()
    }
}

/// A target framework moniker declared by a project (`net8.0`, `netstandard2.0`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetFramework {
    /// Moniker as written in the manifest
    pub moniker: String,
    /// Runtime train for modern runtime monikers (`netX.Y`, `netcoreappX.Y`)
    pub runtime: Option<RuntimeTrain>,
}

fn runtime_moniker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)net(?:coreapp)?(\d+)\.(\d+)(?:-.*)?$").expect("valid moniker pattern")
    })
}

impl TargetFramework {
    /// Parse one moniker. Monikers that do not name a runtime train
    /// (`netstandard2.0`, `net472`) keep `runtime: None`.
    pub fn parse(moniker: &str) -> Self {
        let moniker = moniker.trim();
        let runtime = runtime_moniker().captures(moniker).and_then(|caps| {
            let major = caps[1].parse().ok()?;
            let minor = caps[2].parse().ok()?;
            Some(RuntimeTrain::new(major, minor))
        });
        Self {
            moniker: moniker.to_string(),
            runtime,
        }
    }

    /// Parse a `;`-separated `TargetFrameworks` value
    pub fn parse_list(value: &str) -> Vec<Self> {
        value
            .split(';')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moniker)
    }
}
