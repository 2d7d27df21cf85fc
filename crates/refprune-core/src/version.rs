//! Version parsing and ordering for package references
//!
//! Package versions are four numeric parts (`major.minor.build.revision`)
//! followed by an optional pre-release label after the first `-`. A `*`
//! segment (floating versions such as `6.0.*`) counts as `0`.

use crate::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const MAX_PARTS: usize = 4;

/// Parsed package version with a total order
///
/// Equality and ordering ignore how many segments were written (`1.2` equals
/// `1.2.0.0`) and the case of the pre-release label.
#[derive(Debug, Clone)]
pub struct VersionValue {
    parts: [u64; MAX_PARTS],
    /// Number of segments present in the source text, used for display
    precision: usize,
    label: Option<String>,
}

impl VersionValue {
    /// Build a stable version from its numeric parts
    pub fn new(major: u64, minor: u64, build: u64, revision: u64) -> Self {
        Self {
            parts: [major, minor, build, revision],
            precision: if revision > 0 { 4 } else { 3 },
            label: None,
        }
    }

    /// Parse version text such as `1.2.3`, `10.1.999.0-preview` or `6.0.*`
    pub fn parse(raw: &str) -> Result<Self> {
        let text = raw.trim();
        // SemVer 2 build metadata never participates in ordering
        let text = text.split_once('+').map_or(text, |(head, _)| head);
        if text.is_empty() {
            return Err(Error::InvalidVersion(raw.to_string(), "empty version".into()));
        }

        let (primary, label) = match text.split_once('-') {
            Some((primary, label)) => (primary, Some(label)),
            None => (text, None),
        };

        let primary = primary.replace('*', "0");
        let segments: Vec<&str> = primary.split('.').collect();
        if segments.len() > MAX_PARTS {
            return Err(Error::InvalidVersion(
                raw.to_string(),
                format!("more than {MAX_PARTS} segments"),
            ));
        }

        let mut parts = [0u64; MAX_PARTS];
        for (slot, segment) in parts.iter_mut().zip(&segments) {
            *slot = segment.parse().map_err(|_| {
                Error::InvalidVersion(raw.to_string(), format!("'{segment}' is not numeric"))
            })?;
        }

        Ok(Self {
            parts,
            precision: segments.len(),
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
        })
    }

    /// Major component
    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    /// Minor component
    pub fn minor(&self) -> u64 {
        self.parts[1]
    }

    /// Build (patch) component
    pub fn build(&self) -> u64 {
        self.parts[2]
    }

    /// Revision component
    pub fn revision(&self) -> u64 {
        self.parts[3]
    }

    /// `(major, minor)` pair, used to match runtime release trains
    pub fn train(&self) -> (u64, u64) {
        (self.parts[0], self.parts[1])
    }

    /// Pre-release label as written, if any
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether this is a pre-release version
    pub fn is_prerelease(&self) -> bool {
        self.label.is_some()
    }

    /// Normalized lowercase form used in registry URLs: at least three parts,
    /// the revision only when non-zero (`1.0` -> `1.0.0`, `2.1.0.0-RC` -> `2.1.0-rc`)
    pub fn normalized(&self) -> String {
        let len = if self.parts[3] > 0 { 4 } else { 3 };
        let primary = self.parts[..len]
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match &self.label {
            Some(label) => format!("{primary}-{}", label.to_ascii_lowercase()),
            None => primary,
        }
    }

    fn folded_label(&self) -> Option<String> {
        self.label.as_ref().map(|l| l.to_ascii_uppercase())
    }
}

impl PartialEq for VersionValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionValue {}

impl Hash for VersionValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
        self.folded_label().hash(state);
    }
}

impl Ord for VersionValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts).then_with(|| {
            match (self.folded_label(), other.folded_label()) {
                (Some(a), Some(b)) => a.cmp(&b),
                // stable beats pre-release at an equal primary
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
    }
}

impl PartialOrd for VersionValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primary = self.parts[..self.precision.max(1)]
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        match &self.label {
            Some(label) => write!(f, "{primary}-{label}"),
            None => f.write_str(&primary),
        }
    }
}

impl FromStr for VersionValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}


#[cfg(test)]
#[cfg(feature = "property-tests")]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn version_text() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(0u64..50, 1..=4),
            prop::option::of("[a-zA-Z]{1,6}"),
        )
            .prop_map(|(parts, label)| {
                let primary = parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
                match label {
                    Some(label) => format!("{primary}-{label}"),
                    None => primary,
                }
            })
    }

    proptest! {
        #[test]
        fn ordering_is_antisymmetric(a in version_text(), b in version_text()) {
            let va = VersionValue::parse(&a).unwrap();
            let vb = VersionValue::parse(&b).unwrap();
            prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
        }

        #[test]
        fn ordering_is_transitive(a in version_text(), b in version_text(), c in version_text()) {
            let va = VersionValue::parse(&a).unwrap();
            let vb = VersionValue::parse(&b).unwrap();
            let vc = VersionValue::parse(&c).unwrap();
            if va <= vb && vb <= vc {
                prop_assert!(va <= vc);
            }
        }

        #[test]
        fn display_round_trips(a in version_text()) {
            let shown = VersionValue::parse(&a).unwrap().to_string();
            prop_assert_eq!(VersionValue::parse(&shown).unwrap().to_string(), shown);
        }
    }
}
