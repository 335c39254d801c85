use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A mapping version string with numeric ordering.
///
/// Dot-separated numeric segments compare numerically (`1.10` > `1.9`). Versions
/// that are not purely numeric sort below every numeric one and compare lexically
/// among themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Option<Vec<u64>> {
        self.0.split('.').map(|s| s.trim().parse().ok()).collect()
    }

    /// The next minor version: `1.4` -> `1.5`, `2` -> `2.1`.
    pub fn next_minor(&self) -> Version {
        match self.segments() {
            Some(segments) => {
                let major = segments.first().copied().unwrap_or(1);
                let minor = segments.get(1).map_or(1, |m| m + 1);
                Version(format!("{major}.{minor}"))
            }
            None => Version(format!("{}.1", self.0)),
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.segments(), other.segments()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(version: &str) -> Self {
        Version::new(version)
    }
}
