//! Ordered release versions.
//!
//! Format: `major.minor.patch` (e.g. `0.1.5`). Comparison is lexicographic
//! on the triple, so `0.1.0 < 0.1.5 < 0.2.0`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A release version, compared by `(major, minor, patch)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(semver::Version);

impl Version {
    /// Create a version from its three components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// True if `self` is strictly older than `other`.
    pub fn is_older_than(&self, other: &Version) -> bool {
        self < other
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed =
            semver::Version::parse(s.trim()).map_err(|source| VersionParseError::Syntax {
                input: s.to_string(),
                source,
            })?;

        // Pre-release and build tags would break triple ordering.
        if !parsed.pre.is_empty() || !parsed.build.is_empty() {
            return Err(VersionParseError::Qualified(s.to_string()));
        }

        Ok(Self(parsed))
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

/// Error parsing a version string.
#[derive(Debug, thiserror::Error)]
pub enum VersionParseError {
    #[error("invalid version '{input}': {source}")]
    Syntax {
        input: String,
        #[source]
        source: semver::Error,
    },
    #[error("version must be a plain major.minor.patch triple, got: {0}")]
    Qualified(String),
}

impl VersionParseError {
    /// The string that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            Self::Syntax { input, .. } | Self::Qualified(input) => input,
        }
    }
}
