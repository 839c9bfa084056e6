use once_cell::sync::Lazy;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::{fmt, str::FromStr};
use thiserror::Error;

static VERSION_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[vV]?[0-9]").unwrap());

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("no version text to parse")]
    Empty,
    #[error("no version number found in {0:?}")]
    NotFound(String),
    #[error("version component out of range in {0:?}")]
    Overflow(String),
}

/// A `major.minor.patch` triple plus the line it was read from.
///
/// Equality, ordering and hashing only look at the numbers; `full_text` is
/// carried along for display and diagnostics.
#[derive(Debug, Clone)]
pub struct SemVer {
    version: Version,
    full_text: String,
}

impl SemVer {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: Version::new(major, minor, patch),
            full_text: format!("{major}.{minor}.{patch}"),
        }
    }

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
        let first = lines.peek().copied().ok_or(VersionError::Empty)?;

        let (line, token) = lines
            .find_map(|line| {
                line.split_whitespace()
                    .find(|t| VERSION_TOKEN.is_match(t))
                    .map(|token| (line, token))
            })
            .ok_or_else(|| VersionError::NotFound(first.to_string()))?;

        let mut parts = DIGITS.find_iter(token).take(3).map(|m| {
            m.as_str()
                .parse::<u64>()
                .map_err(|_| VersionError::Overflow(token.to_string()))
        });
        let major = parts.next().transpose()?.unwrap_or(0);
        let minor = parts.next().transpose()?.unwrap_or(0);
        let patch = parts.next().transpose()?.unwrap_or(0);

        Ok(Self {
            version: Version::new(major, minor, patch),
            full_text: line.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.version.major
    }

    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// The line the version was read from, e.g. `ls (coreutils) 9.1`.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn as_tuple(&self) -> (u64, u64, u64) {
        (self.version.major, self.version.minor, self.version.patch)
    }
}

impl Deref for SemVer {
    type Target = Version;

    fn deref(&self) -> &Self::Target {
        &self.version
    }
}

impl From<SemVer> for Version {
    fn from(v: SemVer) -> Self {
        v.version
    }
}

impl From<(u64, u64, u64)> for SemVer {
    fn from((major, minor, patch): (u64, u64, u64)) -> Self {
        SemVer::new(major, minor, patch)
    }
}

impl PartialEq for SemVer {
    fn eq(&self, other: &Self) -> bool {
        self.as_tuple() == other.as_tuple()
    }
}

impl Eq for SemVer {}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

impl Hash for SemVer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_tuple().hash(state);
    }
}

impl FromStr for SemVer {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemVer::parse(s)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.version.major, self.version.minor, self.version.patch
        )
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        SemVer::parse(&s).map_err(serde::de::Error::custom)
    }
}
