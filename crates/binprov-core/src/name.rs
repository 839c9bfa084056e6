//! Validated identifiers for binaries, providers and package lists.

use std::borrow::Borrow;
use std::ffi::OsStr;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of an executable or script, e.g. `yt-dlp` or `django-admin.py`.
///
/// 1 to 63 characters of ASCII alphanumerics, `-`, `_` and `.`, starting with
/// a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinName(pub(crate) String);

impl BinName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason| Error::InvalidName {
            kind: "binary",
            value: name.clone(),
            reason,
        };

        if name.is_empty() || name.chars().count() > 63 {
            return Err(invalid("must be between 1 and 63 characters long"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(invalid("may only contain a-Z, 0-9, '-', '_' and '.'"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid("must start with a letter"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Name of a provider backend, e.g. `pip` or `my_vendor`.
///
/// 2 to 15 characters of ASCII alphanumerics and `_`, starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderName(String);

impl ProviderName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason| Error::InvalidName {
            kind: "provider",
            value: name.clone(),
            reason,
        };

        let len = name.chars().count();
        if !(2..=15).contains(&len) {
            return Err(invalid("must be between 2 and 15 characters long"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("may only contain a-Z, 0-9 and '_'"));
        }
        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid("must start with a letter"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(s: String) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = Error;

            fn try_from(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(name: $ty) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<OsStr> for $ty {
            fn as_ref(&self) -> &OsStr {
                OsStr::new(&self.0)
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_newtype!(BinName);
string_newtype!(ProviderName);

/// Non-empty list of package identifiers handed to an installer,
/// e.g. `["yt-dlp", "ffmpeg"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallArgs(Vec<String>);

impl InstallArgs {
    pub fn new<I, S>(packages: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let packages: Vec<String> = packages.into_iter().map(Into::into).collect();
        if packages.is_empty() {
            return Err(Error::InvalidPackages {
                packages,
                reason: "at least one package is required",
            });
        }
        if packages.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::InvalidPackages {
                packages,
                reason: "package names must not be blank",
            });
        }
        Ok(Self(packages))
    }

    pub fn packages(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&BinName> for InstallArgs {
    fn from(name: &BinName) -> Self {
        Self(vec![name.to_string()])
    }
}

impl<'a> IntoIterator for &'a InstallArgs {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
