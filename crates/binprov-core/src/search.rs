//! Search directories and PATH-style binary lookup.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use binprov_platform::{dir, env as path_env};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::name::BinName;

/// An absolute path to an existing directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct BinDir(PathBuf);

impl BinDir {
    /// Expands `~`, makes the path absolute and checks it is a directory.
    /// Symlinks are kept as given.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidSearchPath {
                path: path.to_path_buf(),
                reason: "empty path",
            });
        }
        let abs = dir::absolute(path);
        if !abs.is_dir() {
            return Err(Error::InvalidSearchPath {
                path: abs,
                reason: "not an existing directory",
            });
        }
        Ok(Self(abs))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for BinDir {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl TryFrom<PathBuf> for BinDir {
    type Error = Error;

    fn try_from(path: PathBuf) -> Result<Self> {
        Self::new(path)
    }
}

impl From<BinDir> for PathBuf {
    fn from(dir: BinDir) -> Self {
        dir.0
    }
}

/// Ordered, de-duplicated list of directories a provider searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPath(Vec<BinDir>);

impl SearchPath {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Every entry must be valid; the first bad one is returned as an error.
    pub fn new<I, P>(dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut search = Self::empty();
        for dir in dirs {
            search.push(BinDir::new(dir)?);
        }
        Ok(search)
    }

    /// Keeps the valid entries and drops the rest.
    pub fn lossy<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut search = Self::empty();
        for dir in dirs {
            match BinDir::new(dir.as_ref()) {
                Ok(dir) => search.push(dir),
                Err(e) => tracing::debug!(error = %e, "dropping search path entry"),
            }
        }
        search
    }

    /// Parse a `$PATH` formatted string, strictly.
    pub fn parse(path: &str) -> Result<Self> {
        Self::new(path_env::split_paths(path.as_ref()))
    }

    /// The host `$PATH`, minus entries that are not directories.
    pub fn from_env() -> Self {
        Self::lossy(path_env::path_env().unwrap_or_default())
    }

    pub fn dirs(&self) -> &[BinDir] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(BinDir::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.0.iter().any(|d| path_env::paths_equal(d.as_path(), dir))
    }

    /// Appends `dir` unless already present.
    pub fn push(&mut self, dir: BinDir) {
        if !self.contains(dir.as_path()) {
            self.0.push(dir);
        }
    }

    /// Puts `dir` first, moving it if already present.
    pub fn prepend(&mut self, dir: BinDir) {
        self.0.retain(|d| !path_env::paths_equal(d.as_path(), dir.as_path()));
        self.0.insert(0, dir);
    }

    pub fn extend(&mut self, other: SearchPath) {
        for dir in other.0 {
            self.push(dir);
        }
    }

    /// Entries joined with the platform `$PATH` separator.
    pub fn join(&self) -> Result<OsString> {
        Ok(path_env::join_paths(self.iter())?)
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if cfg!(windows) { ";" } else { ":" };
        for (i, dir) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            write!(f, "{}", dir.as_path().display())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SearchPath {
    type Item = &'a BinDir;
    type IntoIter = std::slice::Iter<'a, BinDir>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// First match for `bin_name` in `search_path`.
///
/// Executables are found the way a shell would. Files that are not
/// executable (e.g. `django-admin.py`) are accepted from a plain directory
/// scan when no executable matches. A match whose directory is not part of
/// `search_path` is rejected.
pub fn bin_abspath(bin_name: &BinName, search_path: &SearchPath) -> Option<PathBuf> {
    if search_path.is_empty() {
        return None;
    }
    let joined = search_path.join().ok()?;
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

    match which::which_in(bin_name.as_str(), Some(joined), cwd) {
        Ok(found) => {
            let in_search_path = found.parent().is_some_and(|d| search_path.contains(d));
            if !in_search_path {
                tracing::debug!(
                    bin_name = %bin_name,
                    found = %found.display(),
                    "match is outside of the search path"
                );
                return None;
            }
            Some(dir::absolute(&found))
        }
        Err(_) => search_path
            .iter()
            .map(|d| d.join(bin_name.as_str()))
            .find(|candidate| candidate.is_file()),
    }
}

/// Every executable match for `bin_name`, in search path order.
pub fn bin_abspaths(bin_name: &BinName, search_path: &SearchPath) -> Vec<PathBuf> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    search_path
        .iter()
        .filter_map(|d| which::which_in(bin_name.as_str(), Some(d), &cwd).ok())
        .filter(|found| found.parent().is_some_and(|d| search_path.contains(d)))
        .map(|found| dir::absolute(&found))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn bin(name: &str) -> BinName {
        BinName::new(name).unwrap()
    }

    #[cfg(unix)]
    fn touch_exe(dir: &Path, name: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, "#!/bin/sh\necho 1.0.0\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_bin_dir_rejects_missing_and_files() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();

        assert!(BinDir::new(tmp.path()).is_ok());
        assert!(matches!(
            BinDir::new(&file),
            Err(Error::InvalidSearchPath { .. })
        ));
        assert!(BinDir::new(tmp.path().join("missing")).is_err());
        assert!(BinDir::new("").is_err());
    }

    #[test]
    fn test_bin_dir_is_made_absolute() {
        let dir = BinDir::new(".").unwrap();
        assert!(dir.as_path().is_absolute());
    }

    #[test]
    fn test_search_path_strict_and_lossy() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let missing = a.path().join("missing");

        assert!(SearchPath::new([a.path(), missing.as_path()]).is_err());

        let lossy = SearchPath::lossy([a.path(), missing.as_path(), b.path(), a.path()]);
        assert_eq!(lossy.len(), 2);
        assert!(lossy.contains(a.path()));
        assert!(lossy.contains(b.path()));
        assert!(!lossy.contains(&missing));
    }

    #[test]
    fn test_search_path_prepend_moves_entry() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let mut search = SearchPath::new([a.path(), b.path()]).unwrap();
        search.prepend(BinDir::new(b.path()).unwrap());
        let order: Vec<_> = search.iter().collect();
        assert_eq!(order, vec![b.path(), a.path()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_parse_and_display() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let raw = format!("{}:{}", a.path().display(), b.path().display());
        let search = SearchPath::parse(&raw).unwrap();
        assert_eq!(search.len(), 2);
        assert_eq!(search.to_string(), raw);
        assert_eq!(search.join().unwrap(), OsString::from(raw));
    }

    #[cfg(unix)]
    #[test]
    fn test_bin_abspath_finds_executable() {
        let tmp = TempDir::new().unwrap();
        let exe = touch_exe(tmp.path(), "mytool");
        let search = SearchPath::new([tmp.path()]).unwrap();
        assert_eq!(bin_abspath(&bin("mytool"), &search), Some(exe));
    }

    #[cfg(unix)]
    #[test]
    fn test_bin_abspath_respects_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch_exe(second.path(), "tool");
        let expected = touch_exe(first.path(), "tool");
        let search = SearchPath::new([first.path(), second.path()]).unwrap();
        assert_eq!(bin_abspath(&bin("tool"), &search), Some(expected));
        assert_eq!(bin_abspaths(&bin("tool"), &search).len(), 2);
    }

    #[test]
    fn test_bin_abspath_accepts_plain_script() {
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("manage.py");
        fs::write(&script, "print('hi')").unwrap();
        let search = SearchPath::new([tmp.path()]).unwrap();
        assert_eq!(bin_abspath(&bin("manage.py"), &search), Some(script));
    }

    #[cfg(unix)]
    #[test]
    fn test_bin_abspath_ignores_dirs_outside_search_path() {
        let inside = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch_exe(outside.path(), "hidden");
        let search = SearchPath::new([inside.path()]).unwrap();
        assert_eq!(bin_abspath(&bin("hidden"), &search), None);
        assert!(bin_abspaths(&bin("hidden"), &search).is_empty());
    }

    #[test]
    fn test_bin_abspath_empty_search_path() {
        assert_eq!(bin_abspath(&bin("ls"), &SearchPath::empty()), None);
    }
}
