use crate::error::{Error, Result};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Compare directories the way PATH lookups do: trailing separators are
/// ignored, and on Windows so is case.
pub fn paths_equal(p1: &Path, p2: &Path) -> bool {
    fn normalize(p: &Path) -> String {
        let s = p.to_string_lossy();
        let s = s.trim_end_matches(['/', '\\']);
        #[cfg(target_os = "windows")]
        {
            s.to_lowercase()
        }
        #[cfg(not(target_os = "windows"))]
        {
            s.to_string()
        }
    }
    normalize(p1) == normalize(p2)
}

pub fn path_env() -> Option<Vec<PathBuf>> {
    env::var_os("PATH").map(|val| split_paths(&val))
}

pub fn split_paths(val: &OsStr) -> Vec<PathBuf> {
    env::split_paths(val)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

pub fn join_paths<I, P>(paths: I) -> Result<OsString>
where
    I: IntoIterator<Item = P>,
    P: AsRef<OsStr>,
{
    env::join_paths(paths).map_err(|_| Error::JoinPaths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_equal_normalization() {
        assert!(paths_equal(Path::new("/path"), Path::new("/path")));
        assert!(paths_equal(Path::new("/path/"), Path::new("/path")));
    }

    #[test]
    fn test_paths_equal_different() {
        assert!(!paths_equal(Path::new("/path1"), Path::new("/path2")));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_paths_equal_is_case_sensitive() {
        assert!(!paths_equal(Path::new("/Opt/bin"), Path::new("/opt/bin")));
    }

    #[cfg(unix)]
    #[test]
    fn test_split_paths_skips_empty_entries() {
        let paths = split_paths(OsStr::new("/usr/bin::/bin:"));
        assert_eq!(paths, vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_join_paths() {
        let joined = join_paths(["/a", "/b"]).unwrap();
        assert_eq!(joined, OsString::from("/a:/b"));
    }
}
