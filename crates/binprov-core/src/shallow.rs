use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use binprov_platform::{Command, CommandOutput};
use binprov_version::SemVer;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::name::{BinName, ProviderName};

const SCRIPT_EXTENSIONS: [&str; 3] = ["py", "js", "sh"];

/// A binary that a provider has located and versioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShallowBinary {
    pub name: BinName,
    #[serde(alias = "binprovider", alias = "loaded_binprovider")]
    pub provider: ProviderName,
    #[serde(alias = "loaded_abspath")]
    pub abspath: PathBuf,
    #[serde(alias = "loaded_version")]
    pub version: SemVer,
}

impl ShallowBinary {
    pub fn new(name: BinName, provider: ProviderName, abspath: PathBuf, version: SemVer) -> Self {
        Self {
            name,
            provider,
            abspath,
            version,
        }
    }

    pub fn loaded_abspath(&self) -> &Path {
        &self.abspath
    }

    pub fn loaded_version(&self) -> &SemVer {
        &self.version
    }

    pub fn binprovider(&self) -> &ProviderName {
        &self.provider
    }

    pub fn bin_dir(&self) -> Option<&Path> {
        self.abspath.parent()
    }

    /// `abspath` with symlinks resolved.
    pub fn respath(&self) -> Option<PathBuf> {
        self.abspath.canonicalize().ok()
    }

    /// File name on disk, e.g. `wget` for `/opt/homebrew/bin/wget`. Scripts
    /// keep the binary name.
    pub fn bin_filename(&self) -> BinName {
        if self.is_script() {
            return self.name.clone();
        }
        self.abspath
            .file_name()
            .and_then(OsStr::to_str)
            .and_then(|f| BinName::new(f).ok())
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn is_executable(&self) -> bool {
        is_executable(&self.abspath)
    }

    pub fn is_script(&self) -> bool {
        self.abspath.is_file()
            && self
                .abspath
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    pub fn is_valid(&self) -> bool {
        self.abspath.is_file() && (self.is_executable() || self.is_script())
    }

    /// Run the resolved binary.
    pub fn exec<I, S>(&self, args: I, cwd: Option<&Path>, timeout: Option<Duration>) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.abspath).args(args).current_dir_opt(cwd);
        if let Some(timeout) = timeout {
            cmd = cmd.timeout(timeout);
        }
        Ok(cmd.output()?)
    }
}

impl fmt::Display for ShallowBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name,
            self.provider,
            self.version,
            self.abspath.display()
        )
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn record(abspath: PathBuf) -> ShallowBinary {
        ShallowBinary::new(
            BinName::new("tool").unwrap(),
            ProviderName::new("env").unwrap(),
            abspath,
            SemVer::new(1, 2, 3),
        )
    }

    #[test]
    fn test_script_detection() {
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("manage.PY");
        fs::write(&script, "").unwrap();
        let rec = record(script);
        assert!(rec.is_script());
        assert!(rec.is_valid());
        assert_eq!(rec.bin_filename(), "tool");
        assert_eq!(rec.bin_dir(), Some(tmp.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_detection() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wget2");
        fs::write(&path, "").unwrap();

        let rec = record(path.clone());
        assert!(!rec.is_executable());
        assert!(!rec.is_valid());

        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(rec.is_executable());
        assert!(rec.is_valid());
        assert_eq!(rec.bin_filename(), "wget2");
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let rec = record(PathBuf::from("/nonexistent/binprov/tool"));
        assert!(!rec.is_valid());
        assert!(rec.respath().is_none());
    }

    #[test]
    fn test_serde_canonical_names_and_aliases() {
        let rec = record(PathBuf::from("/usr/bin/tool"));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["provider"], "env");
        assert_eq!(json["abspath"], "/usr/bin/tool");
        assert_eq!(json["version"], "1.2.3");

        let legacy = r#"{
            "name": "tool",
            "binprovider": "env",
            "loaded_abspath": "/usr/bin/tool",
            "loaded_version": "tool v1.2.3"
        }"#;
        let back: ShallowBinary = serde_json::from_str(legacy).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.loaded_abspath(), Path::new("/usr/bin/tool"));
    }

    #[test]
    fn test_display() {
        let rec = record(PathBuf::from("/usr/bin/tool"));
        assert_eq!(rec.to_string(), "tool env 1.2.3 /usr/bin/tool");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_runs_abspath() {
        let rec = record(PathBuf::from("/bin/sh"));
        let out = rec
            .exec(["-c", "echo hi"], None, Some(Duration::from_secs(10)))
            .unwrap();
        assert_eq!(out.stdout.trim(), "hi");
    }
}
