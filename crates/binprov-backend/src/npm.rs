//! Provider for packages installed with `npm`.
//!
//! Looks in the nearest project-local `node_modules/.bin` first, then in the
//! global prefix.

use std::path::{Path, PathBuf};

use binprov_core::handler::{Install, install_fn};
use binprov_core::{BinName, BinProvider, InstallArgs, ProviderBuilder, ProviderName, Result, SearchPath};
use binprov_platform::dir;

use crate::BackendConfig;

pub const NAME: &str = "npm";
pub const INSTALLER: &str = "npm";

/// How far above the npm prefix to look for a `node_modules/.bin`.
const MAX_HOPS: usize = 6;

pub fn builder(config: &BackendConfig) -> Result<ProviderBuilder> {
    let builder = ProviderBuilder::new(ProviderName::new(NAME)?)
        .installer(BinName::new(INSTALLER)?)
        .search_path(discover(config))
        .register::<Install>("on_install", install_fn(on_install));
    Ok(config.apply(builder))
}

pub fn provider(config: &BackendConfig) -> Result<BinProvider> {
    Ok(builder(config)?.build())
}

fn discover(config: &BackendConfig) -> SearchPath {
    let Ok(npm) = which::which(INSTALLER) else {
        return SearchPath::empty();
    };

    let mut dirs = Vec::new();
    if let Some(prefix) = config.query(&npm, &["prefix"]) {
        let home = dir::user_home();
        if let Some(local) = find_local_bin(Path::new(&prefix), MAX_HOPS, home.as_deref()) {
            dirs.push(local);
        }
    }
    if let Some(global) = config.query(&npm, &["prefix", "-g"]) {
        dirs.push(global_bin(Path::new(&global)));
    }

    SearchPath::lossy(dirs)
}

/// Walks up from `start` looking for `node_modules/.bin`. Gives up after
/// `max_hops` parents, at the filesystem root, or at `stop`.
fn find_local_bin(start: &Path, max_hops: usize, stop: Option<&Path>) -> Option<PathBuf> {
    let mut current = Some(start);
    for _ in 0..=max_hops {
        let dir = current?;
        let candidate = dir.join("node_modules").join(".bin");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if dir.parent().is_none() || stop.is_some_and(|stop| dir == stop) {
            return None;
        }
        current = dir.parent();
    }
    None
}

#[cfg(windows)]
fn global_bin(prefix: &Path) -> PathBuf {
    prefix.to_path_buf()
}

#[cfg(not(windows))]
fn global_bin(prefix: &Path) -> PathBuf {
    prefix.join("bin")
}

fn install_args(packages: &InstallArgs) -> Vec<String> {
    let mut args = vec![String::from("install"), String::from("-g")];
    args.extend(packages.iter().map(String::from));
    args
}

fn on_install(provider: &BinProvider, bin_name: &BinName, packages: &InstallArgs) -> Result<String> {
    let output = provider.run_installer(bin_name, packages, install_args(packages))?;
    Ok(output.combined())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_local_bin_walks_up() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("node_modules/.bin");
        fs::create_dir_all(&bin).unwrap();
        let deep = tmp.path().join("a/b/c");
        fs::create_dir_all(&deep).unwrap();

        assert_eq!(find_local_bin(&deep, MAX_HOPS, None), Some(bin.clone()));
        assert_eq!(find_local_bin(tmp.path(), MAX_HOPS, None), Some(bin));
    }

    #[test]
    fn test_find_local_bin_respects_hops() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/.bin")).unwrap();
        let deep = tmp.path().join("1/2/3");
        fs::create_dir_all(&deep).unwrap();

        assert!(find_local_bin(&deep, 2, None).is_none());
        assert!(find_local_bin(&deep, 3, None).is_some());
    }

    #[test]
    fn test_find_local_bin_stops_at_home() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules/.bin")).unwrap();
        let home = tmp.path().join("home");
        let project = home.join("project");
        fs::create_dir_all(&project).unwrap();

        assert!(find_local_bin(&project, MAX_HOPS, Some(&home)).is_none());
    }

    #[test]
    fn test_install_args() {
        let packages = InstallArgs::new(["prettier"]).unwrap();
        assert_eq!(install_args(&packages), ["install", "-g", "prettier"]);
    }
}
