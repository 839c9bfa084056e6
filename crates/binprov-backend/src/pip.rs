//! Provider for packages installed with `pip`.

use std::path::PathBuf;

use binprov_core::handler::{Install, install_fn};
use binprov_core::{BinName, BinProvider, InstallArgs, ProviderBuilder, ProviderName, Result, SearchPath};

use crate::BackendConfig;

pub const NAME: &str = "pip";
pub const INSTALLER: &str = "pip";

/// Prints every directory the interpreter installs console scripts into.
const SCRIPT_DIRS: &str = "\
import os, site, sysconfig
dirs = [sysconfig.get_path('scripts')]
dirs += [os.path.join(os.path.dirname(os.path.dirname(os.path.dirname(d))), 'bin') for d in site.getsitepackages()]
dirs.append(os.path.join(site.getuserbase(), 'bin'))
print('\\n'.join(dirs))";

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
    let mut dirs: Vec<PathBuf> = Vec::new();

    let python = which::which("python3").or_else(|_| which::which("python"));
    if let Ok(python) = python {
        if let Some(out) = config.query(&python, &["-c", SCRIPT_DIRS]) {
            dirs.extend(out.lines().map(str::trim).filter(|l| !l.is_empty()).map(PathBuf::from));
        }
    }

    if let Ok(pipx) = which::which("pipx") {
        if let Some(dir) = config
            .query(&pipx, &["environment"])
            .and_then(|out| parse_pipx_bin_dir(&out))
        {
            dirs.push(dir);
        }
    }

    SearchPath::lossy(dirs)
}

/// `PIPX_BIN_DIR=/home/me/.local/bin` out of `pipx environment`.
fn parse_pipx_bin_dir(environment: &str) -> Option<PathBuf> {
    environment
        .lines()
        .filter_map(|line| line.trim().strip_prefix("PIPX_BIN_DIR="))
        .map(str::trim)
        .find(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

fn install_args(packages: &InstallArgs) -> Vec<String> {
    let mut args = vec![String::from("install")];
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

    #[test]
    fn test_parse_pipx_bin_dir() {
        let out = "\
Environment variables (set by user):

PIPX_HOME=
PIPX_BIN_DIR=

Derived values (computed by pipx):

PIPX_HOME=/home/me/.local/pipx
PIPX_BIN_DIR=/home/me/.local/bin
PIPX_MAN_DIR=/home/me/.local/share/man";
        assert_eq!(
            parse_pipx_bin_dir(out),
            Some(PathBuf::from("/home/me/.local/bin"))
        );
        assert_eq!(parse_pipx_bin_dir("PIPX_BIN_DIR=\n"), None);
        assert_eq!(parse_pipx_bin_dir("nothing useful"), None);
    }

    #[test]
    fn test_install_args() {
        let packages = InstallArgs::new(["yt-dlp", "ffmpeg-python"]).unwrap();
        assert_eq!(install_args(&packages), ["install", "yt-dlp", "ffmpeg-python"]);
    }
}
