//! Provider for Debian packages installed with `apt-get`.

use std::path::PathBuf;

use binprov_core::handler::{Install, install_fn};
use binprov_core::{
    BinName, BinProvider, Error, InstallArgs, ProviderBuilder, ProviderName, Result, SearchPath,
};
use tracing::warn;

use crate::BackendConfig;

pub const NAME: &str = "apt";
pub const INSTALLER: &str = "apt-get";

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

/// The bin directories dpkg installed `bash` into stand in for every
/// package's.
fn discover(config: &BackendConfig) -> SearchPath {
    if which::which(INSTALLER).is_err() {
        return SearchPath::empty();
    }
    let Ok(dpkg) = which::which("dpkg") else {
        return SearchPath::empty();
    };
    match config.query(&dpkg, &["-L", "bash"]) {
        Some(listing) => SearchPath::lossy(parse_dpkg_bin_dirs(&listing)),
        None => SearchPath::empty(),
    }
}

fn parse_dpkg_bin_dirs(listing: &str) -> Vec<PathBuf> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with("/bin"))
        .map(PathBuf::from)
        .collect()
}

fn install_args(packages: &InstallArgs) -> Vec<String> {
    let mut args = vec![String::from("install"), String::from("-y")];
    args.extend(packages.iter().map(String::from));
    args
}

fn on_install(provider: &BinProvider, bin_name: &BinName, packages: &InstallArgs) -> Result<String> {
    if which::which("dpkg").is_err() {
        return Err(Error::InstallerUnavailable {
            provider: provider.name().to_string(),
            bin_name: bin_name.to_string(),
            installer: String::from("dpkg"),
        });
    }

    // A stale package index only matters if the install itself fails.
    if let Err(e) = provider.run_installer(bin_name, packages, ["update", "-qq"]) {
        warn!(provider = %provider.name(), bin_name = %bin_name, error = %e, "apt-get update failed");
    }

    let output = provider.run_installer(bin_name, packages, install_args(packages))?;
    Ok(output.combined())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dpkg_bin_dirs() {
        let listing = "\
/.
/bin
/bin/bash
/etc/skel/.bashrc
/usr/bin
/usr/bin/bashbug
/usr/share/doc/bash
";
        assert_eq!(
            parse_dpkg_bin_dirs(listing),
            [PathBuf::from("/bin"), PathBuf::from("/usr/bin")]
        );
        assert!(parse_dpkg_bin_dirs("").is_empty());
    }

    #[test]
    fn test_install_args() {
        let packages = InstallArgs::new(["ripgrep", "fd-find"]).unwrap();
        assert_eq!(install_args(&packages), ["install", "-y", "ripgrep", "fd-find"]);
    }
}
