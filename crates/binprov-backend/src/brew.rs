//! Provider for Homebrew formulae.

use std::path::{Path, PathBuf};

use binprov_core::handler::{Abspath, Install, Version, abspath_fn, install_fn, version_fn};
use binprov_core::provider::on_get_version;
use binprov_core::{
    BinName, BinProvider, InstallArgs, ProviderBuilder, ProviderName, Result, SearchPath, SemVer,
    bin_abspath,
};
use binprov_platform::os::{self, Arch, OS};
use tracing::debug;

use crate::BackendConfig;

pub const NAME: &str = "brew";
pub const INSTALLER: &str = "brew";

const MACOS_ARM_DIR: &str = "/opt/homebrew/bin";
const MACOS_INTEL_DIR: &str = "/usr/local/bin";
const LINUX_DIR: &str = "/home/linuxbrew/.linuxbrew/bin";

pub fn builder(config: &BackendConfig) -> Result<ProviderBuilder> {
    let builder = ProviderBuilder::new(ProviderName::new(NAME)?)
        .installer(BinName::new(INSTALLER)?)
        .search_path(discover(config))
        .register::<Abspath>("on_get_abspath", abspath_fn(on_get_abspath))
        .register::<Version>("on_get_version", version_fn(on_get_brew_version))
        .register::<Install>("on_install", install_fn(on_install));
    Ok(config.apply(builder))
}

pub fn provider(config: &BackendConfig) -> Result<BinProvider> {
    Ok(builder(config)?.build())
}

fn default_dir(os: OS, arch: Arch) -> &'static str {
    match (os, arch) {
        (OS::Macos, Arch::ARM64) => MACOS_ARM_DIR,
        (OS::Macos, _) => MACOS_INTEL_DIR,
        _ => LINUX_DIR,
    }
}

fn discover(config: &BackendConfig) -> SearchPath {
    let Ok(brew) = which::which(INSTALLER) else {
        return SearchPath::empty();
    };

    let host = os::host();
    let dir = Path::new(default_dir(host.os, host.arch));
    if dir.is_dir() {
        return SearchPath::lossy([dir]);
    }

    // Non-standard prefix; asking brew is slow so it is the last resort.
    match config.query(&brew, &["--prefix"]) {
        Some(prefix) => SearchPath::lossy([Path::new(&prefix).join("bin")]),
        None => SearchPath::empty(),
    }
}

/// `<prefix>/opt/<formula>/bin` for every `<prefix>/bin` searched. Keg-only
/// formulae such as `curl` are never linked into the shared bin directory.
fn opt_dirs<'a>(search_path: &'a SearchPath, bin_name: &'a BinName) -> impl Iterator<Item = PathBuf> + 'a {
    search_path.iter().filter_map(move |dir| {
        dir.parent()
            .map(|prefix| prefix.join("opt").join(bin_name.as_str()).join("bin"))
    })
}

fn on_get_abspath(provider: &BinProvider, bin_name: &BinName) -> Result<Option<PathBuf>> {
    if provider.search_path().is_empty() {
        return Ok(None);
    }
    let mut search_path = provider.search_path().clone();
    search_path.extend(SearchPath::lossy(opt_dirs(provider.search_path(), bin_name)));
    Ok(bin_abspath(bin_name, &search_path))
}

fn on_get_brew_version(
    provider: &BinProvider,
    bin_name: &BinName,
    abspath: Option<&Path>,
) -> Result<Option<String>> {
    match on_get_version(provider, bin_name, abspath) {
        Ok(Some(text)) if SemVer::parse(&text).is_ok() => return Ok(Some(text)),
        Ok(_) => {}
        Err(e) => debug!(bin_name = %bin_name, error = %e, "--version failed, asking brew"),
    }

    let Some(brew) = provider.installer_abspath() else {
        return Ok(None);
    };
    let output = provider.exec(brew, ["info", "--quiet", bin_name.as_str()], None)?;
    if !output.success() {
        return Ok(None);
    }
    Ok(Some(output.stdout))
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
