//! Read-only provider over the host `$PATH`.

use std::path::{Path, PathBuf};

use binprov_core::handler::{Abspath, Version, abspath_fn, version_fn};
use binprov_core::provider::on_get_version;
use binprov_core::{
    BinName, BinProvider, HandlerRef, ProviderBuilder, ProviderName, Result, SearchPath,
    bin_abspath,
};

use crate::BackendConfig;

pub const NAME: &str = "env";
pub const INSTALLER: &str = "which";

const PYTHON_VERSION_SCRIPT: &str = "import platform; print(platform.python_version())";

pub fn builder(config: &BackendConfig) -> Result<ProviderBuilder> {
    let builder = ProviderBuilder::new(ProviderName::new(NAME)?)
        .installer(BinName::new(INSTALLER)?)
        .search_path(SearchPath::from_env())
        .register::<Abspath>("get_python_abspath", abspath_fn(get_python_abspath))
        .register::<Version>("get_python_version", version_fn(get_python_version))
        .handler::<Abspath>("python", HandlerRef::named("get_python_abspath"))
        .handler::<Version>("python", HandlerRef::named("get_python_version"));
    Ok(config.apply(builder))
}

pub fn provider(config: &BackendConfig) -> Result<BinProvider> {
    Ok(builder(config)?.build())
}

/// `python` means whichever of `python3` or `python` comes first.
fn get_python_abspath(provider: &BinProvider, _bin_name: &BinName) -> Result<Option<PathBuf>> {
    for candidate in ["python3", "python"] {
        if let Some(found) = bin_abspath(&BinName::new(candidate)?, provider.search_path()) {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn get_python_version(
    provider: &BinProvider,
    bin_name: &BinName,
    abspath: Option<&Path>,
) -> Result<Option<String>> {
    let abspath = match abspath {
        Some(abspath) => abspath.to_path_buf(),
        None => match provider.get_abspath(bin_name)? {
            Some(abspath) => abspath,
            None => return Ok(None),
        },
    };

    let output = provider.exec(&abspath, ["-c", PYTHON_VERSION_SCRIPT], None)?;
    if output.success() && !output.stdout.trim().is_empty() {
        return Ok(Some(output.stdout));
    }
    on_get_version(provider, bin_name, Some(&abspath))
}
