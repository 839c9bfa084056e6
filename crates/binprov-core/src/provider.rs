//! The resolution and install engine shared by every provider.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use binprov_platform::{Command, CommandOutput, CommandRunner, SystemRunner, dir};
use binprov_version::SemVer;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::cache::{self, CacheEntry, ProviderCache};
use crate::error::{Error, Result};
use crate::handler::{
    Abspath, HandlerKind, HandlerRef, Handlers, Install, Kind, Overrides, Packages, Version,
};
use crate::name::{BinName, InstallArgs, ProviderName};
use crate::search::{SearchPath, bin_abspath, bin_abspaths};
use crate::shallow::ShallowBinary;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Per-call knobs for lookups.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub overrides: Overrides,
    /// Read previously resolved results. Results are recorded either way,
    /// except answers from overridden handlers, which are never recorded.
    pub cache: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            overrides: Overrides::default(),
            cache: true,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    fn reads_cache(&self, kind: HandlerKind) -> bool {
        self.cache && !self.overrides.has(kind)
    }
}

/// A source of binaries: a search path, an installer tool and the four
/// handler kinds that answer questions about binaries.
///
/// Built with [`ProviderBuilder`]. Results are cached per instance.
pub struct BinProvider {
    name: ProviderName,
    installer: BinName,
    search_path: SearchPath,
    timeout: Duration,
    install_timeout: Duration,
    runner: Arc<dyn CommandRunner>,
    handlers: Handlers,
    installer_abspath: OnceCell<Option<PathBuf>>,
    cache: ProviderCache,
}

impl fmt::Debug for BinProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinProvider")
            .field("name", &self.name)
            .field("installer", &self.installer)
            .field("search_path", &self.search_path)
            .field("timeout", &self.timeout)
            .field("install_timeout", &self.install_timeout)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl BinProvider {
    pub fn builder(name: ProviderName) -> ProviderBuilder {
        ProviderBuilder::new(name)
    }

    pub fn name(&self) -> &ProviderName {
        &self.name
    }

    pub fn installer(&self) -> &BinName {
        &self.installer
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn install_timeout(&self) -> Duration {
        self.install_timeout
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// Where the installer tool lives on the host `$PATH`. Looked up once.
    pub fn installer_abspath(&self) -> Option<&Path> {
        self.installer_abspath
            .get_or_init(|| which::which(self.installer.as_str()).ok())
            .as_deref()
    }

    /// Whether the installer tool is present, i.e. `install` can work.
    pub fn is_valid(&self) -> bool {
        self.installer_abspath().is_some()
    }

    pub fn get_abspath(&self, bin_name: &BinName) -> Result<Option<PathBuf>> {
        self.get_abspath_with(bin_name, &LoadOptions::default())
    }

    pub fn get_abspath_with(&self, bin_name: &BinName, opts: &LoadOptions) -> Result<Option<PathBuf>> {
        if opts.reads_cache(HandlerKind::Abspath) {
            if let Some(abspath) = self.cache.abspath(bin_name) {
                debug!(provider = %self.name, bin_name = %bin_name, kind = "abspath", "cache hit");
                return Ok(Some(abspath));
            }
        }

        let handler = self.effective::<Abspath>(bin_name, &opts.overrides)?;
        debug!(provider = %self.name, bin_name = %bin_name, kind = "abspath", "resolving");
        let Some(found) = handler(self, bin_name)? else {
            return Ok(None);
        };

        let abspath = dir::absolute(&found);
        if !abspath.is_file() {
            return Err(Error::InvalidAbspath {
                provider: self.name.to_string(),
                bin_name: bin_name.to_string(),
                path: abspath,
            });
        }
        if !opts.overrides.has(HandlerKind::Abspath) {
            self.cache.set_abspath(bin_name, abspath.clone());
        }
        Ok(Some(abspath))
    }

    /// Every match across the search path, in order.
    pub fn get_abspaths(&self, bin_name: &BinName) -> Vec<PathBuf> {
        bin_abspaths(bin_name, &self.search_path)
    }

    pub fn get_version(&self, bin_name: &BinName) -> Result<Option<SemVer>> {
        self.get_version_with(bin_name, None, &LoadOptions::default())
    }

    /// Output that does not parse as a version counts as absent.
    pub fn get_version_with(
        &self,
        bin_name: &BinName,
        abspath: Option<&Path>,
        opts: &LoadOptions,
    ) -> Result<Option<SemVer>> {
        if opts.reads_cache(HandlerKind::Version) {
            if let Some(version) = self.cache.version(bin_name) {
                debug!(provider = %self.name, bin_name = %bin_name, kind = "version", "cache hit");
                return Ok(Some(version));
            }
        }

        let Some(text) = self.version_text(bin_name, abspath, &opts.overrides)? else {
            return Ok(None);
        };
        match SemVer::parse(&text) {
            Ok(version) => {
                if !opts.overrides.has(HandlerKind::Version) {
                    self.cache.set_version(bin_name, version.clone());
                }
                Ok(Some(version))
            }
            Err(e) => {
                debug!(provider = %self.name, bin_name = %bin_name, error = %e, "unparsable version output");
                Ok(None)
            }
        }
    }

    fn version_text(
        &self,
        bin_name: &BinName,
        abspath: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Option<String>> {
        let handler = self.effective::<Version>(bin_name, overrides)?;
        debug!(provider = %self.name, bin_name = %bin_name, kind = "version", "resolving");
        let text = handler(self, bin_name, abspath)?;
        Ok(text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    pub fn get_packages(&self, bin_name: &BinName) -> Result<InstallArgs> {
        self.get_packages_with(bin_name, &Overrides::default())
    }

    /// Falls back to `[bin_name]` when the handler has nothing to say.
    pub fn get_packages_with(&self, bin_name: &BinName, overrides: &Overrides) -> Result<InstallArgs> {
        let handler = self.effective::<Packages>(bin_name, overrides)?;
        let packages = handler(self, bin_name)?
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| vec![bin_name.to_string()]);
        InstallArgs::new(packages)
    }

    pub fn install(&self, bin_name: &BinName) -> Result<ShallowBinary> {
        self.install_with(bin_name, &Overrides::default())
    }

    /// Installs `bin_name`, then resolves it again from scratch and fails
    /// unless both its abspath and version can be confirmed.
    pub fn install_with(&self, bin_name: &BinName, overrides: &Overrides) -> Result<ShallowBinary> {
        self.ensure_installer(bin_name)?;
        let lock = self.cache.install_lock(bin_name);
        let _guard = cache::hold(&lock);
        self.install_locked(bin_name, overrides)
    }

    fn ensure_installer(&self, bin_name: &BinName) -> Result<&Path> {
        self.installer_abspath().ok_or_else(|| {
            warn!(provider = %self.name, bin_name = %bin_name, installer = %self.installer, "installer not available");
            Error::InstallerUnavailable {
                provider: self.name.to_string(),
                bin_name: bin_name.to_string(),
                installer: self.installer.to_string(),
            }
        })
    }

    fn install_locked(&self, bin_name: &BinName, overrides: &Overrides) -> Result<ShallowBinary> {
        let packages = self.get_packages_with(bin_name, overrides)?;
        let handler = self.effective::<Install>(bin_name, overrides)?;

        info!(provider = %self.name, bin_name = %bin_name, packages = ?packages.packages(), "installing");
        let log = handler(self, bin_name, &packages).inspect_err(|e| {
            warn!(provider = %self.name, bin_name = %bin_name, error = %e, "install failed");
        })?;

        let fresh = LoadOptions {
            overrides: overrides.clone(),
            cache: false,
        };
        let abspath = self
            .get_abspath_with(bin_name, &fresh)?
            .ok_or_else(|| self.verification_error(bin_name, "abspath", &log))?;

        let version = self
            .version_text(bin_name, Some(&abspath), overrides)?
            .and_then(|text| SemVer::parse(&text).ok())
            .ok_or_else(|| self.verification_error(bin_name, "version", &log))?;
        if !overrides.has(HandlerKind::Version) {
            self.cache.set_version(bin_name, version.clone());
        }

        let record = ShallowBinary::new(bin_name.clone(), self.name.clone(), abspath, version);
        if overrides.is_empty() {
            self.cache.set_installed(bin_name, record.clone());
        }
        info!(provider = %self.name, bin_name = %bin_name, version = %record.version, "installed");
        Ok(record)
    }

    fn verification_error(&self, bin_name: &BinName, missing: &'static str, log: &str) -> Error {
        warn!(provider = %self.name, bin_name = %bin_name, missing, "installed binary could not be verified");
        Error::Verification {
            provider: self.name.to_string(),
            bin_name: bin_name.to_string(),
            missing,
            search_path: self.search_path.to_string(),
            log: log.to_string(),
        }
    }

    pub fn load(&self, bin_name: &BinName) -> Result<Option<ShallowBinary>> {
        self.load_with(bin_name, &LoadOptions::default())
    }

    /// Resolves without ever installing. Absent when either the abspath or
    /// the version cannot be found.
    pub fn load_with(&self, bin_name: &BinName, opts: &LoadOptions) -> Result<Option<ShallowBinary>> {
        if opts.cache && opts.overrides.is_empty() {
            if let Some(record) = self.cache.installed(bin_name) {
                debug!(provider = %self.name, bin_name = %bin_name, "cache hit for installed binary");
                return Ok(Some(record));
            }
        }

        let Some(abspath) = self.get_abspath_with(bin_name, opts)? else {
            return Ok(None);
        };
        let Some(version) = self.get_version_with(bin_name, Some(&abspath), opts)? else {
            return Ok(None);
        };
        Ok(Some(ShallowBinary::new(
            bin_name.clone(),
            self.name.clone(),
            abspath,
            version,
        )))
    }

    pub fn load_or_install(&self, bin_name: &BinName) -> Result<ShallowBinary> {
        self.load_or_install_with(bin_name, &LoadOptions::default())
    }

    pub fn load_or_install_with(&self, bin_name: &BinName, opts: &LoadOptions) -> Result<ShallowBinary> {
        if let Some(record) = self.load_with(bin_name, opts)? {
            return Ok(record);
        }

        self.ensure_installer(bin_name)?;
        let lock = self.cache.install_lock(bin_name);
        let _guard = cache::hold(&lock);
        // Someone else may have finished installing while we waited.
        if let Some(record) = self.load_with(bin_name, opts)? {
            return Ok(record);
        }
        self.install_locked(bin_name, &opts.overrides)
    }

    /// Runs `bin` with this provider's timeout. Bare names are resolved
    /// through this provider; paths are run as given.
    pub fn exec<I, S>(&self, bin: impl AsRef<Path>, args: I, cwd: Option<&Path>) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let bin = bin.as_ref();
        let program = if bin.is_absolute() || bin.components().count() > 1 {
            bin.to_path_buf()
        } else {
            let bin_name = BinName::new(bin.to_string_lossy().into_owned())?;
            self.get_abspath(&bin_name)?
                .ok_or_else(|| Error::BinaryNotFound {
                    provider: self.name.to_string(),
                    bin_name: bin_name.to_string(),
                })?
        };

        Ok(Command::new(&program)
            .args(args)
            .current_dir_opt(cwd)
            .timeout(self.timeout)
            .output_with(self.runner.as_ref())?)
    }

    /// Runs the installer tool with the install timeout. A non-zero exit is
    /// an [`Error::InstallFailed`].
    pub fn run_installer<I, S>(&self, bin_name: &BinName, packages: &InstallArgs, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let installer = self.ensure_installer(bin_name)?;
        let output = Command::new(installer)
            .args(args)
            .timeout(self.install_timeout)
            .output_with(self.runner.as_ref())?;

        if !output.success() {
            warn!(provider = %self.name, bin_name = %bin_name, code = ?output.code, "installer exited with failure");
            return Err(Error::InstallFailed {
                provider: self.name.to_string(),
                bin_name: bin_name.to_string(),
                packages: packages.packages().to_vec(),
                code: output.code,
                stdout: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Forget everything looked up so far.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached(&self, bin_name: &BinName) -> CacheEntry {
        self.cache.entry(bin_name)
    }

    fn effective<K: Kind>(&self, bin_name: &BinName, overrides: &Overrides) -> Result<K::Func> {
        self.handlers
            .effective::<K>(self.name.as_str(), bin_name, overrides)
    }
}

/// Default `abspath` handler: search the provider's search path.
pub fn on_get_abspath(provider: &BinProvider, bin_name: &BinName) -> Result<Option<PathBuf>> {
    Ok(bin_abspath(bin_name, provider.search_path()))
}

/// Default `version` handler: run `<abspath> --version`.
pub fn on_get_version(
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

    // A match that cannot be run, or hangs, has no version to report.
    let output = match provider.exec(&abspath, ["--version"], None) {
        Ok(output) => output,
        Err(Error::Command(e)) => {
            debug!(provider = %provider.name(), bin_name = %bin_name, error = %e, "version command failed");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    let text = if output.stdout.trim().is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    Ok(Some(text))
}

/// Default `packages` handler: the package is named after the binary.
pub fn on_get_packages(_provider: &BinProvider, bin_name: &BinName) -> Result<Option<Vec<String>>> {
    Ok(Some(vec![bin_name.to_string()]))
}

/// Default `install` handler: there is nothing to run.
pub fn on_install(provider: &BinProvider, bin_name: &BinName, _packages: &InstallArgs) -> Result<String> {
    Err(Error::NotCapable {
        provider: provider.name().to_string(),
        bin_name: bin_name.to_string(),
    })
}

pub struct ProviderBuilder {
    name: ProviderName,
    installer: Option<BinName>,
    search_path: SearchPath,
    timeout: Duration,
    install_timeout: Duration,
    runner: Arc<dyn CommandRunner>,
    handlers: Handlers,
}

impl ProviderBuilder {
    /// Starts from the generic handlers: search-path lookup, `--version`,
    /// the binary name as package, and no install action.
    pub fn new(name: ProviderName) -> Self {
        Self::with_handlers(name, Handlers::builtin())
    }

    /// Starts with no handlers at all.
    pub fn bare(name: ProviderName) -> Self {
        Self::with_handlers(name, Handlers::empty())
    }

    fn with_handlers(name: ProviderName, handlers: Handlers) -> Self {
        Self {
            name,
            installer: None,
            search_path: SearchPath::empty(),
            timeout: DEFAULT_TIMEOUT,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
            runner: Arc::new(SystemRunner),
            handlers,
        }
    }

    /// Name of the package manager executable, looked up on `$PATH`.
    pub fn installer(mut self, installer: BinName) -> Self {
        self.installer = Some(installer);
        self
    }

    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Make `f` available under `name` for [`HandlerRef::Named`] lookups.
    /// Re-registering a default name such as `on_install` replaces the
    /// generic behavior.
    pub fn register<K: Kind>(mut self, name: impl Into<String>, f: K::Func) -> Self {
        K::slot_mut(&mut self.handlers).named.insert(name.into(), f);
        self
    }

    /// Set the table entry for a binary name, or `*` for every binary.
    pub fn handler<K: Kind>(mut self, key: impl Into<String>, handler: HandlerRef<K::Func>) -> Self {
        K::slot_mut(&mut self.handlers).table.insert(key, handler);
        self
    }

    pub fn fallback<K: Kind>(mut self, handler: Option<HandlerRef<K::Func>>) -> Self {
        K::slot_mut(&mut self.handlers).fallback = handler;
        self
    }

    pub fn build(self) -> BinProvider {
        let installer = match self.installer {
            Some(installer) => installer,
            None => BinName(String::from("env")),
        };
        BinProvider {
            name: self.name,
            installer,
            search_path: self.search_path,
            timeout: self.timeout,
            install_timeout: self.install_timeout,
            runner: self.runner,
            handlers: self.handlers,
            installer_abspath: OnceCell::new(),
            cache: ProviderCache::default(),
        }
    }
}
