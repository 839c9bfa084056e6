//! Built-in providers.
//!
//! Each backend only knows how to find its own bin directories and how to
//! drive its package manager; everything else comes from
//! [`binprov_core::BinProvider`].

pub use error::{Error, Result};
pub use kind::ProviderKind;
pub use registry::ProviderRegistry;

pub mod apt;
pub mod brew;
pub mod env;
mod error;
mod kind;
pub mod npm;
pub mod pip;
mod registry;

use std::ffi::OsStr;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use binprov_core::{DEFAULT_INSTALL_TIMEOUT, DEFAULT_TIMEOUT, ProviderBuilder};
use binprov_platform::{Command, CommandRunner, SystemRunner};

/// Settings shared by every backend, applied at construction.
#[derive(Clone)]
pub struct BackendConfig {
    pub timeout: Duration,
    pub install_timeout: Duration,
    pub runner: Arc<dyn CommandRunner>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
            runner: Arc::new(SystemRunner),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("timeout", &self.timeout)
            .field("install_timeout", &self.install_timeout)
            .finish_non_exhaustive()
    }
}

impl BackendConfig {
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

    fn apply(&self, builder: ProviderBuilder) -> ProviderBuilder {
        builder
            .timeout(self.timeout)
            .install_timeout(self.install_timeout)
            .runner(self.runner.clone())
    }

    /// Trimmed stdout of a discovery command, or `None` if it failed.
    fn query<P, S>(&self, program: P, args: &[S]) -> Option<String>
    where
        P: AsRef<OsStr>,
        S: AsRef<OsStr>,
    {
        let cmd = Command::new(program).args(args).timeout(self.timeout);
        match cmd.output_with(self.runner.as_ref()) {
            Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
            Ok(out) => {
                tracing::debug!(cmd = %cmd.request().display(), code = ?out.code, "discovery command failed");
                None
            }
            Err(e) => {
                tracing::debug!(cmd = %cmd.request().display(), error = %e, "discovery command failed");
                None
            }
        }
    }
}

