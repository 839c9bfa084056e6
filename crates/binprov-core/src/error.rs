use std::path::PathBuf;

use thiserror::Error;

use crate::handler::HandlerKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {kind} name {value:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("invalid search path entry {}: {reason}", path.display())]
    InvalidSearchPath { path: PathBuf, reason: &'static str },

    #[error("invalid package list {packages:?}: {reason}")]
    InvalidPackages {
        packages: Vec<String>,
        reason: &'static str,
    },

    #[error("{provider} abspath handler for {bin_name} returned {}, which is not an existing file", path.display())]
    InvalidAbspath {
        provider: String,
        bin_name: String,
        path: PathBuf,
    },

    #[error("no {kind} handler found for {bin_name} in provider {provider}")]
    HandlerMissing {
        provider: String,
        bin_name: String,
        kind: HandlerKind,
    },

    #[error("provider {provider} has no {kind} handler registered as {handler:?}")]
    UnresolvedHandler {
        provider: String,
        kind: HandlerKind,
        handler: String,
    },

    #[error("{provider} cannot install {bin_name}: installer {installer} not found in $PATH")]
    InstallerUnavailable {
        provider: String,
        bin_name: String,
        installer: String,
    },

    #[error(
        "{provider} failed to install {bin_name} (packages {packages:?}, exit code {code:?})\nstderr: {stderr}\nstdout: {stdout}"
    )]
    InstallFailed {
        provider: String,
        bin_name: String,
        packages: Vec<String>,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error(
        "{provider} installed {bin_name} but could not confirm its {missing} afterwards (search path {search_path})\ninstall log: {log}"
    )]
    Verification {
        provider: String,
        bin_name: String,
        missing: &'static str,
        search_path: String,
        log: String,
    },

    #[error("provider {provider} is read-only and cannot install {bin_name}")]
    NotCapable { provider: String, bin_name: String },

    #[error("provider {provider} cannot run {bin_name}: abspath not found (was it loaded or installed?)")]
    BinaryNotFound { provider: String, bin_name: String },

    #[error("no provider could supply {bin_name}: {}", reasons.join("; "))]
    AllProvidersFailed {
        bin_name: String,
        reasons: Vec<String>,
    },

    #[error("handler failed: {0}")]
    Handler(String),

    #[error(transparent)]
    Command(#[from] binprov_platform::Error),
}

impl Error {
    /// Failure raised from inside a custom handler.
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        Error::Handler(msg.to_string())
    }

    /// Bad names, package lists or handler tables. Surfaced as is, never
    /// folded into a provider fallback chain.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            Error::InvalidName { .. }
                | Error::InvalidSearchPath { .. }
                | Error::InvalidPackages { .. }
                | Error::HandlerMissing { .. }
                | Error::UnresolvedHandler { .. }
        )
    }
}
