//! Locate, verify and install external command-line binaries.
//!
//! A [`BinProvider`] owns a search path, an installer tool and four kinds of
//! handlers (abspath, version, packages, install). Callers ask it to `load`,
//! `install` or `load_or_install` a binary and get back a [`ShallowBinary`]
//! with the absolute path and parsed version.

pub use binary::Binary;
pub use binprov_version::SemVer;
pub use cache::CacheEntry;
pub use error::{Error, Result};
pub use handler::{HandlerKind, HandlerRef, Overrides};
pub use name::{BinName, InstallArgs, ProviderName};
pub use provider::{
    BinProvider, DEFAULT_INSTALL_TIMEOUT, DEFAULT_TIMEOUT, LoadOptions, ProviderBuilder,
};
pub use search::{BinDir, SearchPath, bin_abspath, bin_abspaths};
pub use shallow::ShallowBinary;

mod binary;
mod cache;
mod error;
pub mod handler;
mod name;
pub mod provider;
mod search;
mod shallow;
