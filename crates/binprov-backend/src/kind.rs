use std::fmt;
use std::str::FromStr;

use binprov_core::BinProvider;

use crate::error::{Error, Result};
use crate::{BackendConfig, apt, brew, env, npm, pip};

/// The built-in providers, in their default lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Env,
    Pip,
    Npm,
    Apt,
    Brew,
}

impl ProviderKind {
    pub fn all() -> impl Iterator<Item = ProviderKind> {
        [
            ProviderKind::Env,
            ProviderKind::Pip,
            ProviderKind::Npm,
            ProviderKind::Apt,
            ProviderKind::Brew,
        ]
        .into_iter()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Env => env::NAME,
            ProviderKind::Pip => pip::NAME,
            ProviderKind::Npm => npm::NAME,
            ProviderKind::Apt => apt::NAME,
            ProviderKind::Brew => brew::NAME,
        }
    }

    /// Runs the backend's discovery and builds the provider.
    pub fn build(&self, config: &BackendConfig) -> Result<BinProvider> {
        let provider = match self {
            ProviderKind::Env => env::provider(config)?,
            ProviderKind::Pip => pip::provider(config)?,
            ProviderKind::Npm => npm::provider(config)?,
            ProviderKind::Apt => apt::provider(config)?,
            ProviderKind::Brew => brew::provider(config)?,
        };
        tracing::debug!(provider = %provider.name(), search_path = %provider.search_path(), "provider ready");
        Ok(provider)
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(ProviderKind::Env),
            "pip" => Ok(ProviderKind::Pip),
            "npm" => Ok(ProviderKind::Npm),
            "apt" => Ok(ProviderKind::Apt),
            "brew" => Ok(ProviderKind::Brew),
            _ => Err(Error::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("env".parse::<ProviderKind>().unwrap(), ProviderKind::Env);
        assert_eq!(" Brew ".parse::<ProviderKind>().unwrap(), ProviderKind::Brew);
        assert!(matches!(
            "cargo".parse::<ProviderKind>(),
            Err(Error::UnknownProvider(name)) if name == "cargo"
        ));
    }

    #[test]
    fn test_all_round_trips_through_name() {
        for kind in ProviderKind::all() {
            assert_eq!(kind.name().parse::<ProviderKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(ProviderKind::all().count(), 5);
    }
}
