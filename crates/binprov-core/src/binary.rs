use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::handler::Overrides;
use crate::name::{BinName, ProviderName};
use crate::provider::{BinProvider, LoadOptions};
use crate::shallow::ShallowBinary;

/// A binary that may come from any of several providers, tried in order.
#[derive(Debug, Clone)]
pub struct Binary {
    name: BinName,
    providers: Vec<Arc<BinProvider>>,
    overrides: HashMap<ProviderName, Overrides>,
}

impl Binary {
    pub fn new(name: BinName) -> Self {
        Self {
            name,
            providers: Vec::new(),
            overrides: HashMap::new(),
        }
    }

    pub fn provider(mut self, provider: Arc<BinProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Arc<BinProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Handlers to use only when asking `provider` about this binary.
    pub fn overrides(mut self, provider: ProviderName, overrides: Overrides) -> Self {
        self.overrides.insert(provider, overrides);
        self
    }

    pub fn name(&self) -> &BinName {
        &self.name
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &ProviderName> {
        self.providers.iter().map(|p| p.name())
    }

    fn options_for(&self, provider: &BinProvider, cache: bool) -> LoadOptions {
        LoadOptions::new()
            .overrides(self.overrides_for(provider))
            .cache(cache)
    }

    fn overrides_for(&self, provider: &BinProvider) -> Overrides {
        self.overrides.get(provider.name()).cloned().unwrap_or_default()
    }

    pub fn load(&self) -> Result<Option<ShallowBinary>> {
        self.load_with_cache(true)
    }

    /// First provider that already has the binary.
    pub fn load_with_cache(&self, cache: bool) -> Result<Option<ShallowBinary>> {
        for provider in &self.providers {
            let opts = self.options_for(provider, cache);
            if let Some(record) = provider.load_with(&self.name, &opts)? {
                debug!(provider = %provider.name(), bin_name = %self.name, "loaded");
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// First provider that installs the binary successfully.
    pub fn install(&self) -> Result<ShallowBinary> {
        self.first_success(|provider| provider.install_with(&self.name, &self.overrides_for(provider)))
    }

    /// Loads from any provider first; only then installs, re-checking each
    /// provider under its install lock so concurrent callers install once.
    pub fn load_or_install(&self) -> Result<ShallowBinary> {
        if let Some(record) = self.load()? {
            return Ok(record);
        }
        self.first_success(|provider| {
            provider.load_or_install_with(&self.name, &self.options_for(provider, true))
        })
    }

    fn first_success<F>(&self, mut attempt: F) -> Result<ShallowBinary>
    where
        F: FnMut(&BinProvider) -> Result<ShallowBinary>,
    {
        let mut reasons = Vec::new();
        for provider in &self.providers {
            match attempt(provider) {
                Ok(record) => return Ok(record),
                Err(e) if e.is_misconfiguration() => return Err(e),
                Err(e) => {
                    warn!(provider = %provider.name(), bin_name = %self.name, error = %e, "provider could not install");
                    reasons.push(format!("{}: {e}", provider.name()));
                }
            }
        }
        if reasons.is_empty() {
            reasons.push(String::from("no providers configured"));
        }
        Err(Error::AllProvidersFailed {
            bin_name: self.name.to_string(),
            reasons,
        })
    }
}
