use std::fmt;
use std::sync::Arc;

use binprov_core::{BinName, BinProvider, Binary};

use crate::error::{Error, Result};
use crate::{BackendConfig, ProviderKind};

/// Providers by name, kept in registration order.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<BinProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every kind in `kinds`, in order.
    pub fn with_kinds(
        kinds: impl IntoIterator<Item = ProviderKind>,
        config: &BackendConfig,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for kind in kinds {
            registry.register(kind.build(config)?);
        }
        Ok(registry)
    }

    /// A provider with the same name replaces the old one in place.
    pub fn register(&mut self, provider: BinProvider) {
        self.register_arc(Arc::new(provider));
    }

    pub fn register_arc(&mut self, provider: Arc<BinProvider>) {
        match self
            .providers
            .iter_mut()
            .find(|p| p.name() == provider.name())
        {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<BinProvider>> {
        self.providers.iter().find(|p| p.name().as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BinProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name().as_str()).collect()
    }

    /// The named providers in the given order; every provider when `names`
    /// is empty.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<BinProvider>>> {
        if names.is_empty() {
            return Ok(self.providers.clone());
        }
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| Error::NotRegistered(name.to_string()))
            })
            .collect()
    }

    pub fn binary<S: AsRef<str>>(&self, name: BinName, providers: &[S]) -> Result<Binary> {
        Ok(Binary::new(name).providers(self.select(providers)?))
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
