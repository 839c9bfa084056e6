use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use binprov_version::SemVer;

use crate::name::BinName;
use crate::shallow::ShallowBinary;

/// What a provider currently remembers about one binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub abspath: Option<PathBuf>,
    pub version: Option<SemVer>,
    pub installed: Option<ShallowBinary>,
}

impl CacheEntry {
    pub fn is_empty(&self) -> bool {
        self.abspath.is_none() && self.version.is_none() && self.installed.is_none()
    }
}

#[derive(Debug, Default)]
struct Maps {
    abspath: HashMap<BinName, PathBuf>,
    version: HashMap<BinName, SemVer>,
    installed: HashMap<BinName, ShallowBinary>,
}

/// Lookup memo owned by one provider. Entries live until [`clear`] is called.
///
/// [`clear`]: ProviderCache::clear
#[derive(Debug, Default)]
pub(crate) struct ProviderCache {
    maps: Mutex<Maps>,
    install_locks: Mutex<HashMap<BinName, Arc<Mutex<()>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProviderCache {
    pub fn abspath(&self, bin_name: &BinName) -> Option<PathBuf> {
        lock(&self.maps).abspath.get(bin_name).cloned()
    }

    pub fn set_abspath(&self, bin_name: &BinName, abspath: PathBuf) {
        lock(&self.maps).abspath.insert(bin_name.clone(), abspath);
    }

    pub fn version(&self, bin_name: &BinName) -> Option<SemVer> {
        lock(&self.maps).version.get(bin_name).cloned()
    }

    pub fn set_version(&self, bin_name: &BinName, version: SemVer) {
        lock(&self.maps).version.insert(bin_name.clone(), version);
    }

    pub fn installed(&self, bin_name: &BinName) -> Option<ShallowBinary> {
        lock(&self.maps).installed.get(bin_name).cloned()
    }

    pub fn set_installed(&self, bin_name: &BinName, record: ShallowBinary) {
        lock(&self.maps).installed.insert(bin_name.clone(), record);
    }

    pub fn entry(&self, bin_name: &BinName) -> CacheEntry {
        let maps = lock(&self.maps);
        CacheEntry {
            abspath: maps.abspath.get(bin_name).cloned(),
            version: maps.version.get(bin_name).cloned(),
            installed: maps.installed.get(bin_name).cloned(),
        }
    }

    pub fn clear(&self) {
        let mut maps = lock(&self.maps);
        maps.abspath.clear();
        maps.version.clear();
        maps.installed.clear();
    }

    /// Serializes installs of the same binary name.
    pub fn install_lock(&self, bin_name: &BinName) -> Arc<Mutex<()>> {
        lock(&self.install_locks)
            .entry(bin_name.clone())
            .or_default()
            .clone()
    }
}

/// Holds the per-name install lock until dropped.
pub(crate) fn hold(lock_ref: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock(lock_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(name: &str) -> BinName {
        BinName::new(name).unwrap()
    }

    #[test]
    fn test_entries_are_per_name() {
        let cache = ProviderCache::default();
        cache.set_abspath(&bin("ls"), PathBuf::from("/usr/bin/ls"));
        cache.set_version(&bin("ls"), SemVer::new(9, 1, 0));

        let ls = cache.entry(&bin("ls"));
        assert_eq!(ls.abspath, Some(PathBuf::from("/usr/bin/ls")));
        assert_eq!(ls.version, Some(SemVer::new(9, 1, 0)));
        assert!(ls.installed.is_none());
        assert!(cache.entry(&bin("cat")).is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = ProviderCache::default();
        cache.set_abspath(&bin("ls"), PathBuf::from("/usr/bin/ls"));
        cache.clear();
        assert!(cache.abspath(&bin("ls")).is_none());
    }

    #[test]
    fn test_install_lock_shared_per_name() {
        let cache = ProviderCache::default();
        let a = cache.install_lock(&bin("wget"));
        let b = cache.install_lock(&bin("wget"));
        let c = cache.install_lock(&bin("curl"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
