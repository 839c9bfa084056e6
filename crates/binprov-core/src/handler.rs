//! Handler references, per-kind lookup tables and the override chain.
//!
//! A provider answers four questions about a binary (where is it, what
//! version is it, which packages provide it, how to install it), each through
//! a handler of the matching kind. Handlers are registered on the provider
//! either directly or under a name, and are picked per call by walking:
//!
//! 1. the caller's [`Overrides`]
//! 2. the provider's entry for the binary name
//! 3. the provider's `*` entry
//! 4. the provider's fallback for the kind

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::name::{BinName, InstallArgs};
use crate::provider::BinProvider;

/// Key matching every binary in a [`HandlerTable`].
pub const WILDCARD: &str = "*";

pub type AbspathFn = Arc<dyn Fn(&BinProvider, &BinName) -> Result<Option<PathBuf>> + Send + Sync>;
/// Returns raw `--version` style text; parsing is left to the provider.
pub type VersionFn =
    Arc<dyn Fn(&BinProvider, &BinName, Option<&Path>) -> Result<Option<String>> + Send + Sync>;
pub type PackagesFn =
    Arc<dyn Fn(&BinProvider, &BinName) -> Result<Option<Vec<String>>> + Send + Sync>;
/// Returns the install log.
pub type InstallFn =
    Arc<dyn Fn(&BinProvider, &BinName, &InstallArgs) -> Result<String> + Send + Sync>;

pub fn abspath_fn<F>(f: F) -> AbspathFn
where
    F: Fn(&BinProvider, &BinName) -> Result<Option<PathBuf>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn version_fn<F>(f: F) -> VersionFn
where
    F: Fn(&BinProvider, &BinName, Option<&Path>) -> Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn packages_fn<F>(f: F) -> PackagesFn
where
    F: Fn(&BinProvider, &BinName) -> Result<Option<Vec<String>>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn install_fn<F>(f: F) -> InstallFn
where
    F: Fn(&BinProvider, &BinName, &InstallArgs) -> Result<String> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Abspath,
    Version,
    Packages,
    Install,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Abspath => "abspath",
            HandlerKind::Version => "version",
            HandlerKind::Packages => "packages",
            HandlerKind::Install => "install",
        }
    }

    /// Name the built-in handler of this kind is registered under.
    pub fn default_name(&self) -> &'static str {
        match self {
            HandlerKind::Abspath => "on_get_abspath",
            HandlerKind::Version => "on_get_version",
            HandlerKind::Packages => "on_get_packages",
            HandlerKind::Install => "on_install",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either the handler itself or the name it is registered under.
#[derive(Clone)]
pub enum HandlerRef<F> {
    Direct(F),
    Named(String),
}

impl<F> HandlerRef<F> {
    pub fn named(name: impl Into<String>) -> Self {
        HandlerRef::Named(name.into())
    }
}

impl<F> fmt::Debug for HandlerRef<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Direct(_) => f.write_str("Direct(..)"),
            HandlerRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Binary name (or [`WILDCARD`]) to handler.
#[derive(Clone)]
pub struct HandlerTable<F>(HashMap<String, HandlerRef<F>>);

impl<F> HandlerTable<F> {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, handler: HandlerRef<F>) {
        self.0.insert(key.into(), handler);
    }

    pub fn get(&self, key: &str) -> Option<&HandlerRef<F>> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<HandlerRef<F>> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<F> Default for HandlerTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> fmt::Debug for HandlerTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// One layer of the override chain.
pub trait HandlerLookup<F> {
    fn lookup(&self, bin_name: &BinName) -> Option<HandlerRef<F>>;
}

/// Name-independent layer: a per-call override or a fallback.
impl<F: Clone> HandlerLookup<F> for Option<&HandlerRef<F>> {
    fn lookup(&self, _bin_name: &BinName) -> Option<HandlerRef<F>> {
        self.cloned()
    }
}

pub struct PerBinary<'a, F>(pub &'a HandlerTable<F>);

impl<F: Clone> HandlerLookup<F> for PerBinary<'_, F> {
    fn lookup(&self, bin_name: &BinName) -> Option<HandlerRef<F>> {
        self.0.get(bin_name.as_str()).cloned()
    }
}

pub struct Wildcard<'a, F>(pub &'a HandlerTable<F>);

impl<F: Clone> HandlerLookup<F> for Wildcard<'_, F> {
    fn lookup(&self, _bin_name: &BinName) -> Option<HandlerRef<F>> {
        self.0.get(WILDCARD).cloned()
    }
}

/// Asks `primary`, then `fallback`.
pub struct Chain<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<F, A, B> HandlerLookup<F> for Chain<A, B>
where
    A: HandlerLookup<F>,
    B: HandlerLookup<F>,
{
    fn lookup(&self, bin_name: &BinName) -> Option<HandlerRef<F>> {
        self.primary
            .lookup(bin_name)
            .or_else(|| self.fallback.lookup(bin_name))
    }
}

/// Everything a provider knows about one handler kind.
pub struct KindSlot<F> {
    pub table: HandlerTable<F>,
    pub named: HashMap<String, F>,
    pub fallback: Option<HandlerRef<F>>,
}

impl<F> KindSlot<F> {
    fn empty() -> Self {
        Self {
            table: HandlerTable::new(),
            named: HashMap::new(),
            fallback: None,
        }
    }

    /// Registers `builtin` under `name`, as the `*` entry and as fallback.
    fn with_builtin(name: &str, builtin: F) -> Self {
        let mut slot = Self::empty();
        slot.named.insert(name.to_string(), builtin);
        slot.table.insert(WILDCARD, HandlerRef::named(name));
        slot.fallback = Some(HandlerRef::named(name));
        slot
    }
}

impl<F> fmt::Debug for KindSlot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindSlot")
            .field("table", &self.table)
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// The four handler kinds of one provider.
#[derive(Debug)]
pub struct Handlers {
    pub abspath: KindSlot<AbspathFn>,
    pub version: KindSlot<VersionFn>,
    pub packages: KindSlot<PackagesFn>,
    pub install: KindSlot<InstallFn>,
}

impl Handlers {
    /// No handlers at all.
    pub fn empty() -> Self {
        Self {
            abspath: KindSlot::empty(),
            version: KindSlot::empty(),
            packages: KindSlot::empty(),
            install: KindSlot::empty(),
        }
    }

    /// The generic handlers every provider starts from.
    pub fn builtin() -> Self {
        Self {
            abspath: KindSlot::with_builtin(
                HandlerKind::Abspath.default_name(),
                abspath_fn(crate::provider::on_get_abspath),
            ),
            version: KindSlot::with_builtin(
                HandlerKind::Version.default_name(),
                version_fn(crate::provider::on_get_version),
            ),
            packages: KindSlot::with_builtin(
                HandlerKind::Packages.default_name(),
                packages_fn(crate::provider::on_get_packages),
            ),
            install: KindSlot::with_builtin(
                HandlerKind::Install.default_name(),
                install_fn(crate::provider::on_install),
            ),
        }
    }

    /// Effective handler of kind `K` for `bin_name`.
    pub(crate) fn effective<K: Kind>(
        &self,
        provider: &str,
        bin_name: &BinName,
        overrides: &Overrides,
    ) -> Result<K::Func> {
        let slot = K::slot(self);
        let chain = Chain::new(
            K::overridden(overrides),
            Chain::new(
                PerBinary(&slot.table),
                Chain::new(Wildcard(&slot.table), slot.fallback.as_ref()),
            ),
        );

        let handler = chain
            .lookup(bin_name)
            .ok_or_else(|| Error::HandlerMissing {
                provider: provider.to_string(),
                bin_name: bin_name.to_string(),
                kind: K::KIND,
            })?;
        self.resolve::<K>(provider, handler)
    }

    /// Turns a reference into something callable.
    pub fn resolve<K: Kind>(&self, provider: &str, handler: HandlerRef<K::Func>) -> Result<K::Func> {
        match handler {
            HandlerRef::Direct(f) => Ok(f),
            HandlerRef::Named(name) => {
                K::slot(self)
                    .named
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| Error::UnresolvedHandler {
                        provider: provider.to_string(),
                        kind: K::KIND,
                        handler: name,
                    })
            }
        }
    }
}

/// Type-level handle on one handler kind.
pub trait Kind {
    type Func: Clone;
    const KIND: HandlerKind;

    fn slot(handlers: &Handlers) -> &KindSlot<Self::Func>;
    fn slot_mut(handlers: &mut Handlers) -> &mut KindSlot<Self::Func>;
    fn overridden(overrides: &Overrides) -> Option<&HandlerRef<Self::Func>>;
}

pub enum Abspath {}
pub enum Version {}
pub enum Packages {}
pub enum Install {}

impl Kind for Abspath {
    type Func = AbspathFn;
    const KIND: HandlerKind = HandlerKind::Abspath;

    fn slot(handlers: &Handlers) -> &KindSlot<AbspathFn> {
        &handlers.abspath
    }
    fn slot_mut(handlers: &mut Handlers) -> &mut KindSlot<AbspathFn> {
        &mut handlers.abspath
    }
    fn overridden(overrides: &Overrides) -> Option<&HandlerRef<AbspathFn>> {
        overrides.abspath.as_ref()
    }
}

impl Kind for Version {
    type Func = VersionFn;
    const KIND: HandlerKind = HandlerKind::Version;

    fn slot(handlers: &Handlers) -> &KindSlot<VersionFn> {
        &handlers.version
    }
    fn slot_mut(handlers: &mut Handlers) -> &mut KindSlot<VersionFn> {
        &mut handlers.version
    }
    fn overridden(overrides: &Overrides) -> Option<&HandlerRef<VersionFn>> {
        overrides.version.as_ref()
    }
}

impl Kind for Packages {
    type Func = PackagesFn;
    const KIND: HandlerKind = HandlerKind::Packages;

    fn slot(handlers: &Handlers) -> &KindSlot<PackagesFn> {
        &handlers.packages
    }
    fn slot_mut(handlers: &mut Handlers) -> &mut KindSlot<PackagesFn> {
        &mut handlers.packages
    }
    fn overridden(overrides: &Overrides) -> Option<&HandlerRef<PackagesFn>> {
        overrides.packages.as_ref()
    }
}

impl Kind for Install {
    type Func = InstallFn;
    const KIND: HandlerKind = HandlerKind::Install;

    fn slot(handlers: &Handlers) -> &KindSlot<InstallFn> {
        &handlers.install
    }
    fn slot_mut(handlers: &mut Handlers) -> &mut KindSlot<InstallFn> {
        &mut handlers.install
    }
    fn overridden(overrides: &Overrides) -> Option<&HandlerRef<InstallFn>> {
        overrides.install.as_ref()
    }
}

/// Call-scoped handlers that win over anything the provider has registered.
#[derive(Clone, Default)]
pub struct Overrides {
    pub abspath: Option<HandlerRef<AbspathFn>>,
    pub version: Option<HandlerRef<VersionFn>>,
    pub packages: Option<HandlerRef<PackagesFn>>,
    pub install: Option<HandlerRef<InstallFn>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abspath<F>(mut self, f: F) -> Self
    where
        F: Fn(&BinProvider, &BinName) -> Result<Option<PathBuf>> + Send + Sync + 'static,
    {
        self.abspath = Some(HandlerRef::Direct(abspath_fn(f)));
        self
    }

    pub fn version<F>(mut self, f: F) -> Self
    where
        F: Fn(&BinProvider, &BinName, Option<&Path>) -> Result<Option<String>> + Send + Sync + 'static,
    {
        self.version = Some(HandlerRef::Direct(version_fn(f)));
        self
    }

    pub fn packages<F>(mut self, f: F) -> Self
    where
        F: Fn(&BinProvider, &BinName) -> Result<Option<Vec<String>>> + Send + Sync + 'static,
    {
        self.packages = Some(HandlerRef::Direct(packages_fn(f)));
        self
    }

    pub fn install<F>(mut self, f: F) -> Self
    where
        F: Fn(&BinProvider, &BinName, &InstallArgs) -> Result<String> + Send + Sync + 'static,
    {
        self.install = Some(HandlerRef::Direct(install_fn(f)));
        self
    }

    /// Point a kind at a handler the provider registered by name.
    pub fn named(mut self, kind: HandlerKind, name: impl Into<String>) -> Self {
        let name = name.into();
        match kind {
            HandlerKind::Abspath => self.abspath = Some(HandlerRef::Named(name)),
            HandlerKind::Version => self.version = Some(HandlerRef::Named(name)),
            HandlerKind::Packages => self.packages = Some(HandlerRef::Named(name)),
            HandlerKind::Install => self.install = Some(HandlerRef::Named(name)),
        }
        self
    }

    pub fn has(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Abspath => self.abspath.is_some(),
            HandlerKind::Version => self.version.is_some(),
            HandlerKind::Packages => self.packages.is_some(),
            HandlerKind::Install => self.install.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.abspath.is_none()
            && self.version.is_none()
            && self.packages.is_none()
            && self.install.is_none()
    }
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("abspath", &self.abspath)
            .field("version", &self.version)
            .field("packages", &self.packages)
            .field("install", &self.install)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Option<HandlerRef<&'static str>>);

    impl HandlerLookup<&'static str> for Fixed {
        fn lookup(&self, bin_name: &BinName) -> Option<HandlerRef<&'static str>> {
            if bin_name == self.0 { self.1.clone() } else { None }
        }
    }

    fn bin(name: &str) -> BinName {
        BinName::new(name).unwrap()
    }

    fn direct(r: Option<HandlerRef<&'static str>>) -> Option<&'static str> {
        match r {
            Some(HandlerRef::Direct(f)) => Some(f),
            _ => None,
        }
    }

    #[test]
    fn test_chain_falls_through_in_order() {
        let chain = Chain::new(
            Fixed("a", Some(HandlerRef::Direct("first"))),
            Chain::new(
                Fixed("b", Some(HandlerRef::Direct("second"))),
                Fixed("a", Some(HandlerRef::Direct("shadowed"))),
            ),
        );
        assert_eq!(direct(chain.lookup(&bin("a"))), Some("first"));
        assert_eq!(direct(chain.lookup(&bin("b"))), Some("second"));
        assert!(chain.lookup(&bin("c")).is_none());
    }

    #[test]
    fn test_table_layers() {
        let mut table = HandlerTable::new();
        table.insert("*", HandlerRef::Direct("any"));
        table.insert("wget", HandlerRef::Direct("wget"));

        let chain = Chain::new(PerBinary(&table), Wildcard(&table));
        assert_eq!(direct(chain.lookup(&bin("wget"))), Some("wget"));
        assert_eq!(direct(chain.lookup(&bin("curl"))), Some("any"));
    }

    #[test]
    fn test_option_layer_ignores_name() {
        let fallback = HandlerRef::named("on_get_abspath");
        let layer = Some(&fallback);
        assert!(matches!(
            HandlerLookup::<&'static str>::lookup(&layer, &bin("x")),
            Some(HandlerRef::Named(n)) if n == "on_get_abspath"
        ));
        let none: Option<&HandlerRef<&'static str>> = None;
        assert!(none.lookup(&bin("x")).is_none());
    }

    #[test]
    fn test_builtin_handlers_registered_under_default_names() {
        let handlers = Handlers::builtin();
        for (kind, keys) in [
            (HandlerKind::Abspath, handlers.abspath.named.keys().collect::<Vec<_>>()),
            (HandlerKind::Version, handlers.version.named.keys().collect()),
            (HandlerKind::Packages, handlers.packages.named.keys().collect()),
            (HandlerKind::Install, handlers.install.named.keys().collect()),
        ] {
            assert_eq!(keys, vec![kind.default_name()]);
        }
        assert!(handlers.abspath.table.get(WILDCARD).is_some());
        assert!(handlers.install.fallback.is_some());
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let handlers = Handlers::builtin();
        let err = match handlers.resolve::<Abspath>("env", HandlerRef::named("get_nothing")) {
            Err(e) => e,
            Ok(_) => panic!("resolved an unregistered handler"),
        };
        assert!(matches!(err, Error::UnresolvedHandler { ref handler, .. } if handler == "get_nothing"));
    }

    #[test]
    fn test_empty_handlers_report_missing() {
        let handlers = Handlers::empty();
        let err = match handlers.effective::<Version>("bare", &bin("ls"), &Overrides::new()) {
            Err(e) => e,
            Ok(_) => panic!("found a handler in an empty registry"),
        };
        assert!(matches!(
            err,
            Error::HandlerMissing { kind: HandlerKind::Version, ref bin_name, .. } if bin_name == "ls"
        ));
    }

    #[test]
    fn test_overrides_builder() {
        let overrides = Overrides::new()
            .abspath(|_, _| Ok(None))
            .named(HandlerKind::Install, "on_install");
        assert!(overrides.has(HandlerKind::Abspath));
        assert!(overrides.has(HandlerKind::Install));
        assert!(!overrides.has(HandlerKind::Version));
        assert!(!overrides.is_empty());
        assert!(Overrides::new().is_empty());
    }
}
