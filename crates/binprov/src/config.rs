use std::path::{Path, PathBuf};
use std::time::Duration;

use binprov_backend::{BackendConfig, ProviderKind};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "binprov";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "BINPROV_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider names, tried in this order.
    pub providers: Vec<String>,
    pub timeout_secs: u64,
    pub install_timeout_secs: u64,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: ProviderKind::all().map(|k| k.name().to_string()).collect(),
            timeout_secs: binprov_core::DEFAULT_TIMEOUT.as_secs(),
            install_timeout_secs: binprov_core::DEFAULT_INSTALL_TIMEOUT.as_secs(),
            log_level: String::from("warn"),
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        binprov_platform::dir::user_config().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Defaults, then the TOML file if it exists, then `BINPROV_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut fig = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) {
            fig = fig.merge(Toml::file(path));
        }
        fig.merge(Env::prefixed(ENV_PREFIX)).extract()
    }

    pub fn kinds(&self) -> binprov_backend::Result<Vec<ProviderKind>> {
        self.providers.iter().map(|name| name.parse()).collect()
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::default()
            .timeout(Duration::from_secs(self.timeout_secs))
            .install_timeout(Duration::from_secs(self.install_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.providers, ["env", "pip", "npm", "apt", "brew"]);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.install_timeout_secs, 600);
        assert_eq!(settings.kinds().unwrap().first(), Some(&ProviderKind::Env));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "providers = [\"brew\", \"env\"]\ntimeout_secs = 5\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.providers, ["brew", "env"]);
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.install_timeout_secs, 600);

        let config = settings.backend_config();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_written_settings_load_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let custom = Settings {
            providers: vec![String::from("pip")],
            timeout_secs: 7,
            install_timeout_secs: 70,
            log_level: String::from("debug"),
        };
        fs::write(&path, toml::to_string(&custom).unwrap()).unwrap();
        assert_eq!(Settings::load(Some(&path)).unwrap(), custom);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let settings = Settings {
            providers: vec![String::from("env"), String::from("cargo")],
            ..Settings::default()
        };
        assert!(settings.kinds().is_err());
    }
}
