use std::env;
use std::path::{Path, PathBuf};

pub fn user_home() -> Option<PathBuf> {
    home::home_dir()
}

pub fn user_config() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var_os("APPDATA").map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        user_home().map(|p| p.join("Library/Application Support"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| user_home().map(|p| p.join(".config")))
    }
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match user_home() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// `~` expansion followed by joining onto the current directory when relative.
/// Symlinks are left alone.
pub fn absolute(path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        return expanded;
    }
    env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home_plain_path_untouched() {
        assert_eq!(expand_home(Path::new("/usr/bin")), PathBuf::from("/usr/bin"));
        assert_eq!(expand_home(Path::new("a/~")), PathBuf::from("a/~"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = user_home() {
            assert_eq!(expand_home(Path::new("~")), home);
            assert_eq!(expand_home(Path::new("~/.local/bin")), home.join(".local/bin"));
        }
    }

    #[test]
    fn test_absolute_joins_cwd() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(absolute(Path::new("bin")), cwd.join("bin"));
        assert!(absolute(Path::new("/tmp")).is_absolute());
    }

    #[test]
    fn test_user_config_platform_specific() {
        let config = user_config();
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            if std::env::var_os("XDG_CONFIG_HOME").is_none() {
                assert!(config.is_none() || config.unwrap().to_string_lossy().contains(".config"));
            }
        }
        #[cfg(any(target_os = "windows", target_os = "macos"))]
        {
            let _ = config;
        }
    }
}
