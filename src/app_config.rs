//! Config file discovery and loading for the binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use magnet_resolver_core::ResolverConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MAGNET_RESOLVER_CONFIG";

const CONFIG_DIR: &str = "magnet-resolver";
const CONFIG_FILE: &str = "config.toml";

/// Result of loading resolver config.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was considered, if one could be resolved.
    pub path: Option<PathBuf>,
    /// Effective configuration (defaults when no file was loaded).
    pub config: ResolverConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$MAGNET_RESOLVER_CONFIG`
/// 2. `$XDG_CONFIG_HOME/magnet-resolver/config.toml`
/// 3. `$HOME/.config/magnet-resolver/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    resolve_config_path_with(|name| env::var_os(name))
}

fn resolve_config_path_with(lookup: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

    if let Some(explicit) = non_empty(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg_config_home) = non_empty("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(CONFIG_DIR).join(CONFIG_FILE));
    }

    let home = non_empty("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(CONFIG_FILE),
    )
}

/// Loads config from `explicit` (must exist) or from the default path if present.
///
/// # Errors
///
/// Fails when an explicit file is missing, or when a file exists but cannot
/// be read, parsed or validated.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            config: ResolverConfig::default(),
            loaded_from_file: false,
        }),
    }
}

fn load_file_config(path: &Path) -> Result<ResolverConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    ResolverConfig::from_toml_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), OsString::from(value)))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_resolve_prefers_explicit_env_var() {
        let path = resolve_config_path_with(env_of(&[
            (CONFIG_ENV_VAR, "/etc/magnet.toml"),
            ("XDG_CONFIG_HOME", "/xdg"),
        ]));
        assert_eq!(path, Some(PathBuf::from("/etc/magnet.toml")));
    }

    #[test]
    fn test_resolve_uses_xdg_then_home() {
        let path = resolve_config_path_with(env_of(&[("XDG_CONFIG_HOME", "/xdg"), ("HOME", "/home/u")]));
        assert_eq!(path, Some(PathBuf::from("/xdg/magnet-resolver/config.toml")));

        let path = resolve_config_path_with(env_of(&[("XDG_CONFIG_HOME", ""), ("HOME", "/home/u")]));
        assert_eq!(
            path,
            Some(PathBuf::from("/home/u/.config/magnet-resolver/config.toml"))
        );
    }

    #[test]
    fn test_resolve_without_any_env_is_none() {
        assert_eq!(resolve_config_path_with(env_of(&[])), None);
    }

    #[test]
    fn test_load_config_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "use_forward = true\nmin_interval_ms = 0").unwrap();

        let loaded = load_config(Some(file.path())).unwrap();

        assert!(loaded.loaded_from_file);
        assert!(loaded.config.use_forward);
        assert_eq!(loaded.config.min_interval_ms, 0);
    }

    #[test]
    fn test_load_config_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_endpoint = \"ftp://example.com\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
