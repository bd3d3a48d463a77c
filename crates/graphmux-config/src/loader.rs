//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.graphmux/config.toml`
//! 2. Local config: `.graphmux/config.toml` (in the working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{ConfigOverrides, MuxConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".graphmux";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".graphmux";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.graphmux`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<MuxConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.graphmux`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a directory.
    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<MuxConfig, ConfigError> {
        let mut config = MuxConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load a single explicit config file, bypassing global and local lookup.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<MuxConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(MuxConfig::default(), load_config_file(path)?);

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<MuxConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a directory.
    pub fn load_local(&self, root: &Path) -> Result<Option<MuxConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the global config file.
    pub fn save_global(&self, config: &MuxConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Save configuration to the local config file for a directory.
    pub fn save_local(&self, root: &Path, config: &MuxConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.graphmux/config.toml` with default configuration.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        init_config_dir(global_dir)
    }

    /// Initialize local configuration for a directory.
    ///
    /// Creates `.graphmux/config.toml` with default configuration. An
    /// existing file is left untouched.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::write(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &MuxConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<MuxConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &MuxConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write(parent, e))?;
        }
    }

    let content = config.to_toml()?;
    std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: MuxConfig, overlay: MuxConfig) -> MuxConfig {
    MuxConfig {
        cache: merge_cache(base.cache, overlay.cache),
        locking: crate::LockingConfig {
            checked: base.locking.checked || overlay.locking.checked,
        },
        logging: merge_logging(base.logging, overlay.logging),
        providers: merge_providers(base.providers, overlay.providers),
    }
}

fn merge_cache(base: crate::CacheConfig, overlay: crate::CacheConfig) -> crate::CacheConfig {
    crate::CacheConfig {
        retain_capacity: if overlay.retain_capacity != crate::DEFAULT_RETAIN_CAPACITY {
            overlay.retain_capacity
        } else {
            base.retain_capacity
        },
    }
}

/// Merge logging config.
fn merge_logging(
    base: crate::LoggingConfig,
    overlay: crate::LoggingConfig,
) -> crate::LoggingConfig {
    crate::LoggingConfig {
        level: if overlay.level != "info" {
            overlay.level
        } else {
            base.level
        },
        format: overlay.format,
    }
}

/// Overlay providers replace base providers of the same name; the rest append.
///
/// Only names from `base` are replaced. Repeats within one file are kept so
/// validation can report them.
fn merge_providers(
    base: Vec<crate::ProviderConfig>,
    overlay: Vec<crate::ProviderConfig>,
) -> Vec<crate::ProviderConfig> {
    let base_len = base.len();
    let mut merged = base;
    for provider in overlay {
        match merged[..base_len].iter_mut().find(|p| p.name == provider.name) {
            Some(existing) => *existing = provider,
            None => merged.push(provider),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_config(content: &str, dir: &Path, filename: &str) -> PathBuf {
        let config_dir = dir.join(".graphmux");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(filename);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn provider_names(config: &MuxConfig) -> Vec<(&str, i32)> {
        config
            .providers
            .iter()
            .map(|p| (p.name.as_str(), p.weight))
            .collect()
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, MuxConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_test_config(
            r#"
            [cache]
            retain_capacity = 16

            [[providers]]
            name = "local"
            weight = 4
            "#,
            temp.path(),
            "config.toml",
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.cache.retain_capacity, 16);
        assert_eq!(provider_names(&config), vec![("local", 4)]);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            r#"
            [logging]
            level = "debug"

            [cache]
            retain_capacity = 32

            [[providers]]
            name = "shared"
            weight = 1

            [[providers]]
            name = "global-only"
            weight = 2
            "#,
        )
        .unwrap();

        create_test_config(
            r#"
            [cache]
            retain_capacity = 64

            [[providers]]
            name = "shared"
            weight = 10

            [[providers]]
            name = "local-only"
            "#,
            temp.path(),
            "config.toml",
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.cache.retain_capacity, 64);
        // Global value survives when local leaves it at the default
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            provider_names(&config),
            vec![("shared", 10), ("global-only", 2), ("local-only", 0)]
        );
    }

    #[test]
    fn test_cli_overrides_all() {
        let temp = TempDir::new().unwrap();
        create_test_config(
            r#"
            [logging]
            level = "warn"
            "#,
            temp.path(),
            "config.toml",
        );

        let overrides = ConfigOverrides {
            retain_capacity: Some(3),
            log_level: Some("trace".to_string()),
            log_format: Some(LogFormat::Json),
            ..Default::default()
        };

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.cache.retain_capacity, 3);
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_file_skips_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        std::fs::create_dir_all(&global_dir).unwrap();
        std::fs::write(
            global_dir.join("config.toml"),
            "[[providers]]\nname = \"global\"\n",
        )
        .unwrap();

        let explicit = temp.path().join("explicit.toml");
        std::fs::write(&explicit, "[locking]\nchecked = true\n").unwrap();

        let loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load_file(&explicit, None).unwrap();

        assert!(config.locking.checked);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_repeated_provider_in_one_file_is_kept() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("twins.toml");
        std::fs::write(
            &explicit,
            "[[providers]]\nname = \"twin\"\nweight = 1\n\n[[providers]]\nname = \"twin\"\nweight = 2\n",
        )
        .unwrap();

        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let config = loader.load_file(&explicit, None).unwrap();

        assert_eq!(provider_names(&config), vec![("twin", 1), ("twin", 2)]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate provider 'twin'"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader
            .load_file(&temp.path().join("nope.toml"), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp = TempDir::new().unwrap();
        let path = create_test_config("[cache\n", temp.path(), "config.toml");

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = MuxConfig::default();
        config.cache.retain_capacity = 12;
        config.providers.push(crate::ProviderConfig {
            name: "saved".to_string(),
            weight: 9,
            ..Default::default()
        });

        loader.save_local(temp.path(), &config).unwrap();

        let loaded = loader.load_local(temp.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let path = loader.init_local(temp.path()).unwrap();
        assert!(path.exists());
        assert_eq!(path, loader.local_config_path(temp.path()));

        // Existing file is kept
        std::fs::write(&path, "[cache]\nretain_capacity = 5\n").unwrap();
        loader.init_local(temp.path()).unwrap();
        let loaded = loader.load_local(temp.path()).unwrap().unwrap();
        assert_eq!(loaded.cache.retain_capacity, 5);
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        std::fs::create_dir_all(&global_dir).unwrap();
        let global_path = global_dir.join("config.toml");
        std::fs::write(&global_path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "debug");

        std::fs::write(&global_path, "[logging]\nlevel = \"error\"\n").unwrap();
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "debug");

        loader.clear_cache();
        assert_eq!(loader.load_global().unwrap().unwrap().logging.level, "error");
    }
}
