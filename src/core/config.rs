//! Configuration module for the file organizer
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\file_organizer\config.toml
//! - Linux: ~/.config/file_organizer/config.toml
//! - macOS: ~/Library/Application Support/file_organizer/config.toml

use crate::core::category::{Category, CategoryMap};
use crate::core::retention::KeepPolicy;
use crate::duplicate::detector::DuplicateConfig;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "file_organizer";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config files looked up in the current directory, in order
const LOCAL_CONFIG_FILES: [&str; 2] = ["./config.toml", "./file_organizer.toml"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Creates the config directory and writes the default config template.
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", config_path.to_str().unwrap_or("")])
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Organize settings
    pub organize: OrganizeConfig,

    /// Category map and destination settings
    pub categories: CategoriesConfig,

    /// Duplicate detection settings
    pub duplicates: DuplicatesConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Organize configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    /// Directory to organize (empty = the Downloads folder)
    pub source_directory: PathBuf,

    /// Files the organizer must leave alone
    pub skip_paths: Vec<PathBuf>,

    /// Only show what would be moved
    pub dry_run: bool,
}

/// Category configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// Category name -> destination directory
    pub destinations: BTreeMap<String, PathBuf>,

    /// Extension -> category name, layered over the built-in table
    pub extra_extensions: BTreeMap<String, String>,
}

/// Duplicate detection configuration
///
/// Uses SHA256 hashing for exact-match duplicate detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    /// Folders to scan when none are given on the command line
    pub roots: Vec<PathBuf>,

    /// Which copy to keep when cleaning
    pub keep: KeepPolicy,

    /// Follow symbolic links while scanning
    pub follow_symlinks: bool,

    /// Hashing threads (0 = one per core)
    pub threads: usize,

    /// Minimum file size in bytes (0 = no minimum)
    pub min_file_size: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./file_organizer.log"),
        }
    }
}

impl CategoriesConfig {
    /// Built-in category map with the configured extensions merged in
    pub fn category_map(&self) -> CategoryMap {
        CategoryMap::with_overrides(
            self.extra_extensions
                .iter()
                .map(|(ext, name)| (ext.as_str(), Category::from_name(name))),
        )
    }

    /// Destination overrides keyed by category.
    ///
    /// Entries naming an unknown category are ignored with a warning.
    pub fn destination_overrides(&self) -> Vec<(Category, PathBuf)> {
        self.destinations
            .iter()
            .filter_map(|(name, dir)| {
                let category = Category::ALL
                    .into_iter()
                    .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()));
                if category.is_none() {
                    warn!("Ignoring destination for unknown category '{}'", name);
                }
                category.map(|c| (c, dir.clone()))
            })
            .collect()
    }
}

impl DuplicatesConfig {
    /// Convert to the duplicate detector's config format
    pub fn to_detector_config(&self) -> DuplicateConfig {
        DuplicateConfig::new()
            .with_follow_symlinks(self.follow_symlinks)
            .with_min_size(self.min_file_size)
            .with_threads(self.threads)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml (current directory - for development/override)
    /// 2. ./file_organizer.toml (current directory - alternative name)
    /// 3. Standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        for path in LOCAL_CONFIG_FILES.iter().map(PathBuf::from) {
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                return Self::load(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Get the path where the config file is (or would be) located.
    ///
    /// Returns the first existing config file path, or the standard location if none exists.
    pub fn get_active_config_path() -> PathBuf {
        for path in LOCAL_CONFIG_FILES.iter().map(PathBuf::from) {
            if path.exists() {
                return path;
            }
        }

        get_config_path().unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILES[0]))
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::WriteError(path.as_ref().to_path_buf(), e.to_string()))?;

        Ok(())
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open config file in editor
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ParseError(path, err) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(
                    f,
                    "Failed to write config file '{}': {}",
                    path.display(),
                    err
                )
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(
                    f,
                    "Failed to open config file '{}': {}",
                    path.display(),
                    err
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.organize.source_directory.as_os_str().is_empty());
        assert!(!config.organize.dry_run);
        assert_eq!(config.duplicates.keep, KeepPolicy::Newest);
        assert_eq!(config.duplicates.threads, 0);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.log_to_file);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.duplicates.keep, KeepPolicy::Newest);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [duplicates]
            keep = "oldest"
            min_file_size = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.duplicates.keep, KeepPolicy::Oldest);
        assert_eq!(config.duplicates.min_file_size, 1024);
        assert_eq!(config.logging.level, "info");
        assert!(config.duplicates.roots.is_empty());

        let detector = config.duplicates.to_detector_config();
        assert_eq!(detector.min_file_size, 1024);
        assert!(!detector.follow_symlinks);
    }

    #[test]
    fn test_extra_extensions_and_destinations() {
        let config: Config = toml::from_str(
            r#"
            [categories.extra_extensions]
            "blend" = "documents"
            ".JPG" = "archives"

            [categories.destinations]
            images = "/srv/photos"
            Sculptures = "/srv/art"
            "#,
        )
        .unwrap();

        let map = config.categories.category_map();
        assert_eq!(map.lookup(".blend"), Category::Documents);
        assert_eq!(map.lookup("jpg"), Category::Archives);
        assert_eq!(map.lookup("mp3"), Category::Music);

        assert_eq!(
            config.categories.destination_overrides(),
            vec![(Category::Images, PathBuf::from("/srv/photos"))]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(temp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[duplicates\nkeep = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.organize.skip_paths = vec![PathBuf::from("/tmp/keep.me")];
        config.duplicates.keep = KeepPolicy::Oldest;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.organize.skip_paths, config.organize.skip_paths);
        assert_eq!(loaded.duplicates.keep, KeepPolicy::Oldest);
    }
}
