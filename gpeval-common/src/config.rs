//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `GPEVAL_ROOT_FOLDER`
//! 3. TOML config file `root_folder`
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: defaults are used and a
//! warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GPEVAL_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "gpeval.db";

/// Minimum similarity (0..=100) for a fuzzy roster match
pub const DEFAULT_FUZZY_THRESHOLD: u8 = 82;

/// Largest accepted bulk mutation batch
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5790;

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP server section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Identity matching section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Similarity (0..=100) at or above which a name is matched to an existing presenter
    pub fuzzy_threshold: u8,
    /// Keep per-scope candidate pools in memory between resolutions
    pub cache_candidates: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            cache_candidates: true,
        }
    }
}

/// Bulk mutation section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    pub max_batch_size: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Contents of `gpeval.toml`
///
/// Every section is optional; absent keys take their defaults so older files keep
/// loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub matching: MatchingConfig,
    pub bulk: BulkConfig,
}

impl TomlConfig {
    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.matching.fuzzy_threshold > 100 {
            return Err(Error::Config(format!(
                "matching.fuzzy_threshold must be within 0..=100, got {}",
                self.matching.fuzzy_threshold
            )));
        }
        if self.bulk.max_batch_size == 0 {
            return Err(Error::Config(
                "bulk.max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Serialize a config to disk, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the config file if present, otherwise fall back to defaults
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Logging level from the config file, read quietly
///
/// Needed before the subscriber is installed, so nothing is logged here; the
/// full load via [`load_or_default`] reports problems afterwards.
pub fn peek_log_level(path: Option<&Path>) -> String {
    path.map(Path::to_path_buf)
        .or_else(default_config_path)
        .filter(|path| path.exists())
        .and_then(|path| load_toml_config(&path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
}

/// `~/.config/gpeval/gpeval.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gpeval").join("gpeval.toml"))
}

/// Compiled fallbacks for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/gpeval (or /var/lib/gpeval for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("gpeval"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/gpeval"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("gpeval"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/gpeval"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("gpeval"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\gpeval"))
        } else {
            PathBuf::from("./gpeval_data")
        };

        Self {
            root_folder,
            log_level: LoggingConfig::default().level,
        }
    }
}

/// Resolves the root folder following the priority order in the module docs
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self {
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

impl Default for RootFolderResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the root folder and derives paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
