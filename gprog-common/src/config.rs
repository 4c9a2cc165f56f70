//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is not fatal; it is logged and the
//! remaining tiers apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "GPROG_ROOT_FOLDER";
/// Environment variable overriding the listen port
pub const ENV_PORT: &str = "GPROG_PORT";
/// Environment variable overriding the bind address
pub const ENV_BIND_ADDRESS: &str = "GPROG_BIND_ADDRESS";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "gprog.db";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub default_page_size: Option<i64>,
    pub max_page_size: Option<i64>,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load from the platform config location, falling back to empty
    pub fn load_default() -> Self {
        let Some(path) = default_config_file() else {
            debug!("No config file found; using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config file {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Compiled defaults used when no other tier supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_address: "127.0.0.1".to_string(),
            port: 5000,
            log_level: "info".to_string(),
            default_page_size: 50,
            max_page_size: 100,
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub static_dir: Option<PathBuf>,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl ServiceConfig {
    /// Resolve every setting from CLI → ENV → TOML → defaults
    pub fn resolve(cli: CliOverrides, toml_config: TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = cli
            .root_folder
            .or_else(|| std::env::var(ENV_ROOT_FOLDER).ok().map(PathBuf::from))
            .or(toml_config.root_folder)
            .unwrap_or(defaults.root_folder);

        let bind_address = cli
            .bind_address
            .or_else(|| std::env::var(ENV_BIND_ADDRESS).ok())
            .or(toml_config.bind_address)
            .unwrap_or(defaults.bind_address);

        let port = match cli.port {
            Some(port) => port,
            None => match std::env::var(ENV_PORT) {
                Ok(raw) => raw
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("{} is not a valid port: {}", ENV_PORT, raw)))?,
                Err(_) => toml_config.port.unwrap_or(defaults.port),
            },
        };

        let default_page_size = toml_config
            .default_page_size
            .unwrap_or(defaults.default_page_size);
        let max_page_size = toml_config.max_page_size.unwrap_or(defaults.max_page_size);
        if default_page_size < 1 || max_page_size < default_page_size {
            return Err(Error::Config(format!(
                "Page sizes must satisfy 1 <= default ({}) <= max ({})",
                default_page_size, max_page_size
            )));
        }

        Ok(Self {
            root_folder,
            bind_address,
            port,
            log_level: toml_config.log_level.unwrap_or(defaults.log_level),
            static_dir: cli.static_dir.or(toml_config.static_dir),
            default_page_size,
            max_page_size,
        })
    }

    /// Path of the SQLite database inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Create the root folder if missing
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            debug!("Created root folder {}", self.root_folder.display());
        }
        Ok(())
    }
}

/// Locate the platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("gprog").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/gprog/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gprog"))
        .unwrap_or_else(|| PathBuf::from("./gprog_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_toml() {
        let config = TomlConfig::parse("port = 8080\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.root_folder.is_none());
    }

    #[test]
    fn test_parse_invalid_toml_is_config_error() {
        let err = TomlConfig::parse("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_compiled_defaults() {
        let defaults = CompiledDefaults::for_current_platform();
        assert_eq!(defaults.port, 5000);
        assert_eq!(defaults.default_page_size, 50);
        assert_eq!(defaults.max_page_size, 100);
        assert!(!defaults.root_folder.as_os_str().is_empty());
    }
}
