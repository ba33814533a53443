//! Configuration loading and resolution
//!
//! Every setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_HOST: &str = "INGR_HOST";
pub const ENV_PORT: &str = "INGR_PORT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
pub const ENV_TMP_FOLDER: &str = "TMP_FOLDER";
pub const ENV_PLUGINS_DIR: &str = "INGR_PLUGINS_DIR";

/// Bootstrap configuration loaded from TOML file
///
/// All keys are optional; anything missing falls through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Plain path or `sqlite://` URL
    #[serde(default)]
    pub database_path: Option<String>,

    /// Permanent asset root (`images/`, `thumbnails/`, `models/` live here)
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    /// Staging root (one sub-directory per upload session)
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,

    #[serde(default)]
    pub plugins_dir: Option<PathBuf>,

    /// Program and leading arguments used to run a plugin
    #[serde(default)]
    pub plugin_executor: Option<Vec<String>>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub upload_dir: Option<PathBuf>,
    pub tmp_dir: Option<PathBuf>,
    pub plugins_dir: Option<PathBuf>,
}

/// Compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub plugins_dir: PathBuf,
    pub plugin_executor: Vec<String>,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("./static"),
            tmp_dir: PathBuf::from("./.tmp"),
            plugins_dir: PathBuf::from("../plugins"),
            plugin_executor: vec!["python3".to_string(), "plugin_executor.py".to_string()],
        }
    }
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub plugins_dir: PathBuf,
    pub plugin_executor: Vec<String>,
    pub log_level: String,
}

impl ServerConfig {
    /// Resolve every setting from CLI → ENV → TOML → defaults
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let host = cli
            .host
            .clone()
            .or_else(|| env_string(ENV_HOST))
            .or_else(|| toml.host.clone())
            .unwrap_or(defaults.host);

        let port = match cli.port {
            Some(port) => port,
            None => match env_string(ENV_PORT) {
                Some(raw) => raw
                    .parse::<u16>()
                    .map_err(|e| Error::Config(format!("Invalid {}: {} ({})", ENV_PORT, raw, e)))?,
                None => toml.port.unwrap_or(defaults.port),
            },
        };

        let upload_dir = cli
            .upload_dir
            .clone()
            .or_else(|| env_string(ENV_UPLOAD_DIR).map(PathBuf::from))
            .or_else(|| toml.upload_dir.clone())
            .unwrap_or(defaults.upload_dir);

        let tmp_dir = cli
            .tmp_dir
            .clone()
            .or_else(|| env_string(ENV_TMP_FOLDER).map(PathBuf::from))
            .or_else(|| toml.tmp_dir.clone())
            .unwrap_or(defaults.tmp_dir);

        let plugins_dir = cli
            .plugins_dir
            .clone()
            .or_else(|| env_string(ENV_PLUGINS_DIR).map(PathBuf::from))
            .or_else(|| toml.plugins_dir.clone())
            .unwrap_or(defaults.plugins_dir);

        let database_path = cli
            .database
            .clone()
            .or_else(|| env_string(ENV_DATABASE_URL))
            .or_else(|| toml.database_path.clone())
            .map(|raw| parse_database_url(&raw))
            .unwrap_or_else(|| upload_dir.join("local.db"));

        let plugin_executor = match &toml.plugin_executor {
            Some(cmd) if !cmd.is_empty() => cmd.clone(),
            Some(_) => {
                return Err(Error::Config(
                    "plugin_executor must name at least a program".to_string(),
                ))
            }
            None => defaults.plugin_executor,
        };

        Ok(Self {
            host,
            port,
            database_path,
            upload_dir,
            tmp_dir,
            plugins_dir,
            plugin_executor,
            log_level: toml.logging.level.clone(),
        })
    }

    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accept both `sqlite://./local.db` style URLs and plain paths
pub fn parse_database_url(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    // Drop connection query parameters (`?mode=rwc`)
    let path = path.split('?').next().unwrap_or(path);
    PathBuf::from(path)
}

/// Default configuration file path (`<config_dir>/ingradient/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ingradient").join("config.toml"))
}

/// Load TOML config
///
/// A missing file is not an error: the defaults apply. A file that exists but
/// does not parse is reported.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => return Ok(TomlConfig::default()),
    };

    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
