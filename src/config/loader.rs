//! Configuration loader for Live-Inspector
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_interpreter")]
    pub interpreter: InterpreterConfig,

    #[serde(default = "default_memory")]
    pub memory: MemoryConfig,

    #[serde(default = "default_resolver")]
    pub resolver: ResolverConfig,

    #[serde(default = "default_search")]
    pub search: SearchConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Field interpretation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Depth at which recursion stops and a truncated subtree is reported
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Upper bound on decoded elements per dynamic array
    #[serde(default = "default_max_array_elements")]
    pub max_array_elements: usize,
    /// Resolve the most-derived class behind object pointers
    #[serde(default = "default_guess_real_class")]
    pub guess_real_class: bool,
}

/// Memory access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
}

/// Where runtime type metadata lives inside a metadata object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Offset of the pointer to the NUL-terminated type name
    #[serde(default = "default_name_offset")]
    pub name_offset: u64,
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
    /// Offset of the pointer to the parent metadata object, if the target
    /// exposes one
    #[serde(default)]
    pub super_offset: Option<u64>,
    #[serde(default = "default_max_super_hops")]
    pub max_super_hops: usize,
}

/// Path search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_max_depth")]
    pub max_depth: usize,
    /// Node budget per search; exceeding it ends the search early
    #[serde(default = "default_max_visited")]
    pub max_visited: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration or returns defaults if file doesn't exist
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|_| Config::default())
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location, falling back to defaults
pub fn load_config() -> Result<Config, ConfigError> {
    let loader = ConfigLoader::new("live-inspector.toml");
    match loader.load() {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
        Err(err) => Err(err),
    }
}

// Default functions for serde
fn default_interpreter() -> InterpreterConfig {
    let defaults = default_config();
    InterpreterConfig {
        max_depth: defaults.interpreter.max_depth,
        max_array_elements: defaults.interpreter.max_array_elements,
        guess_real_class: defaults.interpreter.guess_real_class,
    }
}

fn default_memory() -> MemoryConfig {
    let defaults = default_config();
    MemoryConfig {
        max_read_size: defaults.memory.max_read_size,
        cache_entries: defaults.memory.cache_entries,
    }
}

fn default_resolver() -> ResolverConfig {
    let defaults = default_config();
    ResolverConfig {
        name_offset: defaults.resolver.name_offset,
        max_name_len: defaults.resolver.max_name_len,
        super_offset: defaults.resolver.super_offset,
        max_super_hops: defaults.resolver.max_super_hops,
    }
}

fn default_search() -> SearchConfig {
    let defaults = default_config();
    SearchConfig {
        max_depth: defaults.search.max_depth,
        max_visited: defaults.search.max_visited,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_config().logging.level,
    }
}

// Individual field defaults
fn default_max_depth() -> usize {
    default_config().interpreter.max_depth
}

fn default_max_array_elements() -> usize {
    default_config().interpreter.max_array_elements
}

fn default_guess_real_class() -> bool {
    default_config().interpreter.guess_real_class
}

fn default_max_read_size() -> usize {
    default_config().memory.max_read_size
}

fn default_cache_entries() -> usize {
    default_config().memory.cache_entries
}

fn default_name_offset() -> u64 {
    default_config().resolver.name_offset
}

fn default_max_name_len() -> usize {
    default_config().resolver.max_name_len
}

fn default_max_super_hops() -> usize {
    default_config().resolver.max_super_hops
}

fn default_search_max_depth() -> usize {
    default_config().search.max_depth
}

fn default_max_visited() -> usize {
    default_config().search.max_visited
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interpreter: default_interpreter(),
            memory: default_memory(),
            resolver: default_resolver(),
            search: default_search(),
            logging: default_logging(),
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        default_interpreter()
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        default_memory()
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        default_resolver()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        default_search()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        default_logging()
    }
}
