//! Configuration module for Live-Inspector
//!
//! Provides configuration loading, validation, and default settings
//! for interpretation, memory access, type resolution and search.

mod defaults;
mod loader;
mod validator;

pub use defaults::{
    default_config, ConfigDefaults, DEFAULT_MAX_RECURSION_DEPTH, MAX_INTERPRETER_DEPTH,
};
pub use loader::{load_config, ConfigLoader};
pub use validator::{validate_config, ConfigValidator};

// Re-export the configuration structures
pub use loader::{
    Config, InterpreterConfig, LoggingConfig, MemoryConfig, ResolverConfig, SearchConfig,
};

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_module_exports() {
        let _config = default_config();
        let _loader = ConfigLoader::new("test.toml");
        let _validator = ConfigValidator;

        let result: ConfigResult<String> = Ok("test".to_string());
        assert!(result.is_ok());

        let error_result: ConfigResult<String> = Err(ConfigError::Invalid("test".to_string()));
        assert!(error_result.is_err());
    }

    #[test]
    fn test_validate_config_export() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_config_export() {
        // Returns defaults since the file doesn't exist
        let result = load_config();
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_error_from_io() {
        use std::io;
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_error: ConfigError = io_error.into();
        assert!(matches!(config_error, ConfigError::Io(_)));
    }
}
