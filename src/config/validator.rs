//! Configuration validator for Live-Inspector
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{
    Config, ConfigError, InterpreterConfig, LoggingConfig, MemoryConfig, ResolverConfig,
    SearchConfig,
};
use super::MAX_INTERPRETER_DEPTH;
use tracing::warn;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_interpreter(&config.interpreter)?;
        Self::validate_memory(&config.memory)?;
        Self::validate_resolver(&config.resolver)?;
        Self::validate_search(&config.search)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_interpreter(interpreter: &InterpreterConfig) -> Result<(), ConfigError> {
        if interpreter.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "Interpreter max depth must be at least 1".to_string(),
            ));
        }

        // Each level of nesting costs several stack frames
        if interpreter.max_depth > MAX_INTERPRETER_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "Interpreter max depth cannot exceed {}",
                MAX_INTERPRETER_DEPTH
            )));
        }

        if interpreter.max_array_elements == 0 {
            return Err(ConfigError::Invalid(
                "Maximum array elements must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.max_read_size == 0 {
            return Err(ConfigError::Invalid(
                "Maximum read size must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size > 104857600 {
            warn!("Maximum read size exceeds 100MB");
        }

        if memory.cache_entries == 0 {
            return Err(ConfigError::Invalid(
                "Cache must hold at least one entry".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_resolver(resolver: &ResolverConfig) -> Result<(), ConfigError> {
        if resolver.max_name_len == 0 {
            return Err(ConfigError::Invalid(
                "Maximum type name length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_search(search: &SearchConfig) -> Result<(), ConfigError> {
        if search.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "Search max depth must be at least 1".to_string(),
            ));
        }

        if search.max_visited == 0 {
            return Err(ConfigError::Invalid(
                "Search node budget must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_depths() {
        let mut config = Config::default();
        config.interpreter.max_depth = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("depth"));

        let mut config = Config::default();
        config.interpreter.max_depth = MAX_INTERPRETER_DEPTH + 1;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.search.max_depth = 0;
        assert!(validate_config(&config).is_err());

        // The search walk keeps its own stack, so only the budget bounds it
        let mut config = Config::default();
        config.search.max_depth = 1_000_000;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_memory_limits() {
        let mut config = Config::default();
        config.memory.max_read_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.memory.cache_entries = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_resolver() {
        let mut config = Config::default();
        config.resolver.max_name_len = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("log level"));
    }

    #[test]
    fn test_edge_cases() {
        let mut config = Config::default();

        config.interpreter.max_depth = 1;
        config.interpreter.max_array_elements = 1;
        config.memory.max_read_size = 1;
        config.memory.cache_entries = 1;
        config.search.max_depth = 1;
        config.search.max_visited = 1;
        assert!(validate_config(&config).is_ok());

        config.interpreter.max_depth = MAX_INTERPRETER_DEPTH;
        config.memory.max_read_size = 104857600;
        assert!(validate_config(&config).is_ok());
    }
}
