//! Default configuration values for Live-Inspector

use serde::{Deserialize, Serialize};

/// Recursion guard shared by interpretation and path search. Legitimate
/// non-cyclic nesting deeper than this is truncated.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 100;

/// Ceiling for the recursive decoder. A self-referential type decoded this
/// deep stays within a default 2 MiB thread stack.
pub const MAX_INTERPRETER_DEPTH: usize = 128;

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub interpreter: InterpreterDefaults,
    pub memory: MemoryDefaults,
    pub resolver: ResolverDefaults,
    pub search: SearchDefaults,
    pub logging: LoggingDefaults,
}

/// Default interpreter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterDefaults {
    pub max_depth: usize,
    pub max_array_elements: usize,
    pub guess_real_class: bool,
}

/// Default memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub max_read_size: usize,
    pub cache_entries: usize,
}

/// Default runtime metadata layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverDefaults {
    pub name_offset: u64,
    pub max_name_len: usize,
    pub super_offset: Option<u64>,
    pub max_super_hops: usize,
}

/// Default search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDefaults {
    pub max_depth: usize,
    pub max_visited: usize,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        interpreter: InterpreterDefaults {
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_array_elements: 4096,
            guess_real_class: true,
        },
        memory: MemoryDefaults {
            max_read_size: 16 * 1024 * 1024, // 16MB
            cache_entries: 512,
        },
        resolver: ResolverDefaults {
            name_offset: 0,
            max_name_len: 256,
            super_offset: None,
            max_super_hops: 16,
        },
        search: SearchDefaults {
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
            max_visited: 250_000,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
