//! Configuration Module - Dump Parameters
//!
//! Manages the parameters that shape size estimates and dump records.
//! The layout constants must match the runtime being inspected, otherwise
//! sizes are consistently off by the GC header or the slot width.

use crate::escape::{escaped_capacity, MAX_ESCAPE_BYTES_PER_UNIT};
use serde::{Deserialize, Serialize};

/// Memory layout constants of the inspected runtime
///
/// # Examples
///
/// ```rust
/// use heapgraph::config::LayoutConfig;
///
/// let layout = LayoutConfig::for_word_size(4);
/// assert_eq!(layout.gc_header_size, 12);
/// assert_eq!(layout.dict_entry_size, 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Size of one reference slot (a pointer) in bytes
    ///
    /// Default: 8
    pub word_size: usize,

    /// Per-instance bookkeeping carried by cycle-tracked objects
    ///
    /// Self-reported and special-case sizes exclude it; the estimator adds
    /// it back for tracked types.
    /// Default: 3 words
    pub gc_header_size: usize,

    /// Size of one hash-set table entry (hash + key)
    ///
    /// Default: 2 words
    pub set_entry_size: usize,

    /// Size of one hash-mapping table entry (hash + key + value)
    ///
    /// Default: 3 words
    pub dict_entry_size: usize,
}

impl LayoutConfig {
    /// Layout for a runtime with the given pointer width
    pub const fn for_word_size(word_size: usize) -> Self {
        Self {
            word_size,
            gc_header_size: word_size.saturating_mul(3),
            set_entry_size: word_size.saturating_mul(2),
            dict_entry_size: word_size.saturating_mul(3),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::for_word_size(8)
    }
}

/// Main configuration for a dump session
///
/// # Examples
///
/// ```rust
/// use heapgraph::DumpConfig;
///
/// let config = DumpConfig {
///     max_string_len: 40,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Maximum number of code units of a text value written to `value`
    ///
    /// The `len` field still reports the full length.
    /// Default: 100
    pub max_string_len: usize,

    /// Capacity of the escape scratch buffer in bytes
    ///
    /// Must hold the worst case for `max_string_len` units plus both quotes,
    /// and never less than the default cap, which also bounds type names.
    /// Default: 2048
    pub escape_buffer_size: usize,

    /// Runtime layout constants
    pub layout: LayoutConfig,

    /// Emit session events through the global logger
    ///
    /// Default: false
    pub verbose: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig {
            max_string_len: DEFAULT_MAX_STRING_LEN,
            escape_buffer_size: 2 * KB,
            layout: LayoutConfig::default(),
            verbose: false,
        }
    }
}

impl DumpConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use heapgraph::DumpConfig;
    ///
    /// let config = DumpConfig {
    ///     max_string_len: 1000, // does not fit the default buffer
    ///     ..Default::default()
    /// };
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_string_len == 0 {
            return Err(ConfigError::InvalidStringLimit(
                "max_string_len must be > 0".to_string(),
            ));
        }
        if self.max_string_len > MAX_STRING_LEN_LIMIT {
            return Err(ConfigError::InvalidStringLimit(format!(
                "max_string_len {} exceeds the limit of {}",
                self.max_string_len, MAX_STRING_LEN_LIMIT
            )));
        }

        // Type names are capped at the default length whatever the value cap
        let units = self.max_string_len.max(DEFAULT_MAX_STRING_LEN);
        let needed = escaped_capacity(units);
        if self.escape_buffer_size > MAX_ESCAPE_BUFFER_SIZE {
            return Err(ConfigError::InvalidEscapeBuffer(format!(
                "escape_buffer_size {} exceeds the limit of {}",
                self.escape_buffer_size, MAX_ESCAPE_BUFFER_SIZE
            )));
        }
        if self.escape_buffer_size < needed {
            return Err(ConfigError::InvalidEscapeBuffer(format!(
                "escape_buffer_size {} cannot hold {} units at {} bytes each (needs {})",
                self.escape_buffer_size, units, MAX_ESCAPE_BYTES_PER_UNIT, needed
            )));
        }

        let word = self.layout.word_size;
        if word != 4 && word != 8 {
            return Err(ConfigError::InvalidWordSize(format!(
                "word_size must be 4 or 8, got {}",
                word
            )));
        }

        if self.layout.set_entry_size < word || self.layout.dict_entry_size < word {
            return Err(ConfigError::InvalidEntrySize(
                "hash table entries must be at least one word".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - HEAPGRAPH_MAX_STRING_LEN
    /// - HEAPGRAPH_WORD_SIZE (also rescales the derived layout sizes)
    /// - HEAPGRAPH_GC_HEADER_SIZE
    /// - HEAPGRAPH_VERBOSE
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HEAPGRAPH_MAX_STRING_LEN") {
            if let Some(len) = val
                .parse::<usize>()
                .ok()
                .filter(|&len| len <= MAX_STRING_LEN_LIMIT)
            {
                config.max_string_len = len;
                config.escape_buffer_size = config.escape_buffer_size.max(escaped_capacity(len));
            }
        }

        if let Ok(val) = std::env::var("HEAPGRAPH_WORD_SIZE") {
            if let Some(word) = val.parse::<usize>().ok().filter(|&w| w == 4 || w == 8) {
                config.layout = LayoutConfig::for_word_size(word);
            }
        }

        if let Ok(val) = std::env::var("HEAPGRAPH_GC_HEADER_SIZE") {
            if let Ok(size) = val.parse::<usize>() {
                config.layout.gc_header_size = size;
            }
        }

        if let Ok(val) = std::env::var("HEAPGRAPH_VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config
    }

    /// Parse configuration from a JSON document
    ///
    /// Missing fields keep their defaults. The result is validated.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: DumpConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid string limit: {0}")]
    InvalidStringLimit(String),

    #[error("Invalid escape buffer: {0}")]
    InvalidEscapeBuffer(String),

    #[error("Invalid word size: {0}")]
    InvalidWordSize(String),

    #[error("Invalid entry size: {0}")]
    InvalidEntrySize(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

// ============================================================================
// CONSTANTS
// ============================================================================

const KB: usize = 1024;

/// Default cap on dumped text values, in code units
pub const DEFAULT_MAX_STRING_LEN: usize = 100;

/// Largest accepted `max_string_len`
pub const MAX_STRING_LEN_LIMIT: usize = 1 << 20;

/// Largest accepted `escape_buffer_size`
pub const MAX_ESCAPE_BUFFER_SIZE: usize = escaped_capacity(MAX_STRING_LEN_LIMIT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DumpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_string_len, 100);
        assert_eq!(config.layout.word_size, 8);
        assert_eq!(config.layout.gc_header_size, 24);
    }

    #[test]
    fn test_invalid_word_size() {
        let config = DumpConfig {
            layout: LayoutConfig::for_word_size(6),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWordSize(_))
        ));
    }

    #[test]
    fn test_escape_buffer_too_small() {
        let config = DumpConfig {
            escape_buffer_size: 64,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEscapeBuffer(_))
        ));
    }

    #[test]
    fn test_zero_string_limit() {
        let config = DumpConfig {
            max_string_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DumpConfig::from_json_str(r#"{"max_string_len": 20, "verbose": true}"#)
            .expect("partial config should parse");
        assert_eq!(config.max_string_len, 20);
        assert!(config.verbose);
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn test_huge_string_limit_is_rejected() {
        assert!(matches!(
            DumpConfig::from_json_str(r#"{"max_string_len": 18446744073709551615}"#),
            Err(ConfigError::InvalidStringLimit(_))
        ));

        let config = DumpConfig {
            max_string_len: usize::MAX,
            escape_buffer_size: usize::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_escape_buffer_is_rejected() {
        assert!(matches!(
            DumpConfig::from_json_str(r#"{"escape_buffer_size": 18446744073709551615}"#),
            Err(ConfigError::InvalidEscapeBuffer(_))
        ));
    }

    #[test]
    fn test_huge_word_size_is_rejected() {
        let config = DumpConfig {
            layout: LayoutConfig::for_word_size(usize::MAX),
            ..Default::default()
        };
        assert_eq!(config.layout.gc_header_size, usize::MAX);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWordSize(_))
        ));
    }

    #[test]
    fn test_from_env_skips_oversized_values() {
        std::env::set_var("HEAPGRAPH_MAX_STRING_LEN", "18446744073709551615");
        std::env::set_var("HEAPGRAPH_WORD_SIZE", "18446744073709551615");
        let config = DumpConfig::from_env();
        std::env::remove_var("HEAPGRAPH_MAX_STRING_LEN");
        std::env::remove_var("HEAPGRAPH_WORD_SIZE");

        assert_eq!(config.max_string_len, DEFAULT_MAX_STRING_LEN);
        assert_eq!(config.layout, LayoutConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            DumpConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
