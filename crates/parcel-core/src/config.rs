//! Factory configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! default_flags = "MUTABLE|NULLABLE_DEFAULT_TO_NULL"
//! max_depth = 32
//! ```
//!
//! `default_flags` also accepts a list of flag names or a table of named
//! booleans (`[default_flags] mutable = true`).

use serde::{Deserialize, Serialize};

use crate::error::{DtoError, DtoResult};
use crate::flags::DtoFlags;

/// Maximum nesting depth of nested construction
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Factory-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactoryConfig {
    /// Flags used by [`crate::Factory::build`]
    pub default_flags: DtoFlags,
    /// Nested constructions deeper than this fail with `MaxDepthExceeded`
    pub max_depth: usize,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfig {
            default_flags: DtoFlags::NONE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FactoryConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> DtoResult<Self> {
        toml::from_str(s).map_err(|e| DtoError::Config(e.to_string()))
    }

    /// Replace the default flags
    pub fn with_default_flags(mut self, flags: DtoFlags) -> Self {
        self.default_flags = flags;
        self
    }

    /// Replace the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FactoryConfig::from_toml_str("").unwrap();
        assert_eq!(config, FactoryConfig::default());
        assert_eq!(config.max_depth, 100);
    }

    #[test]
    fn test_combined_flags() {
        let config = FactoryConfig::from_toml_str(
            r#"
            default_flags = "MUTABLE|NULLABLE_DEFAULT_TO_NULL"
            max_depth = 8
            "#,
        )
        .unwrap();

        assert_eq!(
            config.default_flags,
            DtoFlags::MUTABLE | DtoFlags::NULLABLE_DEFAULT_TO_NULL
        );
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_options_table() {
        let config = FactoryConfig::from_toml_str(
            r#"
            [default_flags]
            partial = true
            with_defaults = true
            "#,
        )
        .unwrap();

        assert_eq!(
            config.default_flags,
            DtoFlags::PARTIAL | DtoFlags::WITH_DEFAULTS
        );
    }

    #[test]
    fn test_bad_flag_name() {
        let err = FactoryConfig::from_toml_str(r#"default_flags = "MUTABLE|LOUD""#).unwrap_err();
        assert!(matches!(err, DtoError::Config(_)));
    }
}
