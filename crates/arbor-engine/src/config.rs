//! Engine configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! accessor_cache_capacity = 512
//! log_profile = "production"
//! ```

use std::num::NonZeroUsize;

use arbor_core::compiler::DEFAULT_ACCESSOR_CACHE_CAPACITY;
use arbor_core::errors::{ArborError, Result};
use arbor_core::logging_facility::{self, Profile};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on compiled accessors kept per cache (by path and by shape)
    pub accessor_cache_capacity: usize,
    pub log_profile: Profile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accessor_cache_capacity: DEFAULT_ACCESSOR_CACHE_CAPACITY,
            log_profile: Profile::Development,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// `Config` for malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text).map_err(|e| ArborError::Config {
            message: e.message().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file from disk
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read, otherwise as for
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ArborError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// `Config` when the accessor cache capacity is zero.
    pub fn validate(&self) -> Result<()> {
        self.cache_capacity().map(|_| ())
    }

    /// # Errors
    ///
    /// `Config` when the accessor cache capacity is zero.
    pub fn cache_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.accessor_cache_capacity).ok_or_else(|| ArborError::Config {
            message: "accessor_cache_capacity must be greater than zero".to_string(),
        })
    }

    /// Install the global subscriber for this profile
    pub fn init_logging(&self) {
        logging_facility::init(self.log_profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.accessor_cache_capacity, DEFAULT_ACCESSOR_CACHE_CAPACITY);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            accessor_cache_capacity = 16
            log_profile = "test"
            "#,
        )
        .unwrap();
        assert_eq!(config.accessor_cache_capacity, 16);
        assert_eq!(config.log_profile, Profile::Test);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("accessor_cache_capacity = 0").unwrap_err();
        assert!(matches!(err, ArborError::Config { .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = EngineConfig::from_toml_str("cache = 3").unwrap_err();
        assert!(matches!(err, ArborError::Config { ref message } if message.contains("cache")));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(std::path::Path::new("/nonexistent/arbor.toml")).unwrap_err();
        assert!(matches!(err, ArborError::Config { .. }));
    }
}
