//! Configuration validation for Zero services.
//!
//! Provides validation logic for configuration fields to ensure
//! all required values are present and within valid ranges.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::{Config, MarketConfig, ObservabilityConfig, ScreenerConfig};
use crate::util::parse_duration_secs;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port {port}: must be between 1 and 65535")]
    InvalidPort { port: u16, field: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.screener.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.log_format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ValidationError::InvalidValue {
                    field: "observability.log_format".into(),
                    reason: format!("'{other}' is not one of json, pretty"),
                });
            }
        }

        if self.log_level.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "observability.log_level".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ScreenerConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort {
                port: self.port,
                field: "screener.port".into(),
            });
        }

        if self.listings_path.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "screener.listings_path".into(),
            });
        }

        if self.numerology_path.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "screener.numerology_path".into(),
            });
        }

        self.market.validate()
    }
}

impl Validate for MarketConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "screener.market.base_url".into(),
            });
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ValidationError::InvalidValue {
                field: "screener.market.base_url".into(),
                reason: format!("'{}' is not a valid URL", self.base_url),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "screener.market.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if let Err(reason) = parse_duration_secs(&self.cache_ttl) {
            return Err(ValidationError::InvalidValue {
                field: "screener.market.cache_ttl".into(),
                reason,
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.symbols {
            if entry.symbol.trim().is_empty() {
                return Err(ValidationError::MissingField {
                    field: "screener.market.symbols[].symbol".into(),
                });
            }
            if !seen.insert(entry.symbol.as_str()) {
                return Err(ValidationError::InvalidValue {
                    field: "screener.market.symbols".into(),
                    reason: format!("duplicate symbol {}", entry.symbol),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSymbolConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = Config::default();
        config.screener.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort { port: 0, .. })
        ));
    }

    #[test]
    fn test_bad_cache_ttl_rejected() {
        let mut market = MarketConfig::default();
        market.cache_ttl = "soon".into();
        let err = market.validate().unwrap_err();
        assert!(err.to_string().contains("cache_ttl"));
    }

    #[test]
    fn test_duplicate_symbols_rejected() {
        let mut market = MarketConfig::default();
        market.symbols.push(IndexSymbolConfig::new("^NSEI", "Again"));
        assert!(market.validate().is_err());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.observability.log_format = "xml".into();
        config.screener.listings_path = String::new();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::Multiple(errors)) if errors.len() == 2
        ));
    }
}
