#![forbid(unsafe_code)]

//! Engine configuration loaded from TOML.
//!
//! All keys are optional; missing keys take the defaults from
//! [`EngineConfig::default`].
//!
//! ```toml
//! max_concurrent_modals = 3
//! default_size = "md"
//! log_source = "juris-modal"
//! restore_focus = true
//! trap_focus = true
//! ```

use serde::Deserialize;

/// Default ceiling on simultaneously open modals.
pub const DEFAULT_MAX_CONCURRENT_MODALS: usize = 3;

/// Size tier of a modal surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ModalSize {
    #[serde(rename = "sm")]
    Sm,
    #[default]
    #[serde(rename = "md")]
    Md,
    #[serde(rename = "lg")]
    Lg,
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xxl,
    #[serde(rename = "full")]
    Full,
}

impl ModalSize {
    /// The tag used in configuration and surface descriptions.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
            Self::Xxl => "2xl",
            Self::Full => "full",
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    Parse(String),
    /// A value was out of range.
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Invalid { key, reason } => write!(f, "invalid config value for '{key}': {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Modal engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Registry capacity; opening past it evicts the oldest instance.
    pub max_concurrent_modals: usize,
    /// Size used by presets when the caller does not pick one.
    pub default_size: ModalSize,
    /// `source` stamped on every log record.
    pub log_source: String,
    /// Return focus to the pre-modal element when a modal closes.
    pub restore_focus: bool,
    /// Keep Tab navigation inside the top modal.
    pub trap_focus: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_modals: DEFAULT_MAX_CONCURRENT_MODALS,
            default_size: ModalSize::Md,
            log_source: "juris-modal".to_string(),
            restore_focus: true,
            trap_focus: true,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] for malformed TOML or unknown keys.
    /// - [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the registry capacity.
    #[must_use]
    pub fn with_max_concurrent_modals(mut self, max: usize) -> Self {
        self.max_concurrent_modals = max;
        self
    }

    /// Set the log source.
    #[must_use]
    pub fn with_log_source(mut self, source: impl Into<String>) -> Self {
        self.log_source = source.into();
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_concurrent_modals` is zero
    /// or `log_source` is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_modals == 0 {
            return Err(ConfigError::Invalid {
                key: "max_concurrent_modals",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.log_source.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "log_source",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_concurrent_modals, 3);
    }

    #[test]
    fn partial_document_overrides_keys() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_concurrent_modals = 5
            default_size = "2xl"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_concurrent_modals, 5);
        assert_eq!(config.default_size, ModalSize::Xxl);
        assert!(config.restore_focus);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("max_concurrent_modals = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "max_concurrent_modals",
                ..
            }
        ));
    }

    #[test]
    fn unknown_key_is_parse_error() {
        let err = EngineConfig::from_toml_str("max_modals = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("config parse error"));
    }

    #[test]
    fn blank_source_rejected() {
        let config = EngineConfig::default().with_log_source("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn size_tags_match_config_names() {
        let config = EngineConfig::from_toml_str("default_size = \"2xl\"").unwrap();
        assert_eq!(config.default_size, ModalSize::Xxl);
        assert_eq!(ModalSize::Xxl.as_str(), "2xl");
        assert_eq!(ModalSize::Full.as_str(), "full");
    }
}
