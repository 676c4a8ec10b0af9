//! CLI configuration

use crate::error::{CliError, CliResult};
use healix::{HealixConfig, DEFAULT_CONFIG_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default `tracing` filter directive for this level
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "healix=info,warn",
            Self::Debug => "healix=debug,info",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
    /// Oracle endpoint override
    pub oracle_url: Option<String>,
    /// Oracle model override
    pub model: Option<String>,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set the configuration file
    #[must_use]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Set the oracle endpoint override
    #[must_use]
    pub fn with_oracle_url(mut self, url: Option<String>) -> Self {
        self.oracle_url = url;
        self
    }

    /// Set the oracle model override
    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Resolve the Healix configuration
    ///
    /// An explicit `--config` must exist; otherwise `./healix.yaml` is used
    /// when present, else defaults. Flag and environment overrides apply last.
    pub fn load_healix(&self) -> CliResult<HealixConfig> {
        let mut config = match &self.config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                HealixConfig::load(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => HealixConfig::load_default()?,
            None => HealixConfig::default(),
        };
        if let Some(url) = &self.oracle_url {
            config = config.with_oracle_endpoint(url.clone());
        }
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(Verbosity::Normal.log_filter(), "warn");
        assert!(Verbosity::Debug.log_filter().contains("healix=debug"));
        assert!(Verbosity::Verbose.is_verbose());
        assert!(Verbosity::Quiet.is_quiet());
    }

    #[test]
    fn test_color_choice() {
        assert!(ColorChoice::Always.should_color());
        assert!(!ColorChoice::Never.should_color());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let config =
            CliConfig::new().with_config_path(Some(PathBuf::from("/nonexistent/healix.yaml")));
        assert!(matches!(config.load_healix(), Err(CliError::Config { .. })));
    }

    #[test]
    fn test_overrides_apply_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healix.yaml");
        std::fs::write(&path, "oracle:\n  model: from-file\n  endpoint: http://file:1\n").unwrap();

        let config = CliConfig::new()
            .with_config_path(Some(path))
            .with_model(Some("from-flag".to_string()))
            .load_healix()
            .unwrap();
        assert_eq!(config.oracle.model, "from-flag");
        assert_eq!(config.oracle.endpoint, "http://file:1");
    }
}
