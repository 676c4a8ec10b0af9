//! Configuration for the healing engine and its collaborators.
//!
//! Everything that used to be hard-coded per engine variant lives here: the
//! attribute whitelist, the page-error vocabulary, the confidence thresholds
//! and the timeout ladder. A `healix.yaml` file may override any subset; the
//! rest falls back to [`Default`].

use crate::result::{HealixError, HealixResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "healix.yaml";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealixConfig {
    /// Snapshot sanitizer settings
    pub sanitizer: SanitizerConfig,
    /// Suggestion oracle settings
    pub oracle: OracleConfig,
    /// Resolution engine policy
    pub engine: EngineConfig,
    /// Cache and ledger locations
    pub storage: StorageConfig,
}

impl HealixConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> HealixResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load `./healix.yaml` if present, otherwise the defaults
    pub fn load_default() -> HealixResult<Self> {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> HealixResult<Self> {
        let config: Self = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as YAML (used by `healix init`)
    pub fn to_yaml(&self) -> HealixResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject settings the engine cannot honour
    pub fn validate(&self) -> HealixResult<()> {
        if self.sanitizer.max_chars == 0 {
            return Err(HealixError::invalid_config(
                "sanitizer.max_chars must be positive",
            ));
        }
        if self.sanitizer.mask_token.is_empty() {
            return Err(HealixError::invalid_config(
                "sanitizer.mask_token must not be empty",
            ));
        }
        if self.engine.max_error_chars == 0 {
            return Err(HealixError::invalid_config(
                "engine.max_error_chars must be positive",
            ));
        }
        for (name, tier) in [
            ("engine.plan_a", &self.engine.plan_a),
            ("engine.plan_b", &self.engine.plan_b),
        ] {
            for value in [tier.with_action, tier.without_action] {
                if !(0.0..=1.0).contains(&value) {
                    return Err(HealixError::invalid_config(format!(
                        "{name} thresholds must lie in [0, 1], got {value}"
                    )));
                }
            }
        }
        if self.engine.plan_b.with_action > self.engine.plan_a.with_action
            || self.engine.plan_b.without_action > self.engine.plan_a.without_action
        {
            return Err(HealixError::invalid_config(
                "engine.plan_b thresholds may relax plan_a but never tighten it",
            ));
        }
        let ladder = &self.engine.timeouts;
        if !(ladder.original_ms < ladder.plan_a_ms && ladder.plan_a_ms < ladder.plan_b_ms) {
            return Err(HealixError::invalid_config(format!(
                "engine.timeouts must escalate (original {} < plan_a {} < plan_b {})",
                ladder.original_ms, ladder.plan_a_ms, ladder.plan_b_ms
            )));
        }
        if self.oracle.timeout_ms == 0 {
            return Err(HealixError::invalid_config(
                "oracle.timeout_ms must be positive",
            ));
        }
        Ok(())
    }

    /// Set the oracle endpoint
    #[must_use]
    pub fn with_oracle_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.oracle.endpoint = endpoint.into();
        self
    }

    /// Set the oracle model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.oracle.model = model.into();
        self
    }

    /// Set the storage locations
    #[must_use]
    pub fn with_storage(mut self, cache_file: PathBuf, ledger_file: PathBuf) -> Self {
        self.storage = StorageConfig {
            cache_file,
            ledger_file,
        };
        self
    }
}

/// Snapshot sanitizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Hard cap on the sanitized output, in characters
    pub max_chars: usize,
    /// Replacement for text outside interactive/labeling elements
    pub mask_token: String,
    /// Tags dropped together with their contents
    pub stripped_tags: Vec<String>,
    /// Tags emitted into the sanitized context
    pub interactive_tags: Vec<String>,
    /// Tags whose text content is kept
    pub text_tags: Vec<String>,
    /// Attributes retained on emitted tags
    pub kept_attributes: Vec<String>,
    /// Scrub e-mail addresses and long digit runs from kept text
    pub scrub_pii: bool,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_chars: 10_000,
            mask_token: "[MASKED]".to_string(),
            stripped_tags: strings(&[
                "script", "style", "svg", "path", "iframe", "meta", "link", "noscript", "template",
            ]),
            interactive_tags: strings(&[
                "a", "button", "input", "select", "textarea", "option", "label", "form",
            ]),
            text_tags: strings(&["a", "button", "label", "option", "h1", "h2", "legend"]),
            kept_attributes: strings(&["id", "class", "name", "type", "placeholder", "href"]),
            scrub_pii: true,
        }
    }
}

impl SanitizerConfig {
    /// Set the output cap
    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Set the mask token
    #[must_use]
    pub fn with_mask_token(mut self, token: impl Into<String>) -> Self {
        self.mask_token = token.into();
        self
    }
}

/// Oracle wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleApi {
    /// Ollama `/api/generate` with `format: "json"`
    #[default]
    Ollama,
    /// OpenAI-compatible `/v1/chat/completions`
    Chat,
}

/// Suggestion oracle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Wire format
    pub api: OracleApi,
    /// Base URL of the inference server
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Bounded wait per request
    pub timeout_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api: OracleApi::Ollama,
            endpoint: "http://localhost:11434".to_string(),
            model: "qwen2.5-coder:7b".to_string(),
            timeout_ms: 45_000,
        }
    }
}

impl OracleConfig {
    /// Request timeout as a duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Confidence gate for one tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Threshold when the suggestion names an action
    pub with_action: f64,
    /// Threshold when the suggestion leaves the action implicit
    pub without_action: f64,
}

impl TierThresholds {
    /// Threshold applicable to a suggestion
    #[must_use]
    pub const fn for_suggestion(&self, has_action: bool) -> f64 {
        if has_action {
            self.with_action
        } else {
            self.without_action
        }
    }

    /// Gate: accepted iff `confidence >= threshold`
    #[must_use]
    pub fn accepts(&self, confidence: f64, has_action: bool) -> bool {
        confidence >= self.for_suggestion(has_action)
    }
}

/// Escalating timeouts, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutLadder {
    /// Caller's original attempt
    pub original_ms: u64,
    /// Plan A execution
    pub plan_a_ms: u64,
    /// Plan B execution
    pub plan_b_ms: u64,
}

impl Default for TimeoutLadder {
    fn default() -> Self {
        Self {
            original_ms: 2_000,
            plan_a_ms: 5_000,
            plan_b_ms: 10_000,
        }
    }
}

impl TimeoutLadder {
    /// Original attempt timeout
    #[must_use]
    pub const fn original(&self) -> Duration {
        Duration::from_millis(self.original_ms)
    }

    /// Plan A timeout
    #[must_use]
    pub const fn plan_a(&self) -> Duration {
        Duration::from_millis(self.plan_a_ms)
    }

    /// Plan B timeout
    #[must_use]
    pub const fn plan_b(&self) -> Duration {
        Duration::from_millis(self.plan_b_ms)
    }
}

/// Resolution engine policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// First-tier gate
    pub plan_a: TierThresholds,
    /// Escalation gate (same or relaxed)
    pub plan_b: TierThresholds,
    /// Timeout ladder
    pub timeouts: TimeoutLadder,
    /// Failure-indicator vocabulary scanned during OBSERVE
    pub error_keywords: Vec<String>,
    /// Error messages sent to the oracle are cut to this many characters
    pub max_error_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plan_a: TierThresholds {
                with_action: 0.6,
                without_action: 0.7,
            },
            plan_b: TierThresholds {
                with_action: 0.55,
                without_action: 0.65,
            },
            timeouts: TimeoutLadder::default(),
            error_keywords: strings(&[
                "error",
                "invalid",
                "failed",
                "required",
                "timeout",
                "not found",
                "denied",
                "expired",
                "incorrect",
                "unavailable",
            ]),
            max_error_chars: 500,
        }
    }
}

/// Cache and ledger locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Flat JSON map of signature to verified replacement
    pub cache_file: PathBuf,
    /// JSON array of proposals
    pub ledger_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("healix_cache.json"),
            ledger_file: PathBuf::from("healix_proposals.json"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // ========================================================================
    // Defaults
    // ========================================================================

    #[test]
    fn test_default_config_is_valid() {
        HealixConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_whitelist() {
        let config = SanitizerConfig::default();
        assert_eq!(
            config.kept_attributes,
            vec!["id", "class", "name", "type", "placeholder", "href"]
        );
        assert_eq!(config.max_chars, 10_000);
    }

    #[test]
    fn test_default_timeouts_escalate() {
        let ladder = TimeoutLadder::default();
        assert!(ladder.original() < ladder.plan_a());
        assert!(ladder.plan_a() < ladder.plan_b());
    }

    // ========================================================================
    // Gate
    // ========================================================================

    #[test]
    fn test_gate_boundary_is_inclusive() {
        let gate = EngineConfig::default().plan_a;
        assert!(!gate.accepts(0.69, false));
        assert!(gate.accepts(0.70, false));
        assert!(!gate.accepts(0.59, true));
        assert!(gate.accepts(0.60, true));
    }

    // ========================================================================
    // YAML
    // ========================================================================

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let yaml = "oracle:\n  model: llama3\nsanitizer:\n  max_chars: 4000\n";
        let config = HealixConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.oracle.model, "llama3");
        assert_eq!(config.oracle.endpoint, "http://localhost:11434");
        assert_eq!(config.sanitizer.max_chars, 4000);
        assert_eq!(config.sanitizer.mask_token, "[MASKED]");
    }

    #[test]
    fn test_yaml_roundtrip_preserves_config() {
        let config = HealixConfig::default().with_model("phi3");
        let yaml = config.to_yaml().unwrap();
        assert_eq!(HealixConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_chat_api_parses() {
        let config = HealixConfig::from_yaml("oracle:\n  api: chat\n").unwrap();
        assert_eq!(config.oracle.api, OracleApi::Chat);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healix.yaml");
        std::fs::write(&path, "engine:\n  max_error_chars: 120\n").unwrap();
        let config = HealixConfig::load(&path).unwrap();
        assert_eq!(config.engine.max_error_chars, 120);
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_rejects_non_escalating_timeouts() {
        let yaml = "engine:\n  timeouts:\n    original_ms: 5000\n    plan_a_ms: 5000\n    plan_b_ms: 9000\n";
        let err = HealixConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("escalate"));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = HealixConfig::default();
        config.engine.plan_a.with_action = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_tightened_plan_b() {
        let mut config = HealixConfig::default();
        config.engine.plan_b.without_action = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_cap() {
        let mut config = HealixConfig::default();
        config.sanitizer.max_chars = 0;
        assert!(config.validate().is_err());
    }
}
