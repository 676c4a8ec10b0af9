//! Suggestion oracle: the contract the resolution engine consumes plus the
//! shared parsing of oracle output.
//!
//! The oracle is untrusted. Anything it says is parsed defensively into a
//! [`SuggestionRecord`]; any failure along the way means "no suggestion".

#[cfg(feature = "http")]
mod client;
mod prompt;

#[cfg(feature = "http")]
pub use client::OracleClient;
pub use prompt::build_prompt;

use crate::result::OracleError;
use crate::sanitizer::SanitizedContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Interaction the executor performs against a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Click the element
    Click,
    /// Fill the element with the caller's value
    Fill,
    /// Scroll the element into view, then click it
    Scroll,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Click => "click",
            Self::Fill => "fill",
            Self::Scroll => "scroll",
        };
        f.write_str(label)
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "click" => Ok(Self::Click),
            "fill" | "type" => Ok(Self::Fill),
            "scroll" => Ok(Self::Scroll),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// One structured suggestion from the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    /// Replacement locator to try
    pub target_locator: String,
    /// Suggested interaction, if the oracle named one
    pub action: Option<Action>,
    /// Trust score in `[0, 1]`
    pub confidence: f64,
    /// Free-form explanation
    pub rationale: String,
}

#[derive(Deserialize)]
struct RawSuggestion {
    #[serde(alias = "fixed_selector", alias = "selector", alias = "targetLocator")]
    target_locator: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(alias = "conf")]
    confidence: Option<f64>,
    #[serde(default, alias = "reasoning")]
    rationale: Option<String>,
}

impl SuggestionRecord {
    /// A previously verified locator replayed from the cache
    #[must_use]
    pub fn cached(target_locator: impl Into<String>) -> Self {
        Self {
            target_locator: target_locator.into(),
            action: None,
            confidence: 1.0,
            rationale: "verified fix from healing cache".to_string(),
        }
    }

    /// Parse oracle output into a record
    ///
    /// Accepts bare JSON or JSON embedded in surrounding prose/fences.
    /// Unknown fields are ignored; an unknown action is treated as absent.
    /// Missing locator or confidence, or a confidence outside `[0, 1]`,
    /// rejects the record.
    pub fn from_oracle_text(text: &str) -> Result<Self, OracleError> {
        let json = extract_json_object(text)
            .ok_or_else(|| OracleError::malformed("no JSON object in response"))?;
        let raw: RawSuggestion = serde_json::from_str(json)
            .map_err(|e| OracleError::malformed(format!("suggestion is not valid JSON: {e}")))?;

        let target_locator = raw
            .target_locator
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OracleError::malformed("suggestion has no target locator"))?;
        let confidence = raw
            .confidence
            .ok_or_else(|| OracleError::malformed("suggestion has no confidence"))?;
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(OracleError::malformed(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        let action = raw.action.as_deref().and_then(|a| a.parse().ok());

        Ok(Self {
            target_locator,
            action,
            confidence,
            rationale: raw.rationale.unwrap_or_default(),
        })
    }
}

/// Slice from the first `{` to the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Everything the oracle is told about one failure
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionQuery {
    /// The broken locator
    pub signature: String,
    /// Sanitized page summary
    pub context: SanitizedContext,
    /// Error message from the most recent failed attempt (already truncated)
    pub error_context: String,
    /// Failure keywords seen on the page
    pub page_errors: Vec<String>,
}

/// Maps a failure to at most one suggestion
///
/// Implementations never retry and never fail hard: every problem becomes
/// `None`. Retry policy belongs to the resolution engine.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Ask for one suggestion
    async fn suggest(&self, query: &SuggestionQuery) -> Option<SuggestionRecord>;
}

/// Scripted oracle for tests
///
/// Replies are handed out in order; once exhausted every query gets `None`.
/// Every query is recorded.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Option<SuggestionRecord>>>,
    queries: Mutex<Vec<SuggestionQuery>>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    /// Oracle with no replies queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply
    #[must_use]
    pub fn reply(self, record: SuggestionRecord) -> Self {
        self.push(Some(record));
        self
    }

    /// Queue a reply built from its parts
    #[must_use]
    pub fn suggest_locator(
        self,
        target_locator: &str,
        action: Option<Action>,
        confidence: f64,
    ) -> Self {
        self.reply(SuggestionRecord {
            target_locator: target_locator.to_string(),
            action,
            confidence,
            rationale: String::new(),
        })
    }

    /// Queue a "no suggestion" reply
    #[must_use]
    pub fn no_reply(self) -> Self {
        self.push(None);
        self
    }

    /// Sleep before answering each query
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of queries received
    #[must_use]
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Queries received, in order
    #[must_use]
    pub fn queries(&self) -> Vec<SuggestionQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, reply: Option<SuggestionRecord>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }
}

#[async_trait]
impl SuggestionProvider for ScriptedOracle {
    async fn suggest(&self, query: &SuggestionQuery) -> Option<SuggestionRecord> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten()
    }
}
