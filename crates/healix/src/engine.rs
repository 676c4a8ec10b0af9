//! Resolution engine: the two-tier healing state machine.
//!
//! ```text
//! ATTEMPT_ORIGINAL -> OBSERVE -> QUERY_A -> EXECUTE_A -> (QUERY_B -> EXECUTE_B)? -> DONE | FAILED
//! ```
//!
//! One run is strictly sequential. Every executor and oracle call is
//! bounded by a timeout, and the ladder grows from the original attempt to
//! Plan B. At most two oracle round-trips happen per run. Only a verified
//! execution writes to memory, so dropping the future mid-run never leaves a
//! partial fix behind.

use crate::config::{EngineConfig, HealixConfig, TierThresholds};
use crate::executor::Executor;
use crate::memory::MemoryStore;
use crate::observe::observe_page_errors;
use crate::oracle::{Action, SuggestionProvider, SuggestionQuery, SuggestionRecord};
use crate::provenance::SourceLocation;
use crate::result::{ActionError, FailureReason, HealingExhausted, Tier};
use crate::sanitizer::{PageSnapshot, SanitizedContext, Sanitizer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single oracle round-trip
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(45);

/// A caller's action that may need healing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealRequest {
    /// Locator as written in the test; also the cache signature
    pub locator: String,
    /// Intended interaction
    pub action: Action,
    /// Fill value
    pub value: Option<String>,
    /// Where the action is issued in test code
    pub source: SourceLocation,
}

impl HealRequest {
    /// Click request attributed to the caller's location
    #[must_use]
    #[track_caller]
    pub fn click(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            action: Action::Click,
            value: None,
            source: SourceLocation::caller(),
        }
    }

    /// Fill request attributed to the caller's location
    #[must_use]
    #[track_caller]
    pub fn fill(locator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            action: Action::Fill,
            value: Some(value.into()),
            source: SourceLocation::caller(),
        }
    }

    /// Request for any action attributed to the caller's location
    #[must_use]
    #[track_caller]
    pub fn new(locator: impl Into<String>, action: Action, value: Option<String>) -> Self {
        Self {
            locator: locator.into(),
            action,
            value,
            source: SourceLocation::caller(),
        }
    }

    /// Override the recorded source location
    #[must_use]
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }
}

/// States of one resolution run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionState {
    /// Caller's locator, shortest timeout
    AttemptOriginal,
    /// Snapshot and keyword scan
    Observe,
    /// Cache lookup or first oracle query
    QueryA,
    /// First substitute attempt
    ExecuteA,
    /// Escalated oracle query
    QueryB,
    /// Last substitute attempt
    ExecuteB,
    /// Healed or never broken
    Done,
    /// Healing exhausted
    Failed,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AttemptOriginal => "ATTEMPT_ORIGINAL",
            Self::Observe => "OBSERVE",
            Self::QueryA => "QUERY_A",
            Self::ExecuteA => "EXECUTE_A",
            Self::QueryB => "QUERY_B",
            Self::ExecuteB => "EXECUTE_B",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Result of one resolution run
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    /// The action succeeded on this locator
    Succeeded(String),
    /// Both tiers failed or were rejected
    Failed(FailureReason),
}

impl ResolutionOutcome {
    /// Whether the run ended in `DONE`
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Diagnostics for one resolution run
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionReport {
    /// Caller's original locator
    pub locator: String,
    /// States visited, in order
    pub states: Vec<ResolutionState>,
    /// Oracle round-trips made (never more than two)
    pub oracle_calls: u32,
    /// Whether Plan A came from the healing cache
    pub cache_hit: bool,
    /// Failure keywords observed on the page
    pub page_errors: Vec<String>,
    /// Terminal outcome
    pub outcome: ResolutionOutcome,
}

impl ResolutionReport {
    fn new(locator: &str) -> Self {
        Self {
            locator: locator.to_string(),
            states: Vec::new(),
            oracle_calls: 0,
            cache_hit: false,
            page_errors: Vec::new(),
            outcome: ResolutionOutcome::Failed(FailureReason::NoSuggestion { tier: Tier::PlanA }),
        }
    }

    fn enter(&mut self, state: ResolutionState) {
        debug!(locator = %self.locator, %state, "resolution state");
        self.states.push(state);
    }

    fn succeed(mut self, locator: String) -> Self {
        self.enter(ResolutionState::Done);
        self.outcome = ResolutionOutcome::Succeeded(locator);
        self
    }

    fn fail(mut self, reason: FailureReason) -> Self {
        self.enter(ResolutionState::Failed);
        warn!(locator = %self.locator, %reason, "healing exhausted");
        self.outcome = ResolutionOutcome::Failed(reason);
        self
    }

    /// Whether the run went through the given state
    #[must_use]
    pub fn visited(&self, state: ResolutionState) -> bool {
        self.states.contains(&state)
    }

    /// Working locator, or the terminal healing error
    pub fn into_result(self) -> Result<String, HealingExhausted> {
        match self.outcome {
            ResolutionOutcome::Succeeded(locator) => Ok(locator),
            ResolutionOutcome::Failed(reason) => Err(HealingExhausted {
                locator: self.locator,
                reason,
            }),
        }
    }
}

/// Self-healing locator resolution
///
/// Constructed once per process with its collaborators and shared by
/// reference across test workers.
pub struct ResolutionEngine {
    executor: Arc<dyn Executor>,
    oracle: Arc<dyn SuggestionProvider>,
    memory: Arc<MemoryStore>,
    sanitizer: Sanitizer,
    config: EngineConfig,
    oracle_timeout: Duration,
}

impl fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("memory", &self.memory)
            .field("sanitizer", &self.sanitizer)
            .field("config", &self.config)
            .field("oracle_timeout", &self.oracle_timeout)
            .finish_non_exhaustive()
    }
}

impl ResolutionEngine {
    /// Engine with default policy
    #[must_use]
    pub fn new(
        executor: Arc<dyn Executor>,
        oracle: Arc<dyn SuggestionProvider>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            executor,
            oracle,
            memory,
            sanitizer: Sanitizer::default(),
            config: EngineConfig::default(),
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    /// Engine with policy taken from a full configuration
    #[must_use]
    pub fn from_config(
        config: &HealixConfig,
        executor: Arc<dyn Executor>,
        oracle: Arc<dyn SuggestionProvider>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self::new(executor, oracle, memory)
            .with_config(config.engine.clone())
            .with_sanitizer(Sanitizer::new(config.sanitizer.clone()))
            .with_oracle_timeout(config.oracle.timeout())
    }

    /// Replace the engine policy
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the sanitizer
    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Bound each oracle round-trip
    #[must_use]
    pub const fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Shared healing memory
    #[must_use]
    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    /// Active policy
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Perform the request, healing the locator if needed
    ///
    /// Returns the locator that worked, or [`HealingExhausted`] which the
    /// caller must report as its own failure.
    pub async fn resolve(&self, request: &HealRequest) -> Result<String, HealingExhausted> {
        self.resolve_with_report(request).await.into_result()
    }

    /// Like [`resolve`](Self::resolve), keeping the run diagnostics
    pub async fn resolve_with_report(&self, request: &HealRequest) -> ResolutionReport {
        let mut report = ResolutionReport::new(&request.locator);
        let value = request.value.as_deref();
        let timeouts = self.config.timeouts;

        report.enter(ResolutionState::AttemptOriginal);
        // A broken request is the caller's bug, not a broken locator
        if request.action == Action::Fill && value.is_none() {
            return report.fail(FailureReason::InvalidRequest {
                error: ActionError::MissingValue {
                    locator: request.locator.clone(),
                },
            });
        }
        let original_error = match self
            .execute(&request.locator, request.action, value, timeouts.original())
            .await
        {
            Ok(()) => return report.succeed(request.locator.clone()),
            Err(e) => e,
        };
        info!(locator = %request.locator, error = %original_error, "locator failed, healing");

        report.enter(ResolutionState::Observe);
        let snapshot = match self.executor.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(locator = %request.locator, error = %e, "page snapshot failed, continuing without page context");
                PageSnapshot::empty()
            }
        };
        report.page_errors = observe_page_errors(&snapshot, &self.config.error_keywords);
        let context = self.sanitizer.sanitize(&snapshot);

        // Plan A
        report.enter(ResolutionState::QueryA);
        let plan_a = if let Some(cached) = self.memory.lookup(&request.locator) {
            debug!(locator = %request.locator, target = %cached, "healing cache hit");
            report.cache_hit = true;
            SuggestionRecord::cached(cached)
        } else {
            let query = self.query(request, &context, &original_error, &report.page_errors);
            let Some(suggestion) = self.ask(&mut report, &query).await else {
                return report.fail(FailureReason::NoSuggestion { tier: Tier::PlanA });
            };
            if let Err(reason) = gate(Tier::PlanA, &self.config.plan_a, &suggestion) {
                return report.fail(reason);
            }
            suggestion
        };

        report.enter(ResolutionState::ExecuteA);
        let plan_a_error = match self
            .execute_suggestion(request, &plan_a, timeouts.plan_a())
            .await
        {
            Ok(()) => {
                if !report.cache_hit {
                    self.remember(request, &plan_a.target_locator);
                }
                info!(locator = %request.locator, healed = %plan_a.target_locator, cache_hit = report.cache_hit, "healed on plan A");
                return report.succeed(plan_a.target_locator);
            }
            Err(e) => e,
        };
        debug!(target = %plan_a.target_locator, error = %plan_a_error, "plan A failed, escalating");

        // Plan B: the cache is never consulted again in this run
        report.enter(ResolutionState::QueryB);
        let query = self.query(request, &context, &plan_a_error, &report.page_errors);
        let Some(plan_b) = self.ask(&mut report, &query).await else {
            return report.fail(FailureReason::NoSuggestion { tier: Tier::PlanB });
        };
        if let Err(reason) = gate(Tier::PlanB, &self.config.plan_b, &plan_b) {
            return report.fail(reason);
        }

        report.enter(ResolutionState::ExecuteB);
        match self.execute_suggestion(request, &plan_b, timeouts.plan_b()).await {
            Ok(()) => {
                self.remember(request, &plan_b.target_locator);
                info!(locator = %request.locator, healed = %plan_b.target_locator, "healed on plan B");
                report.succeed(plan_b.target_locator)
            }
            Err(error) => report.fail(FailureReason::ExecutionFailed {
                tier: Tier::PlanB,
                locator: plan_b.target_locator,
                error,
            }),
        }
    }

    fn query(
        &self,
        request: &HealRequest,
        context: &SanitizedContext,
        error: &ActionError,
        page_errors: &[String],
    ) -> SuggestionQuery {
        SuggestionQuery {
            signature: request.locator.clone(),
            context: context.clone(),
            error_context: truncate_chars(&error.to_string(), self.config.max_error_chars),
            page_errors: page_errors.to_vec(),
        }
    }

    async fn ask(
        &self,
        report: &mut ResolutionReport,
        query: &SuggestionQuery,
    ) -> Option<SuggestionRecord> {
        report.oracle_calls += 1;
        match tokio::time::timeout(self.oracle_timeout, self.oracle.suggest(query)).await {
            Ok(suggestion) => suggestion,
            Err(_) => {
                warn!(
                    locator = %query.signature,
                    timeout_ms = duration_ms(self.oracle_timeout),
                    "oracle timed out"
                );
                None
            }
        }
    }

    async fn execute_suggestion(
        &self,
        request: &HealRequest,
        suggestion: &SuggestionRecord,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        let action = suggestion.action.unwrap_or(request.action);
        self.execute(
            &suggestion.target_locator,
            action,
            request.value.as_deref(),
            timeout,
        )
        .await
    }

    async fn execute(
        &self,
        locator: &str,
        action: Action,
        value: Option<&str>,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        if action == Action::Fill && value.is_none() {
            return Err(ActionError::MissingValue {
                locator: locator.to_string(),
            });
        }
        let work = async {
            match action {
                Action::Click => self.executor.attempt(locator, Action::Click, None, timeout).await,
                Action::Fill => self.executor.attempt(locator, Action::Fill, value, timeout).await,
                Action::Scroll => {
                    self.executor.locate(locator, timeout).await?;
                    self.executor
                        .attempt(locator, Action::Click, None, timeout)
                        .await
                }
            }
        };
        tokio::time::timeout(timeout, work)
            .await
            .unwrap_or_else(|_| Err(ActionError::timeout(locator, timeout)))
    }

    // Storage trouble is logged by the store and never fails a heal
    fn remember(&self, request: &HealRequest, target: &str) {
        if let Err(e) = self.memory.commit(&request.locator, target) {
            debug!(error = %e, "cache commit not persisted");
        }
        if let Err(e) = self
            .memory
            .record_proposal(request.source.clone(), &request.locator, target)
        {
            debug!(error = %e, "proposal not persisted");
        }
    }
}

fn gate(
    tier: Tier,
    thresholds: &TierThresholds,
    suggestion: &SuggestionRecord,
) -> Result<(), FailureReason> {
    let has_action = suggestion.action.is_some();
    if thresholds.accepts(suggestion.confidence, has_action) {
        Ok(())
    } else {
        Err(FailureReason::LowConfidence {
            tier,
            confidence: suggestion.confidence,
            threshold: thresholds.for_suggestion(has_action),
        })
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
