//! Healix: self-healing locator resolution for UI tests
//!
//! When a test's locator stops matching, Healix looks for a working
//! replacement instead of failing the test outright. A verified replacement
//! is cached for the next run and recorded as a proposal for a human to
//! promote into the test code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ fails ┌──────────────────────────────────────────────┐
//! │ test action  │──────►│ ResolutionEngine                             │
//! └──────────────┘       │  ATTEMPT_ORIGINAL → OBSERVE → QUERY_A        │
//!        ▲               │     → EXECUTE_A → (QUERY_B → EXECUTE_B)?     │
//!        │               └──┬─────────────┬──────────────┬──────────────┘
//!        │ healed locator   │             │              │
//!        │ or exhausted     ▼             ▼              ▼
//!        │          ┌────────────┐ ┌─────────────┐ ┌────────────┐
//!        └──────────│ Executor   │ │ Sanitizer + │ │ MemoryStore│
//!                   │ (browser)  │ │ Oracle      │ │ cache+ledger│
//!                   └────────────┘ └─────────────┘ └────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let memory = Arc::new(MemoryStore::from_config(&config.storage));
//! let oracle = Arc::new(OracleClient::new(config.oracle.clone()));
//! let engine = ResolutionEngine::from_config(&config, browser, oracle, memory);
//!
//! let locator = engine.resolve(&HealRequest::click("#login-btn")).await?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// YAML-backed configuration
pub mod config;

/// Two-tier healing state machine
#[allow(clippy::missing_errors_doc)]
pub mod engine;

/// Action executor contract and mock
pub mod executor;

/// Cache and proposal ledger
#[allow(clippy::missing_errors_doc)]
pub mod memory;

/// Failure-keyword scan of rendered pages
pub mod observe;

/// Suggestion oracle contract, parsing and HTTP client
#[allow(clippy::missing_errors_doc)]
pub mod oracle;

/// Call-site capture for proposals
pub mod provenance;

mod result;

/// Snapshot sanitizer
pub mod sanitizer;

pub use config::{
    EngineConfig, HealixConfig, OracleApi, OracleConfig, SanitizerConfig, StorageConfig,
    TierThresholds, TimeoutLadder, DEFAULT_CONFIG_FILE,
};
pub use engine::{
    HealRequest, ResolutionEngine, ResolutionOutcome, ResolutionReport, ResolutionState,
};
pub use executor::{Executor, ExecutorCall, MockExecutor};
pub use memory::{
    corrupt_path, CacheMap, InMemoryBackend, JsonFileBackend, MemoryBackend, MemoryStore,
    Proposal, ProposalStatus,
};
pub use observe::observe_page_errors;
#[cfg(feature = "http")]
pub use oracle::OracleClient;
pub use oracle::{Action, ScriptedOracle, SuggestionProvider, SuggestionQuery, SuggestionRecord};
pub use provenance::SourceLocation;
pub use result::{
    ActionError, FailureReason, HealingExhausted, HealixError, HealixResult, OracleError,
    StorageError, Tier,
};
pub use sanitizer::{sanitize, PageSnapshot, SanitizedContext, Sanitizer};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::engine::*;
    pub use super::executor::*;
    pub use super::memory::*;
    pub use super::observe::*;
    pub use super::oracle::*;
    pub use super::provenance::SourceLocation;
    pub use super::result::*;
    pub use super::sanitizer::*;
    pub use super::source_location;
}
