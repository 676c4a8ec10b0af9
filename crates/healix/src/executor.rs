//! Action executor contract.
//!
//! The resolution engine never talks to a browser directly; it drives
//! whatever automation backend implements [`Executor`].
//!
//! # Implementations
//!
//! - `MockExecutor` - scripted page for unit and integration tests
//! - browser bindings live with the embedding test harness

use crate::oracle::Action;
use crate::result::ActionError;
use crate::sanitizer::PageSnapshot;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Automation backend the engine acts through
#[async_trait]
pub trait Executor: Send + Sync {
    /// Perform `action` on the element at `locator`
    ///
    /// `value` carries the text for [`Action::Fill`].
    async fn attempt(
        &self,
        locator: &str,
        action: Action,
        value: Option<&str>,
        timeout: Duration,
    ) -> Result<(), ActionError>;

    /// Capture the current page markup
    async fn snapshot(&self) -> Result<PageSnapshot, ActionError>;

    /// Resolve `locator` and scroll it into view
    async fn locate(&self, locator: &str, timeout: Duration) -> Result<(), ActionError>;
}

/// One call observed by [`MockExecutor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    /// `attempt`
    Attempt {
        /// Locator acted on
        locator: String,
        /// Requested action
        action: Action,
        /// Fill value, if any
        value: Option<String>,
        /// Timeout the engine allowed
        timeout: Duration,
    },
    /// `locate`
    Locate {
        /// Locator scrolled to
        locator: String,
        /// Timeout the engine allowed
        timeout: Duration,
    },
    /// `snapshot`
    Snapshot,
}

#[derive(Debug, Default)]
struct MockPage {
    elements: HashSet<String>,
    offscreen: HashSet<String>,
    delays: HashMap<String, Duration>,
    markup: Option<PageSnapshot>,
    filled: HashMap<String, String>,
    history: Vec<ExecutorCall>,
}

/// Mock executor for testing
///
/// Locators resolve only if registered with [`MockExecutor::with_element`].
/// Off-screen elements refuse interaction until `locate` scrolls them into
/// view. Every call is recorded for verification.
#[derive(Debug, Default)]
pub struct MockExecutor {
    page: Mutex<MockPage>,
}

impl MockExecutor {
    /// Create an empty page with no markup
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a working element
    #[must_use]
    pub fn with_element(self, locator: &str) -> Self {
        self.add_element(locator);
        self
    }

    /// Register an element that needs scrolling into view first
    #[must_use]
    pub fn with_offscreen_element(self, locator: &str) -> Self {
        {
            let mut page = self.lock();
            page.elements.insert(locator.to_string());
            page.offscreen.insert(locator.to_string());
        }
        self
    }

    /// Make actions on `locator` take this long
    #[must_use]
    pub fn with_delay(self, locator: &str, delay: Duration) -> Self {
        self.lock().delays.insert(locator.to_string(), delay);
        self
    }

    /// Set the markup returned by `snapshot`
    #[must_use]
    pub fn with_page(self, html: &str) -> Self {
        self.lock().markup = Some(PageSnapshot::new(html));
        self
    }

    /// Register a working element after construction
    pub fn add_element(&self, locator: &str) {
        self.lock().elements.insert(locator.to_string());
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<ExecutorCall> {
        self.lock().history.clone()
    }

    /// Locators passed to `attempt`, in order
    #[must_use]
    pub fn attempted(&self) -> Vec<String> {
        self.lock()
            .history
            .iter()
            .filter_map(|call| match call {
                ExecutorCall::Attempt { locator, .. } => Some(locator.clone()),
                _ => None,
            })
            .collect()
    }

    /// Timeouts passed to `attempt`, in order
    #[must_use]
    pub fn attempt_timeouts(&self) -> Vec<Duration> {
        self.lock()
            .history
            .iter()
            .filter_map(|call| match call {
                ExecutorCall::Attempt { timeout, .. } => Some(*timeout),
                _ => None,
            })
            .collect()
    }

    /// Value last filled into `locator`
    #[must_use]
    pub fn filled_value(&self, locator: &str) -> Option<String> {
        self.lock().filled.get(locator).cloned()
    }

    /// Whether `snapshot` was called
    #[must_use]
    pub fn was_snapshotted(&self) -> bool {
        self.lock()
            .history
            .iter()
            .any(|call| matches!(call, ExecutorCall::Snapshot))
    }

    fn lock(&self) -> MutexGuard<'_, MockPage> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn attempt(
        &self,
        locator: &str,
        action: Action,
        value: Option<&str>,
        timeout: Duration,
    ) -> Result<(), ActionError> {
        let delay = {
            let mut page = self.lock();
            page.history.push(ExecutorCall::Attempt {
                locator: locator.to_string(),
                action,
                value: value.map(ToString::to_string),
                timeout,
            });
            page.delays.get(locator).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut page = self.lock();
        if !page.elements.contains(locator) {
            return Err(ActionError::not_found(locator));
        }
        if page.offscreen.contains(locator) {
            return Err(ActionError::NotInteractable {
                locator: locator.to_string(),
                message: "element is outside the viewport".to_string(),
            });
        }
        if action == Action::Fill {
            let value = value.ok_or_else(|| ActionError::MissingValue {
                locator: locator.to_string(),
            })?;
            page.filled.insert(locator.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<PageSnapshot, ActionError> {
        let mut page = self.lock();
        page.history.push(ExecutorCall::Snapshot);
        page.markup
            .clone()
            .ok_or_else(|| ActionError::driver("No mock page markup set"))
    }

    async fn locate(&self, locator: &str, timeout: Duration) -> Result<(), ActionError> {
        let mut page = self.lock();
        page.history.push(ExecutorCall::Locate {
            locator: locator.to_string(),
            timeout,
        });
        if !page.elements.contains(locator) {
            return Err(ActionError::not_found(locator));
        }
        page.offscreen.remove(locator);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_unknown_locator_not_found() {
        let exec = MockExecutor::new();
        let err = exec.attempt("#nope", Action::Click, None, T).await.unwrap_err();
        assert_eq!(err, ActionError::not_found("#nope"));
        assert_eq!(exec.attempted(), vec!["#nope"]);
    }

    #[tokio::test]
    async fn test_fill_records_value() {
        let exec = MockExecutor::new().with_element("#user");
        exec.attempt("#user", Action::Fill, Some("alice"), T)
            .await
            .unwrap();
        assert_eq!(exec.filled_value("#user").as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_fill_without_value() {
        let exec = MockExecutor::new().with_element("#user");
        let err = exec.attempt("#user", Action::Fill, None, T).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingValue { .. }));
    }

    #[tokio::test]
    async fn test_offscreen_needs_locate() {
        let exec = MockExecutor::new().with_offscreen_element("#footer-link");
        assert!(exec
            .attempt("#footer-link", Action::Click, None, T)
            .await
            .is_err());
        exec.locate("#footer-link", T).await.unwrap();
        exec.attempt("#footer-link", Action::Click, None, T)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_snapshot_without_markup_errors() {
        let exec = MockExecutor::new();
        assert!(exec.snapshot().await.is_err());
        assert!(exec.was_snapshotted());

        let exec = MockExecutor::new().with_page("<p>hi</p>");
        assert_eq!(exec.snapshot().await.unwrap().as_str(), "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_added_element_resolves() {
        let exec = MockExecutor::new();
        exec.add_element("#late");
        exec.attempt("#late", Action::Click, None, T).await.unwrap();
    }
}
