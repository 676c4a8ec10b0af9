//! Proposal ledger records.

use crate::provenance::SourceLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Review state of a proposal
///
/// The engine only ever creates `PendingReview` entries; the other states
/// are set by a human reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Awaiting review
    #[default]
    PendingReview,
    /// Reviewer promoted the fix into the test code
    Accepted,
    /// Reviewer declined the fix
    Rejected,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PendingReview => "pending_review",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending_review" | "pending" => Ok(Self::PendingReview),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown proposal status '{other}'")),
        }
    }
}

/// A verified fix awaiting promotion into permanent test code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Ledger-unique identifier
    pub id: Uuid,
    /// Where the healed action is issued
    pub source_location: SourceLocation,
    /// Locator that failed
    pub original_locator: String,
    /// Locator that worked in its place
    pub suggested_locator: String,
    /// Review state
    pub status: ProposalStatus,
    /// When the fix was verified
    pub recorded_at: DateTime<Utc>,
}

impl Proposal {
    /// New pending proposal stamped now
    #[must_use]
    pub fn new(
        source_location: SourceLocation,
        original_locator: impl Into<String>,
        suggested_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_location,
            original_locator: original_locator.into(),
            suggested_locator: suggested_locator.into(),
            status: ProposalStatus::PendingReview,
            recorded_at: Utc::now(),
        }
    }

    /// Whether the proposal still awaits review
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::PendingReview
    }
}
