//! Moderation state machine for reviews.
//!
//! A review's moderation state is the pair `(moderation_status, is_visible)`.
//! Transitions are pure functions over [`ModerationState`]; callers apply the
//! result to a stored document inside an atomic modification.
//!
//! ```text
//!                    approve (admin)
//!          ┌──────────────────────────────► Approved, visible
//!          │
//!   Pending ──── reject (admin) ──────────► Rejected, hidden
//!      ▲
//!      │  report filed (external override, from every state)
//!      └──────────────── any ◄─────────────
//!
//!   report dismissed: visibility restored, status untouched
//! ```
//!
//! The admin edges fail on anything but `Pending`. The report override is a
//! separate edge that always succeeds and always lands on `Pending, hidden`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::schemas::{ModerationStatus, ReviewDoc};
use crate::types::EngineError;

/// Moderation-relevant slice of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModerationState {
    pub status: ModerationStatus,
    pub is_visible: bool,
}

impl ModerationState {
    /// State of a freshly submitted review
    pub const INITIAL: ModerationState = ModerationState {
        status: ModerationStatus::Pending,
        is_visible: true,
    };

    pub fn of(review: &ReviewDoc) -> Self {
        Self {
            status: review.moderation_status,
            is_visible: review.is_visible,
        }
    }

    /// Write this state back onto a review
    pub fn apply_to(self, review: &mut ReviewDoc) {
        review.moderation_status = self.status;
        review.is_visible = self.is_visible;
    }

    /// Shown in listings filtered on visibility and approval
    pub fn is_public(&self) -> bool {
        self.is_visible && self.status == ModerationStatus::Approved
    }
}

/// Outcome an admin may choose for a pending review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationDecision {
    Approved,
    Rejected,
}

impl fmt::Display for ModerationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationDecision::Approved => write!(f, "approved"),
            ModerationDecision::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ModerationDecision {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved" => Ok(ModerationDecision::Approved),
            "rejected" => Ok(ModerationDecision::Rejected),
            other => Err(EngineError::Validation(format!(
                "Invalid moderation status: {} (expected approved or rejected)",
                other
            ))),
        }
    }
}

/// Every edge of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationEdge {
    /// Admin decision; only from `Pending`
    Decide(ModerationDecision),
    /// Report filed; from any state
    ReportOverride,
    /// Report dismissed; from any state, visibility only
    RestoreVisibility,
}

/// Rejected transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Review has already been moderated (status: {0})")]
    AlreadyModerated(ModerationStatus),
}

impl From<TransitionError> for EngineError {
    fn from(e: TransitionError) -> Self {
        EngineError::Conflict(e.to_string())
    }
}

/// Admin moderation: `Pending` to `Approved` (visible) or `Rejected` (hidden).
pub fn decide(
    state: ModerationState,
    decision: ModerationDecision,
) -> Result<ModerationState, TransitionError> {
    match (state.status, decision) {
        (ModerationStatus::Pending, ModerationDecision::Approved) => Ok(ModerationState {
            status: ModerationStatus::Approved,
            is_visible: true,
        }),
        (ModerationStatus::Pending, ModerationDecision::Rejected) => Ok(ModerationState {
            status: ModerationStatus::Rejected,
            is_visible: false,
        }),
        (ModerationStatus::Approved | ModerationStatus::Rejected, _) => {
            Err(TransitionError::AlreadyModerated(state.status))
        }
    }
}

/// External override fired by the report workflow. Never fails.
pub fn report_override(_state: ModerationState) -> ModerationState {
    ModerationState {
        status: ModerationStatus::Pending,
        is_visible: false,
    }
}

/// Report dismissed: the review becomes visible again but keeps its status.
pub fn restore_visibility(state: ModerationState) -> ModerationState {
    ModerationState {
        status: state.status,
        is_visible: true,
    }
}

/// Dispatch an edge to its transition function.
pub fn transition(
    state: ModerationState,
    edge: ModerationEdge,
) -> Result<ModerationState, TransitionError> {
    match edge {
        ModerationEdge::Decide(decision) => decide(state, decision),
        ModerationEdge::ReportOverride => Ok(report_override(state)),
        ModerationEdge::RestoreVisibility => Ok(restore_visibility(state)),
    }
}
