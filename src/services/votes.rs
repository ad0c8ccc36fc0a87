//! Vote Ledger
//!
//! Each review keeps two voter sets plus three counters. A user sits in at
//! most one set at a time. `total_votes` is not the sum of the other two
//! counters: a first vote of `unhelpful` leaves it unchanged, while any
//! removal decrements it (floored at zero).

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::ReviewDoc;
use crate::store::ReviewRepository;
use crate::types::{EngineError, Result};

/// A single user's opinion of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Helpful,
    Unhelpful,
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteValue::Helpful => write!(f, "helpful"),
            VoteValue::Unhelpful => write!(f, "unhelpful"),
        }
    }
}

impl FromStr for VoteValue {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "helpful" => Ok(VoteValue::Helpful),
            "unhelpful" => Ok(VoteValue::Unhelpful),
            other => Err(EngineError::Validation(format!(
                "Invalid vote: {} (expected helpful or unhelpful)",
                other
            ))),
        }
    }
}

/// Counters returned to the voter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub helpful_votes: i32,
    pub unhelpful_votes: i32,
    pub total_votes: i32,
    pub user_vote: Option<VoteValue>,
}

impl VoteSummary {
    pub fn of(review: &ReviewDoc, voter: &ObjectId) -> Self {
        Self {
            helpful_votes: review.helpful_votes,
            unhelpful_votes: review.unhelpful_votes,
            total_votes: review.total_votes,
            user_vote: current_vote(review, voter),
        }
    }
}

/// Which set, if any, `voter` is in
pub fn current_vote(review: &ReviewDoc, voter: &ObjectId) -> Option<VoteValue> {
    if review.helpful_voters.contains(voter) {
        Some(VoteValue::Helpful)
    } else if review.unhelpful_voters.contains(voter) {
        Some(VoteValue::Unhelpful)
    } else {
        None
    }
}

/// Apply one vote to the ledger in place. Returns false for a repeat vote.
pub fn apply_vote(review: &mut ReviewDoc, voter: ObjectId, value: VoteValue) -> bool {
    let previous = current_vote(review, &voter);
    if previous == Some(value) {
        return false;
    }

    match previous {
        Some(VoteValue::Helpful) => {
            review.helpful_voters.retain(|v| *v != voter);
            review.helpful_votes = (review.helpful_votes - 1).max(0);
            review.total_votes = (review.total_votes - 1).max(0);
        }
        Some(VoteValue::Unhelpful) => {
            review.unhelpful_voters.retain(|v| *v != voter);
            review.unhelpful_votes = (review.unhelpful_votes - 1).max(0);
            review.total_votes = (review.total_votes - 1).max(0);
        }
        None => {}
    }

    match value {
        VoteValue::Helpful => {
            review.helpful_voters.push(voter);
            review.helpful_votes += 1;
            review.total_votes += 1;
        }
        VoteValue::Unhelpful => {
            // total_votes deliberately untouched
            review.unhelpful_voters.push(voter);
            review.unhelpful_votes += 1;
        }
    }
    true
}

/// Records votes against stored reviews
pub struct VoteLedger {
    repo: Arc<dyn ReviewRepository>,
}

impl VoteLedger {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo }
    }

    /// Cast or change `voter`'s vote. Hidden and missing reviews are not found.
    pub async fn vote(
        &self,
        review_id: &ObjectId,
        voter: ObjectId,
        value: VoteValue,
    ) -> Result<VoteSummary> {
        let not_found = || EngineError::NotFound(format!("Review {} not found", review_id));

        let review = self
            .repo
            .modify_review(review_id, &mut |review: &mut ReviewDoc| {
                if !review.is_visible {
                    return Err(not_found());
                }
                if !apply_vote(review, voter, value) {
                    debug!("Repeat {} vote by {} on {}", value, voter, review_id);
                }
                Ok(())
            })
            .await?
            .ok_or_else(not_found)?;

        Ok(VoteSummary::of(&review, &voter))
    }

    pub async fn user_vote(
        &self,
        review_id: &ObjectId,
        voter: &ObjectId,
    ) -> Result<Option<VoteValue>> {
        let review = self
            .repo
            .find_review(review_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Review {} not found", review_id)))?;
        Ok(current_vote(&review, voter))
    }
}
