//! Review document schema
//!
//! A single candidate or employee assessment of one company, together with
//! its moderation flags, vote ledger and optional recruiter reply.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata, Versioned};
use crate::db::schemas::Metadata;
use crate::types::EngineError;

/// Collection name for reviews
pub const REVIEW_COLLECTION: &str = "reviews";

/// Moderation lifecycle of a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of relationship the author had with the company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Interview,
    #[default]
    Employee,
    Intern,
    Contractor,
}

impl FromStr for ReviewType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interview" => Ok(ReviewType::Interview),
            "employee" => Ok(ReviewType::Employee),
            "intern" => Ok(ReviewType::Intern),
            "contractor" => Ok(ReviewType::Contractor),
            other => Err(EngineError::Validation(format!("Invalid review type: {}", other))),
        }
    }
}

/// Per-dimension ratings, each 1-5
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubRatings {
    pub work_life_balance: i32,
    pub compensation: i32,
    pub career_growth: i32,
    pub management: i32,
    pub culture: i32,
}

impl SubRatings {
    /// Named values, in display order
    pub fn named(&self) -> [(&'static str, i32); 5] {
        [
            ("work_life_balance", self.work_life_balance),
            ("compensation", self.compensation),
            ("career_growth", self.career_growth),
            ("management", self.management),
            ("culture", self.culture),
        ]
    }
}

/// The single recruiter (or admin) reply a review may carry
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReviewReply {
    /// Original responder; preserved when the reply is edited
    pub responder: ObjectId,
    pub content: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Review document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReviewDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Bumped on every write; guards read-modify-write cycles
    #[serde(default)]
    pub version: i64,

    /// Absent for reviews submitted without an account
    #[serde(default)]
    pub author: Option<ObjectId>,

    pub company: ObjectId,

    #[serde(default)]
    pub review_type: ReviewType,

    pub job_title: String,

    pub ratings: SubRatings,

    pub overall_rating: i32,

    pub title: String,

    pub body: String,

    #[serde(default)]
    pub pros: String,

    #[serde(default)]
    pub cons: String,

    #[serde(default)]
    pub recommend_to_friend: bool,

    #[serde(default)]
    pub approves_of_ceo: Option<bool>,

    #[serde(default)]
    pub moderation_status: ModerationStatus,

    #[serde(default = "default_true")]
    pub is_visible: bool,

    #[serde(default)]
    pub moderated_by: Option<ObjectId>,

    #[serde(default)]
    pub moderation_reason: Option<String>,

    #[serde(default)]
    pub moderated_at: Option<DateTime>,

    #[serde(default)]
    pub helpful_voters: Vec<ObjectId>,

    #[serde(default)]
    pub unhelpful_voters: Vec<ObjectId>,

    #[serde(default)]
    pub helpful_votes: i32,

    #[serde(default)]
    pub unhelpful_votes: i32,

    /// Not kept equal to helpful + unhelpful; see the vote ledger
    #[serde(default)]
    pub total_votes: i32,

    #[serde(default)]
    pub reply: Option<ReviewReply>,
}

fn default_true() -> bool {
    true
}

/// Author-supplied content of a new review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub company: ObjectId,
    pub review_type: ReviewType,
    pub job_title: String,
    pub ratings: SubRatings,
    pub overall_rating: i32,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub pros: String,
    #[serde(default)]
    pub cons: String,
    #[serde(default)]
    pub recommend_to_friend: bool,
    #[serde(default)]
    pub approves_of_ceo: Option<bool>,
}

impl ReviewDoc {
    /// Build a pending, visible review with an empty vote ledger
    pub fn new(author: Option<ObjectId>, fields: NewReview) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            version: 0,
            author,
            company: fields.company,
            review_type: fields.review_type,
            job_title: fields.job_title,
            ratings: fields.ratings,
            overall_rating: fields.overall_rating,
            title: fields.title,
            body: fields.body,
            pros: fields.pros,
            cons: fields.cons,
            recommend_to_friend: fields.recommend_to_friend,
            approves_of_ceo: fields.approves_of_ceo,
            moderation_status: ModerationStatus::Pending,
            is_visible: true,
            moderated_by: None,
            moderation_reason: None,
            moderated_at: None,
            helpful_voters: Vec::new(),
            unhelpful_voters: Vec::new(),
            helpful_votes: 0,
            unhelpful_votes: 0,
            total_votes: 0,
            reply: None,
        }
    }

    /// Eligible for public listings and for recruiter replies
    pub fn is_public(&self) -> bool {
        self.is_visible && self.moderation_status == ModerationStatus::Approved
    }
}

impl IntoIndexes for ReviewDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Public listing and reputation aggregation
            (
                doc! { "company": 1, "moderation_status": 1, "is_visible": 1 },
                Some(
                    IndexOptions::builder()
                        .name("company_public_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "author": 1 },
                Some(
                    IndexOptions::builder()
                        .name("author_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ReviewDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Versioned for ReviewDoc {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::review_fields;

    #[test]
    fn test_new_review_defaults() {
        let review = ReviewDoc::new(None, review_fields(ObjectId::new(), 4));
        assert_eq!(review.moderation_status, ModerationStatus::Pending);
        assert!(review.is_visible);
        assert!(!review.is_public());
        assert_eq!(review.total_votes, 0);
        assert!(review.reply.is_none());
    }

    #[test]
    fn test_missing_moderation_fields_deserialize_to_defaults() {
        let company = ObjectId::new();
        let stored = doc! {
            "company": company,
            "job_title": "QA",
            "ratings": {
                "work_life_balance": 3, "compensation": 3, "career_growth": 3,
                "management": 3, "culture": 3,
            },
            "overall_rating": 3,
            "title": "ok",
            "body": "fine",
        };
        let review: ReviewDoc = bson::from_document(stored).unwrap();
        assert_eq!(review.moderation_status, ModerationStatus::Pending);
        assert!(review.is_visible);
        assert!(review.helpful_voters.is_empty());
    }

    #[test]
    fn test_review_type_parse() {
        assert_eq!("Intern".parse::<ReviewType>().unwrap(), ReviewType::Intern);
        assert!("freelancer".parse::<ReviewType>().is_err());
    }
}
