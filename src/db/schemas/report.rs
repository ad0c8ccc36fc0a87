//! Report document schema
//!
//! A complaint filed against a review. Reports start `pending` and become
//! terminal once a moderator dismisses or confirms them.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata, Versioned};
use crate::db::schemas::Metadata;
use crate::types::EngineError;

/// Collection name for reports
pub const REPORT_COLLECTION: &str = "reports";

/// What a report points at. Only reviews are reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Review,
    Company,
}

/// Why the reporter objects to the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Inappropriate,
    Fake,
    Offensive,
    ConflictOfInterest,
    Other,
}

impl FromStr for ReportReason {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spam" => Ok(ReportReason::Spam),
            "inappropriate" => Ok(ReportReason::Inappropriate),
            "fake" => Ok(ReportReason::Fake),
            "offensive" => Ok(ReportReason::Offensive),
            "conflict_of_interest" => Ok(ReportReason::ConflictOfInterest),
            "other" => Ok(ReportReason::Other),
            other => Err(EngineError::Validation(format!("Invalid report reason: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Dismissed,
    Confirmed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Dismissed => "dismissed",
            ReportStatus::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderator decision on a pending report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Dismiss,
    Confirm,
}

impl ReportAction {
    /// Terminal status this action resolves a report to
    pub fn resolved_status(&self) -> ReportStatus {
        match self {
            ReportAction::Dismiss => ReportStatus::Dismissed,
            ReportAction::Confirm => ReportStatus::Confirmed,
        }
    }
}

impl FromStr for ReportAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dismiss" => Ok(ReportAction::Dismiss),
            "confirm" => Ok(ReportAction::Confirm),
            other => Err(EngineError::Validation(format!("Invalid report action: {}", other))),
        }
    }
}

/// Report document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default)]
    pub version: i64,

    pub reporter: ObjectId,

    pub target_type: ReportTarget,

    pub target_id: ObjectId,

    pub reason: ReportReason,

    #[serde(default)]
    pub details: Option<String>,

    #[serde(default)]
    pub status: ReportStatus,

    #[serde(default)]
    pub moderator: Option<ObjectId>,

    #[serde(default)]
    pub resolution_note: Option<String>,

    #[serde(default)]
    pub resolved_at: Option<DateTime>,
}

impl ReportDoc {
    /// A new pending report against a review
    pub fn against_review(
        reporter: ObjectId,
        review: ObjectId,
        reason: ReportReason,
        details: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            version: 0,
            reporter,
            target_type: ReportTarget::Review,
            target_id: review,
            reason,
            details,
            status: ReportStatus::Pending,
            moderator: None,
            resolution_note: None,
            resolved_at: None,
        }
    }
}

impl IntoIndexes for ReportDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "target_type": 1, "target_id": 1, "status": 1 },
            Some(
                IndexOptions::builder()
                    .name("target_status_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ReportDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl Versioned for ReportDoc {
    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
