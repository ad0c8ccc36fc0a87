//! User document schema
//!
//! Accounts are owned by the identity provider; the engine reads them to
//! build a caller and writes back only `recruiter_info.company_id`.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Candidate,
    Employee,
    Recruiter,
    Admin,
}

/// Review state of a recruiter's claimed affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecruiterStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Employer details a recruiter claims on their profile
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RecruiterInfo {
    /// Free text, as typed by the recruiter
    #[serde(default)]
    pub company_name: String,

    #[serde(default)]
    pub company_email: Option<String>,

    /// Resolved company; written once by the affiliation resolver
    #[serde(default)]
    pub company_id: Option<ObjectId>,

    #[serde(default)]
    pub status: RecruiterStatus,
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub email: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user_type: UserType,

    #[serde(default)]
    pub recruiter_info: Option<RecruiterInfo>,
}

impl UserDoc {
    pub fn new(email: impl Into<String>, name: impl Into<String>, user_type: UserType) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email: email.into(),
            name: name.into(),
            user_type,
            recruiter_info: None,
        }
    }

    /// A recruiter account claiming the given employer name
    pub fn recruiter(email: impl Into<String>, company_name: impl Into<String>) -> Self {
        let mut user = Self::new(email, "", UserType::Recruiter);
        user.recruiter_info = Some(RecruiterInfo {
            company_name: company_name.into(),
            ..RecruiterInfo::default()
        });
        user
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "recruiter_info.company_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("recruiter_company_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
