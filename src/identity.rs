//! Caller identity supplied by the authentication layer
//!
//! The engine never authenticates anyone itself. Transports resolve the
//! session to a [`Caller`] and pass it to each operation.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::db::schemas::{RecruiterInfo, UserDoc, UserType};
use crate::types::{EngineError, Result};

/// An authenticated user acting on the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: ObjectId,
    pub user_type: UserType,
    #[serde(default)]
    pub recruiter_info: Option<RecruiterInfo>,
}

impl Caller {
    pub fn new(user_id: ObjectId, user_type: UserType) -> Self {
        Self {
            user_id,
            user_type,
            recruiter_info: None,
        }
    }

    pub fn recruiter(user_id: ObjectId, info: RecruiterInfo) -> Self {
        Self {
            user_id,
            user_type: UserType::Recruiter,
            recruiter_info: Some(info),
        }
    }

    /// Build a caller from a stored account
    pub fn from_user(user: &UserDoc) -> Result<Self> {
        let user_id = user
            ._id
            .ok_or_else(|| EngineError::Internal("User document has no id".into()))?;
        Ok(Self {
            user_id,
            user_type: user.user_type,
            recruiter_info: user.recruiter_info.clone(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    /// Fail unless the caller is an admin
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Forbidden(format!("Only admins can {}", action)))
        }
    }
}

/// Turn an optional session identity into a caller, or fail as unauthenticated
pub fn require_caller(identity: Option<Caller>) -> Result<Caller> {
    identity.ok_or(EngineError::Unauthenticated)
}
