//! Shared error type for the review engine
//!
//! Every operation surfaces failures synchronously as an `EngineError`.
//! Transports map them onto status codes with [`EngineError::status_code`].

/// Errors returned by engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Review, report, company or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The target is not in a state that allows the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is authenticated but not allowed to do this
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// No caller identity where one is required
    #[error("Authentication required")]
    Unauthenticated,

    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// HTTP-equivalent status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::NotFound(_) => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Forbidden(_) => 403,
            EngineError::Unauthenticated => 401,
            EngineError::Validation(_) => 400,
            EngineError::Database(_) | EngineError::Internal(_) => 500,
        }
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(e: mongodb::error::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<bson::ser::Error> for EngineError {
    fn from(e: bson::ser::Error) -> Self {
        EngineError::Internal(format!("BSON serialization failed: {}", e))
    }
}

impl From<bson::de::Error> for EngineError {
    fn from(e: bson::de::Error) -> Self {
        EngineError::Internal(format!("BSON deserialization failed: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Parse a 24-hex document id, reporting a validation error on failure
pub fn parse_object_id(field: &str, raw: &str) -> Result<bson::oid::ObjectId> {
    bson::oid::ObjectId::parse_str(raw.trim())
        .map_err(|_| EngineError::Validation(format!("{} is not a valid id: {}", field, raw)))
}
