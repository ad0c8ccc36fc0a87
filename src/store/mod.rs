//! Repository abstraction for review engine persistence.
//!
//! The engine talks to storage only through [`ReviewRepository`] and
//! [`NotificationSink`]. Two backends are provided: MongoDB for deployments
//! and an in-memory store for tests and local runs.
//!
//! Single-document mutations go through `modify_review` / `modify_report`,
//! which apply a pure in-memory edit atomically with respect to other
//! writers of the same document.

mod memory;
mod mongo;

pub use memory::InMemoryRepository;
pub use mongo::MongoRepository;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{CompanyDoc, NotificationDoc, ReportDoc, ReviewDoc, UserDoc};
use crate::types::Result;

/// In-place edit of a review; returning an error aborts the write
pub type ReviewMutation<'a> = &'a mut (dyn FnMut(&mut ReviewDoc) -> Result<()> + Send);

/// In-place edit of a report; returning an error aborts the write
pub type ReportMutation<'a> = &'a mut (dyn FnMut(&mut ReportDoc) -> Result<()> + Send);

/// Count and mean of `overall_rating` over a company's approved, visible reviews
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub count: i64,
    /// `None` when there are no matching reviews
    pub average: Option<f64>,
}

/// Storage operations used by the engine.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    // =========================================================================
    // Reviews
    // =========================================================================

    /// Insert a review, returning its new id.
    async fn insert_review(&self, review: ReviewDoc) -> Result<ObjectId>;

    async fn find_review(&self, id: &ObjectId) -> Result<Option<ReviewDoc>>;

    /// Atomically apply `mutate` to a review.
    ///
    /// Returns the stored document after the edit, or `None` if the review
    /// does not exist. Errors returned by `mutate` propagate unchanged and
    /// leave the document untouched.
    async fn modify_review(
        &self,
        id: &ObjectId,
        mutate: ReviewMutation<'_>,
    ) -> Result<Option<ReviewDoc>>;

    /// Reviews of a company with `is_visible = true AND moderation_status = approved`.
    async fn list_public_reviews(&self, company: &ObjectId) -> Result<Vec<ReviewDoc>>;

    /// Aggregate over the same predicate as `list_public_reviews`.
    async fn approved_rating_summary(&self, company: &ObjectId) -> Result<RatingSummary>;

    // =========================================================================
    // Companies
    // =========================================================================

    async fn insert_company(&self, company: CompanyDoc) -> Result<ObjectId>;

    async fn find_company(&self, id: &ObjectId) -> Result<Option<CompanyDoc>>;

    /// Companies whose name equals `name`, ignoring case.
    async fn find_companies_by_name(&self, name: &str) -> Result<Vec<CompanyDoc>>;

    /// Overwrite a company's reputation summary. Returns false if the
    /// company does not exist.
    async fn set_company_reputation(
        &self,
        id: &ObjectId,
        overall_rating: f64,
        total_reviews: i64,
    ) -> Result<bool>;

    // =========================================================================
    // Reports
    // =========================================================================

    async fn insert_report(&self, report: ReportDoc) -> Result<ObjectId>;

    async fn find_report(&self, id: &ObjectId) -> Result<Option<ReportDoc>>;

    /// Atomically apply `mutate` to a report. Same contract as `modify_review`.
    async fn modify_report(
        &self,
        id: &ObjectId,
        mutate: ReportMutation<'_>,
    ) -> Result<Option<ReportDoc>>;

    /// Ids of the pending reports filed against `review`.
    async fn pending_report_ids(&self, review: &ObjectId) -> Result<Vec<ObjectId>>;

    /// Mark the listed reports against `review` as dismissed by `moderator`,
    /// skipping any that are no longer pending. Returns how many changed.
    async fn dismiss_pending_reports(
        &self,
        review: &ObjectId,
        reports: &[ObjectId],
        moderator: &ObjectId,
        note: &str,
    ) -> Result<u64>;

    // =========================================================================
    // Users
    // =========================================================================

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>>;

    /// Persist a resolved employer onto a recruiter's profile.
    async fn set_recruiter_company(&self, user: &ObjectId, company: &ObjectId) -> Result<()>;
}

/// Destination for user notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: NotificationDoc) -> Result<ObjectId>;
}
