//! In-memory implementation of `ReviewRepository` and `NotificationSink`.
//!
//! Documents live in `DashMap`s keyed by id. `modify_*` holds the entry's
//! write guard while the mutation runs, so edits to one document are
//! serialized. All state is lost on restart.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::DateTime;
use dashmap::DashMap;

use super::{
    NotificationSink, RatingSummary, ReportMutation, ReviewMutation, ReviewRepository,
};
use crate::db::mongo::{MutMetadata, Versioned};
use crate::db::schemas::{
    CompanyDoc, Metadata, ModerationStatus, NotificationDoc, RecruiterInfo, ReportDoc,
    ReportStatus, ReviewDoc, UserDoc,
};
use crate::types::{EngineError, Result};

/// In-memory repository.
pub struct InMemoryRepository {
    reviews: DashMap<ObjectId, ReviewDoc>,
    companies: DashMap<ObjectId, CompanyDoc>,
    reports: DashMap<ObjectId, ReportDoc>,
    users: DashMap<ObjectId, UserDoc>,
    notifications: DashMap<ObjectId, NotificationDoc>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            reviews: DashMap::new(),
            companies: DashMap::new(),
            reports: DashMap::new(),
            users: DashMap::new(),
            notifications: DashMap::new(),
        }
    }

    /// Register an account (normally owned by the identity provider)
    pub fn insert_user(&self, mut user: UserDoc) -> ObjectId {
        let id = user._id.unwrap_or_else(ObjectId::new);
        user._id = Some(id);
        user.metadata = Metadata::new();
        self.users.insert(id, user);
        id
    }

    /// Notifications addressed to `recipient`
    pub fn notifications_for(&self, recipient: &ObjectId) -> Vec<NotificationDoc> {
        self.notifications
            .iter()
            .filter(|n| n.recipient == *recipient)
            .map(|n| n.clone())
            .collect()
    }

    /// Reports filed against `review`
    pub fn reports_for(&self, review: &ObjectId) -> Vec<ReportDoc> {
        self.reports
            .iter()
            .filter(|r| r.target_id == *review)
            .map(|r| r.clone())
            .collect()
    }

    fn modify_in<T>(
        map: &DashMap<ObjectId, T>,
        id: &ObjectId,
        mutate: &mut dyn FnMut(&mut T) -> Result<()>,
    ) -> Result<Option<T>>
    where
        T: Clone + PartialEq + Versioned + MutMetadata,
    {
        let Some(mut entry) = map.get_mut(id) else {
            return Ok(None);
        };

        let mut next = entry.clone();
        mutate(&mut next)?;
        if next != *entry {
            next.set_version(entry.version() + 1);
            next.mut_metadata().touch();
            *entry = next;
        }
        Ok(Some(entry.clone()))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryRepository {
    async fn insert_review(&self, mut review: ReviewDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        review._id = Some(id);
        review.metadata = Metadata::new();
        self.reviews.insert(id, review);
        Ok(id)
    }

    async fn find_review(&self, id: &ObjectId) -> Result<Option<ReviewDoc>> {
        Ok(self.reviews.get(id).map(|r| r.clone()))
    }

    async fn modify_review(
        &self,
        id: &ObjectId,
        mutate: ReviewMutation<'_>,
    ) -> Result<Option<ReviewDoc>> {
        Self::modify_in(&self.reviews, id, mutate)
    }

    async fn list_public_reviews(&self, company: &ObjectId) -> Result<Vec<ReviewDoc>> {
        Ok(self
            .reviews
            .iter()
            .filter(|r| r.company == *company && r.is_public())
            .map(|r| r.clone())
            .collect())
    }

    async fn approved_rating_summary(&self, company: &ObjectId) -> Result<RatingSummary> {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|r| {
                r.company == *company
                    && r.is_visible
                    && r.moderation_status == ModerationStatus::Approved
            })
            .map(|r| r.overall_rating)
            .collect();

        let count = ratings.len() as i64;
        let average = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64)
        };
        Ok(RatingSummary { count, average })
    }

    async fn insert_company(&self, mut company: CompanyDoc) -> Result<ObjectId> {
        if self.companies.iter().any(|c| c.slug == company.slug) {
            return Err(EngineError::Conflict(format!(
                "Company slug already exists: {}",
                company.slug
            )));
        }
        let id = ObjectId::new();
        company._id = Some(id);
        company.metadata = Metadata::new();
        self.companies.insert(id, company);
        Ok(id)
    }

    async fn find_company(&self, id: &ObjectId) -> Result<Option<CompanyDoc>> {
        Ok(self.companies.get(id).map(|c| c.clone()))
    }

    async fn find_companies_by_name(&self, name: &str) -> Result<Vec<CompanyDoc>> {
        let wanted = name.to_lowercase();
        Ok(self
            .companies
            .iter()
            .filter(|c| c.name.to_lowercase() == wanted)
            .map(|c| c.clone())
            .collect())
    }

    async fn set_company_reputation(
        &self,
        id: &ObjectId,
        overall_rating: f64,
        total_reviews: i64,
    ) -> Result<bool> {
        match self.companies.get_mut(id) {
            Some(mut company) => {
                company.overall_rating = overall_rating;
                company.total_reviews = total_reviews;
                company.metadata.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_report(&self, mut report: ReportDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        report._id = Some(id);
        report.metadata = Metadata::new();
        self.reports.insert(id, report);
        Ok(id)
    }

    async fn find_report(&self, id: &ObjectId) -> Result<Option<ReportDoc>> {
        Ok(self.reports.get(id).map(|r| r.clone()))
    }

    async fn modify_report(
        &self,
        id: &ObjectId,
        mutate: ReportMutation<'_>,
    ) -> Result<Option<ReportDoc>> {
        Self::modify_in(&self.reports, id, mutate)
    }

    async fn pending_report_ids(&self, review: &ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self
            .reports
            .iter()
            .filter(|r| r.target_id == *review && r.status == ReportStatus::Pending)
            .map(|r| *r.key())
            .collect())
    }

    async fn dismiss_pending_reports(
        &self,
        review: &ObjectId,
        reports: &[ObjectId],
        moderator: &ObjectId,
        note: &str,
    ) -> Result<u64> {
        let mut dismissed = 0;
        for id in reports {
            let Some(mut report) = self.reports.get_mut(id) else {
                continue;
            };
            if report.target_id != *review || report.status != ReportStatus::Pending {
                continue;
            }
            report.status = ReportStatus::Dismissed;
            report.moderator = Some(*moderator);
            report.resolution_note = Some(note.to_string());
            report.resolved_at = Some(DateTime::now());
            report.version += 1;
            report.metadata.touch();
            dismissed += 1;
        }
        Ok(dismissed)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn set_recruiter_company(&self, user: &ObjectId, company: &ObjectId) -> Result<()> {
        let mut account = self
            .users
            .get_mut(user)
            .ok_or_else(|| EngineError::NotFound(format!("User {} not found", user)))?;
        account
            .recruiter_info
            .get_or_insert_with(RecruiterInfo::default)
            .company_id = Some(*company);
        account.metadata.touch();
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for InMemoryRepository {
    async fn create(&self, mut notification: NotificationDoc) -> Result<ObjectId> {
        let id = ObjectId::new();
        notification._id = Some(id);
        notification.metadata = Metadata::new();
        self.notifications.insert(id, notification);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::ReportReason;
    use crate::testing::review_fields;

    #[tokio::test]
    async fn test_modify_review_bumps_version_only_on_change() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_review(ReviewDoc::new(None, review_fields(ObjectId::new(), 4)))
            .await
            .unwrap();

        let unchanged = repo.modify_review(&id, &mut |_| Ok(())).await.unwrap().unwrap();
        assert_eq!(unchanged.version, 0);

        let changed = repo
            .modify_review(&id, &mut |r| {
                r.is_visible = false;
                Ok(())
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changed.version, 1);
        assert!(!changed.is_visible);
    }

    #[tokio::test]
    async fn test_modify_review_error_leaves_document_untouched() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_review(ReviewDoc::new(None, review_fields(ObjectId::new(), 4)))
            .await
            .unwrap();

        let result = repo
            .modify_review(&id, &mut |r| {
                r.helpful_votes = 99;
                Err(EngineError::Conflict("nope".into()))
            })
            .await;
        assert!(matches!(result, Err(EngineError::Conflict(_))));

        let stored = repo.find_review(&id).await.unwrap().unwrap();
        assert_eq!(stored.helpful_votes, 0);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_modify_missing_review_returns_none() {
        let repo = InMemoryRepository::new();
        let result = repo
            .modify_review(&ObjectId::new(), &mut |_| Ok(()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_company_name_lookup_ignores_case() {
        let repo = InMemoryRepository::new();
        let id = repo
            .insert_company(CompanyDoc::new("Acme Corp", "acme-corp"))
            .await
            .unwrap();

        let hits = repo.find_companies_by_name("aCME corp").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]._id, Some(id));
        assert!(repo.find_companies_by_name("Acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert_company(CompanyDoc::new("Acme", "acme")).await.unwrap();
        let err = repo
            .insert_company(CompanyDoc::new("Acme Two", "acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dismiss_pending_reports_only_touches_listed_pending() {
        let repo = InMemoryRepository::new();
        let review = ObjectId::new();
        let moderator = ObjectId::new();
        let file = |reason| ReportDoc::against_review(ObjectId::new(), review, reason, None);

        let pending = repo.insert_report(file(ReportReason::Spam)).await.unwrap();
        let mut confirmed = file(ReportReason::Fake);
        confirmed.status = ReportStatus::Confirmed;
        let confirmed = repo.insert_report(confirmed).await.unwrap();

        let listed = repo.pending_report_ids(&review).await.unwrap();
        assert_eq!(listed, vec![pending]);

        let late = repo.insert_report(file(ReportReason::Other)).await.unwrap();
        let count = repo
            .dismiss_pending_reports(&review, &[pending, confirmed], &moderator, "approved")
            .await
            .unwrap();
        assert_eq!(count, 1);

        let pending = repo.find_report(&pending).await.unwrap().unwrap();
        assert_eq!(pending.status, ReportStatus::Dismissed);
        assert_eq!(pending.moderator, Some(moderator));
        let confirmed = repo.find_report(&confirmed).await.unwrap().unwrap();
        assert_eq!(confirmed.status, ReportStatus::Confirmed);
        let late = repo.find_report(&late).await.unwrap().unwrap();
        assert_eq!(late.status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_recruiter_company_unknown_user() {
        let repo = InMemoryRepository::new();
        let err = repo
            .set_recruiter_company(&ObjectId::new(), &ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
