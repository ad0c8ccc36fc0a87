//! Company reputation aggregator
//!
//! Rewrites a company's `overall_rating` / `total_reviews` from its approved,
//! visible reviews. The engine runs it when a review is created and nowhere
//! else in the lifecycle, so moderation decisions do not move the summary
//! until the next creation for the same company.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::store::{RatingSummary, ReviewRepository};
use crate::types::{EngineError, Result};

/// Summary written onto the company record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationSummary {
    pub overall_rating: f64,
    pub total_reviews: i64,
}

impl From<RatingSummary> for ReputationSummary {
    fn from(summary: RatingSummary) -> Self {
        Self {
            overall_rating: summary.average.map(round2).unwrap_or(0.0),
            total_reviews: summary.count,
        }
    }
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct ReputationAggregator {
    repo: Arc<dyn ReviewRepository>,
}

impl ReputationAggregator {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo }
    }

    /// Rescan `company`'s public reviews and overwrite its summary
    pub async fn recompute(&self, company: &ObjectId) -> Result<ReputationSummary> {
        let summary = ReputationSummary::from(self.repo.approved_rating_summary(company).await?);

        let updated = self
            .repo
            .set_company_reputation(company, summary.overall_rating, summary.total_reviews)
            .await?;
        if !updated {
            return Err(EngineError::NotFound(format!("Company {} not found", company)));
        }

        info!(
            company = %company,
            overall_rating = summary.overall_rating,
            total_reviews = summary.total_reviews,
            "Company reputation recomputed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{CompanyDoc, ModerationStatus, ReviewDoc};
    use crate::store::InMemoryRepository;
    use crate::testing::review_fields;

    async fn insert(
        repo: &InMemoryRepository,
        company: ObjectId,
        overall: i32,
        status: ModerationStatus,
        visible: bool,
    ) {
        let mut review = ReviewDoc::new(None, review_fields(company, overall));
        review.moderation_status = status;
        review.is_visible = visible;
        repo.insert_review(review).await.unwrap();
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(4.5), 4.5);
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(11.0 / 3.0), 3.67);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = ReputationSummary::from(RatingSummary::default());
        assert_eq!(summary.overall_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);
    }

    #[tokio::test]
    async fn test_only_approved_visible_reviews_count() {
        let repo = Arc::new(InMemoryRepository::new());
        let company = repo
            .insert_company(CompanyDoc::new("Globex", "globex"))
            .await
            .unwrap();
        let other = repo
            .insert_company(CompanyDoc::new("Initech", "initech"))
            .await
            .unwrap();

        insert(&repo, company, 4, ModerationStatus::Approved, true).await;
        insert(&repo, company, 5, ModerationStatus::Approved, true).await;
        insert(&repo, company, 1, ModerationStatus::Pending, true).await;
        insert(&repo, company, 1, ModerationStatus::Approved, false).await;
        insert(&repo, company, 2, ModerationStatus::Rejected, false).await;
        insert(&repo, other, 1, ModerationStatus::Approved, true).await;

        let aggregator = ReputationAggregator::new(repo.clone());
        let summary = aggregator.recompute(&company).await.unwrap();
        assert_eq!(summary.total_reviews, 2);
        assert_eq!(summary.overall_rating, 4.5);

        let stored = repo.find_company(&company).await.unwrap().unwrap();
        assert_eq!(stored.total_reviews, 2);
        assert_eq!(stored.overall_rating, 4.5);
    }

    #[tokio::test]
    async fn test_company_without_public_reviews_resets_to_zero() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut company = CompanyDoc::new("Hooli", "hooli");
        company.overall_rating = 3.2;
        company.total_reviews = 7;
        let company = repo.insert_company(company).await.unwrap();

        let summary = ReputationAggregator::new(repo.clone())
            .recompute(&company)
            .await
            .unwrap();
        assert_eq!(summary, ReputationSummary { overall_rating: 0.0, total_reviews: 0 });
    }

    #[tokio::test]
    async fn test_unknown_company_not_found() {
        let repo = Arc::new(InMemoryRepository::new());
        let err = ReputationAggregator::new(repo)
            .recompute(&ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
