//! MongoDB implementation of `ReviewRepository` and `NotificationSink`.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use tracing::debug;

use super::{
    NotificationSink, RatingSummary, ReportMutation, ReviewMutation, ReviewRepository,
};
use crate::db::schemas::{
    CompanyDoc, ModerationStatus, NotificationDoc, ReportDoc, ReportStatus, ReportTarget,
    ReviewDoc, UserDoc, COMPANY_COLLECTION, NOTIFICATION_COLLECTION, REPORT_COLLECTION,
    REVIEW_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::types::{EngineError, Result};

/// Repository backed by one MongoDB database
pub struct MongoRepository {
    reviews: MongoCollection<ReviewDoc>,
    companies: MongoCollection<CompanyDoc>,
    reports: MongoCollection<ReportDoc>,
    users: MongoCollection<UserDoc>,
    notifications: MongoCollection<NotificationDoc>,
}

impl MongoRepository {
    /// Open every collection, creating indexes as needed
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        Ok(Self {
            reviews: mongo.collection(REVIEW_COLLECTION).await?,
            companies: mongo.collection(COMPANY_COLLECTION).await?,
            reports: mongo.collection(REPORT_COLLECTION).await?,
            users: mongo.collection(USER_COLLECTION).await?,
            notifications: mongo.collection(NOTIFICATION_COLLECTION).await?,
        })
    }
}

/// Filter selecting reviews that count as public for a company
fn public_review_filter(company: &ObjectId) -> Document {
    doc! {
        "company": *company,
        "moderation_status": ModerationStatus::Approved.as_str(),
        "is_visible": true,
    }
}

/// Anchored, case-insensitive exact match on a free-text value
fn exact_name_filter(name: &str) -> Document {
    doc! {
        "name": {
            "$regex": format!("^{}$", regex::escape(name)),
            "$options": "i",
        }
    }
}

/// Pending reports against a review, optionally limited to `ids`
fn pending_reports_filter(review: &ObjectId, ids: Option<&[ObjectId]>) -> Result<Document> {
    let mut filter = doc! {
        "target_type": bson::to_bson(&ReportTarget::Review)?,
        "target_id": *review,
        "status": ReportStatus::Pending.as_str(),
    };
    if let Some(ids) = ids {
        filter.insert("_id", doc! { "$in": ids.to_vec() });
    }
    Ok(filter)
}

fn bson_to_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(n)) => *n as i64,
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}

fn summary_from_row(row: Option<&Document>) -> RatingSummary {
    match row {
        Some(row) => RatingSummary {
            count: bson_to_i64(row.get("count")),
            average: match row.get("average") {
                Some(Bson::Double(avg)) => Some(*avg),
                Some(Bson::Int32(avg)) => Some(*avg as f64),
                Some(Bson::Int64(avg)) => Some(*avg as f64),
                _ => None,
            },
        },
        None => RatingSummary::default(),
    }
}

#[async_trait]
impl ReviewRepository for MongoRepository {
    async fn insert_review(&self, review: ReviewDoc) -> Result<ObjectId> {
        self.reviews.insert_one(review).await
    }

    async fn find_review(&self, id: &ObjectId) -> Result<Option<ReviewDoc>> {
        self.reviews.find_one(doc! { "_id": *id }).await
    }

    async fn modify_review(
        &self,
        id: &ObjectId,
        mutate: ReviewMutation<'_>,
    ) -> Result<Option<ReviewDoc>> {
        self.reviews.modify(id, mutate).await
    }

    async fn list_public_reviews(&self, company: &ObjectId) -> Result<Vec<ReviewDoc>> {
        self.reviews.find_many(public_review_filter(company)).await
    }

    async fn approved_rating_summary(&self, company: &ObjectId) -> Result<RatingSummary> {
        let rows = self
            .reviews
            .aggregate(vec![
                doc! { "$match": public_review_filter(company) },
                doc! {
                    "$group": {
                        "_id": Bson::Null,
                        "count": { "$sum": 1 },
                        "average": { "$avg": "$overall_rating" },
                    }
                },
            ])
            .await?;

        Ok(summary_from_row(rows.first()))
    }

    async fn insert_company(&self, company: CompanyDoc) -> Result<ObjectId> {
        self.companies.insert_one(company).await
    }

    async fn find_company(&self, id: &ObjectId) -> Result<Option<CompanyDoc>> {
        self.companies.find_one(doc! { "_id": *id }).await
    }

    async fn find_companies_by_name(&self, name: &str) -> Result<Vec<CompanyDoc>> {
        self.companies.find_many(exact_name_filter(name)).await
    }

    async fn set_company_reputation(
        &self,
        id: &ObjectId,
        overall_rating: f64,
        total_reviews: i64,
    ) -> Result<bool> {
        let result = self
            .companies
            .update_one(
                doc! { "_id": *id },
                doc! {
                    "$set": {
                        "overall_rating": overall_rating,
                        "total_reviews": total_reviews,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn insert_report(&self, report: ReportDoc) -> Result<ObjectId> {
        self.reports.insert_one(report).await
    }

    async fn find_report(&self, id: &ObjectId) -> Result<Option<ReportDoc>> {
        self.reports.find_one(doc! { "_id": *id }).await
    }

    async fn modify_report(
        &self,
        id: &ObjectId,
        mutate: ReportMutation<'_>,
    ) -> Result<Option<ReportDoc>> {
        self.reports.modify(id, mutate).await
    }

    async fn pending_report_ids(&self, review: &ObjectId) -> Result<Vec<ObjectId>> {
        let reports = self
            .reports
            .find_many(pending_reports_filter(review, None)?)
            .await?;
        Ok(reports.into_iter().filter_map(|r| r._id).collect())
    }

    async fn dismiss_pending_reports(
        &self,
        review: &ObjectId,
        reports: &[ObjectId],
        moderator: &ObjectId,
        note: &str,
    ) -> Result<u64> {
        if reports.is_empty() {
            return Ok(0);
        }
        let now = DateTime::now();
        let result = self
            .reports
            .update_many(
                pending_reports_filter(review, Some(reports))?,
                doc! {
                    "$set": {
                        "status": ReportStatus::Dismissed.as_str(),
                        "moderator": *moderator,
                        "resolution_note": note,
                        "resolved_at": now,
                        "metadata.updated_at": now,
                    },
                    "$inc": { "version": 1_i64 },
                },
            )
            .await?;
        debug!(
            "Dismissed {} pending report(s) for review {}",
            result.modified_count, review
        );
        Ok(result.modified_count)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": *id }).await
    }

    async fn set_recruiter_company(&self, user: &ObjectId, company: &ObjectId) -> Result<()> {
        let result = self
            .users
            .update_one(
                doc! { "_id": *user },
                doc! {
                    "$set": {
                        "recruiter_info.company_id": *company,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(EngineError::NotFound(format!("User {} not found", user)));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for MongoRepository {
    async fn create(&self, notification: NotificationDoc) -> Result<ObjectId> {
        self.notifications.insert_one(notification).await
    }
}
