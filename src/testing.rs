//! Shared fixtures for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{
    CompanyDoc, NewReview, NotificationDoc, ReportDoc, ReportReason, ReviewDoc, ReviewType,
    SubRatings, UserDoc, UserType,
};
use crate::engine::ReviewEngine;
use crate::identity::Caller;
use crate::services::ReportWorkflow;
use crate::store::{
    InMemoryRepository, NotificationSink, RatingSummary, ReportMutation, ReviewMutation,
    ReviewRepository,
};
use crate::types::{EngineError, Result};

/// Valid review content for `company` with the given overall rating
pub fn review_fields(company: ObjectId, overall: i32) -> NewReview {
    NewReview {
        company,
        review_type: ReviewType::Employee,
        job_title: "Backend Engineer".to_string(),
        ratings: SubRatings {
            work_life_balance: 4,
            compensation: 3,
            career_growth: 4,
            management: 3,
            culture: 5,
        },
        overall_rating: overall,
        title: "Solid place to grow".to_string(),
        body: "Good mentoring, slow promotion cycle.".to_string(),
        pros: "Mentoring".to_string(),
        cons: "Promotions".to_string(),
        recommend_to_friend: true,
        approves_of_ceo: Some(true),
    }
}

/// Sink that rejects every notification and counts attempts
#[derive(Default)]
pub struct FailingSink {
    pub attempts: AtomicUsize,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for FailingSink {
    async fn create(&self, _notification: NotificationDoc) -> Result<ObjectId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(EngineError::Database("notification store unavailable".into()))
    }
}

/// Engine over one in-memory store, with handles for direct inspection
pub struct Harness {
    pub repo: Arc<InMemoryRepository>,
    pub engine: ReviewEngine,
}

impl Harness {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let engine = ReviewEngine::new(repo.clone(), repo.clone());
        Self { repo, engine }
    }

    /// Engine whose notification sink always fails
    pub fn with_failing_sink(sink: Arc<FailingSink>) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let engine = ReviewEngine::new(repo.clone(), sink);
        Self { repo, engine }
    }

    pub async fn company(&self, name: &str) -> ObjectId {
        let slug = name.to_lowercase().replace(' ', "-");
        self.repo
            .insert_company(CompanyDoc::new(name, slug))
            .await
            .unwrap()
    }

    pub fn user(&self, user_type: UserType) -> Caller {
        let n = ObjectId::new();
        let id = self.repo.insert_user(UserDoc::new(
            format!("{}@example.test", n.to_hex()),
            "Test User",
            user_type,
        ));
        Caller::new(id, user_type)
    }

    pub fn admin(&self) -> Caller {
        self.user(UserType::Admin)
    }

    /// Recruiter claiming `company_name`, with nothing resolved yet
    pub fn recruiter(&self, company_name: &str) -> Caller {
        let user = UserDoc::recruiter(
            format!("{}@recruit.test", ObjectId::new().to_hex()),
            company_name,
        );
        let id = self.repo.insert_user(user.clone());
        let mut user = user;
        user._id = Some(id);
        Caller::from_user(&user).unwrap()
    }

    /// Create a review as `author` and return its id
    pub async fn review(
        &self,
        author: Option<&Caller>,
        company: ObjectId,
        overall: i32,
    ) -> ObjectId {
        self.engine
            .create_review(author, review_fields(company, overall))
            .await
            .unwrap()
            ._id
            .unwrap()
    }

    /// Create a review and approve it
    pub async fn approved_review(
        &self,
        author: Option<&Caller>,
        company: ObjectId,
        overall: i32,
    ) -> ObjectId {
        let id = self.review(author, company, overall).await;
        self.engine
            .moderate_review(&self.admin(), &id, "approved".parse().unwrap(), None)
            .await
            .unwrap();
        id
    }

    pub async fn stored_review(&self, id: &ObjectId) -> ReviewDoc {
        self.repo.find_review(id).await.unwrap().unwrap()
    }

    pub async fn stored_company(&self, id: &ObjectId) -> CompanyDoc {
        self.repo.find_company(id).await.unwrap().unwrap()
    }
}

/// In-memory store that can fail report inserts or file a report just
/// before pending reports are dismissed
pub struct InterleavingRepository {
    inner: Arc<InMemoryRepository>,
    fail_report_inserts: AtomicBool,
    report_before_dismiss: Mutex<Option<Caller>>,
}

impl InterleavingRepository {
    pub fn new(inner: Arc<InMemoryRepository>) -> Self {
        Self {
            inner,
            fail_report_inserts: AtomicBool::new(false),
            report_before_dismiss: Mutex::new(None),
        }
    }

    pub fn fail_report_inserts(&self) {
        self.fail_report_inserts.store(true, Ordering::SeqCst);
    }

    /// Have `reporter` file one report against the review being approved,
    /// after the approval lands and before its reports are dismissed
    pub fn report_before_dismiss(&self, reporter: Caller) {
        *self.report_before_dismiss.lock().unwrap() = Some(reporter);
    }
}

#[async_trait]
impl ReviewRepository for InterleavingRepository {
    async fn insert_review(&self, review: ReviewDoc) -> Result<ObjectId> {
        self.inner.insert_review(review).await
    }

    async fn find_review(&self, id: &ObjectId) -> Result<Option<ReviewDoc>> {
        self.inner.find_review(id).await
    }

    async fn modify_review(
        &self,
        id: &ObjectId,
        mutate: ReviewMutation<'_>,
    ) -> Result<Option<ReviewDoc>> {
        self.inner.modify_review(id, mutate).await
    }

    async fn list_public_reviews(&self, company: &ObjectId) -> Result<Vec<ReviewDoc>> {
        self.inner.list_public_reviews(company).await
    }

    async fn approved_rating_summary(&self, company: &ObjectId) -> Result<RatingSummary> {
        self.inner.approved_rating_summary(company).await
    }

    async fn insert_company(&self, company: CompanyDoc) -> Result<ObjectId> {
        self.inner.insert_company(company).await
    }

    async fn find_company(&self, id: &ObjectId) -> Result<Option<CompanyDoc>> {
        self.inner.find_company(id).await
    }

    async fn find_companies_by_name(&self, name: &str) -> Result<Vec<CompanyDoc>> {
        self.inner.find_companies_by_name(name).await
    }

    async fn set_company_reputation(
        &self,
        id: &ObjectId,
        overall_rating: f64,
        total_reviews: i64,
    ) -> Result<bool> {
        self.inner
            .set_company_reputation(id, overall_rating, total_reviews)
            .await
    }

    async fn insert_report(&self, report: ReportDoc) -> Result<ObjectId> {
        if self.fail_report_inserts.load(Ordering::SeqCst) {
            return Err(EngineError::Database("reports collection unavailable".into()));
        }
        self.inner.insert_report(report).await
    }

    async fn find_report(&self, id: &ObjectId) -> Result<Option<ReportDoc>> {
        self.inner.find_report(id).await
    }

    async fn modify_report(
        &self,
        id: &ObjectId,
        mutate: ReportMutation<'_>,
    ) -> Result<Option<ReportDoc>> {
        self.inner.modify_report(id, mutate).await
    }

    async fn pending_report_ids(&self, review: &ObjectId) -> Result<Vec<ObjectId>> {
        self.inner.pending_report_ids(review).await
    }

    async fn dismiss_pending_reports(
        &self,
        review: &ObjectId,
        reports: &[ObjectId],
        moderator: &ObjectId,
        note: &str,
    ) -> Result<u64> {
        let reporter = self.report_before_dismiss.lock().unwrap().take();
        if let Some(reporter) = reporter {
            ReportWorkflow::new(self.inner.clone())
                .report(&reporter, review, ReportReason::Spam, None)
                .await?;
        }
        self.inner
            .dismiss_pending_reports(review, reports, moderator, note)
            .await
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<UserDoc>> {
        self.inner.find_user(id).await
    }

    async fn set_recruiter_company(&self, user: &ObjectId, company: &ObjectId) -> Result<()> {
        self.inner.set_recruiter_company(user, company).await
    }
}
