//! Review engine facade
//!
//! One entry point per operation. Each call checks the caller, applies its
//! primary mutation through the repository's atomic `modify_*` primitives,
//! then runs the operation's cascade (reputation recompute, report
//! dismissal, affiliation cache, notification).

use bson::oid::ObjectId;
use bson::DateTime;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{
    ModerationStatus, NewReview, ReportAction, ReportDoc, ReportReason, ReviewDoc, ReviewReply,
    UserType,
};
use crate::identity::Caller;
use crate::moderation::{self, ModerationDecision, ModerationState};
use crate::services::{
    AffiliationResolver, NotificationEmitter, ReportWorkflow, ReputationAggregator,
    ReputationSummary, VoteLedger, VoteSummary, VoteValue,
};
use crate::store::{NotificationSink, ReviewRepository};
use crate::types::{EngineError, Result};


/// Maximum length of a reply body
pub const MAX_REPLY_LEN: usize = 5000;

/// Note stored on reports dismissed by a review approval
pub const APPROVAL_DISMISSAL_NOTE: &str = "Review approved by moderator";

/// Validate author-supplied review content
pub fn validate_new_review(fields: &NewReview) -> Result<()> {
    let check = |name: &str, value: i32| {
        if (1..=5).contains(&value) {
            Ok(())
        } else {
            Err(EngineError::Validation(format!(
                "{} must be between 1 and 5, got {}",
                name, value
            )))
        }
    };

    check("overall_rating", fields.overall_rating)?;
    for (name, value) in fields.ratings.named() {
        check(name, value)?;
    }

    if fields.title.trim().is_empty() {
        return Err(EngineError::Validation("title is required".into()));
    }
    if fields.body.trim().is_empty() {
        return Err(EngineError::Validation("body is required".into()));
    }
    Ok(())
}

/// Trim and bound reply content
pub fn validate_reply(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(EngineError::Validation("Reply content is required".into()));
    }
    if content.chars().count() > MAX_REPLY_LEN {
        return Err(EngineError::Validation(format!(
            "Reply content must be at most {} characters",
            MAX_REPLY_LEN
        )));
    }
    Ok(content.to_string())
}

fn not_repliable() -> EngineError {
    EngineError::Conflict("Only approved, visible reviews can receive a reply".into())
}

/// The review lifecycle, voting and reputation engine
pub struct ReviewEngine {
    repo: Arc<dyn ReviewRepository>,
    votes: VoteLedger,
    reports: ReportWorkflow,
    reputation: ReputationAggregator,
    affiliation: AffiliationResolver,
    notifications: NotificationEmitter,
}

impl ReviewEngine {
    pub fn new(repo: Arc<dyn ReviewRepository>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            votes: VoteLedger::new(repo.clone()),
            reports: ReportWorkflow::new(repo.clone()),
            reputation: ReputationAggregator::new(repo.clone()),
            affiliation: AffiliationResolver::new(repo.clone()),
            notifications: NotificationEmitter::new(notifications),
            repo,
        }
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Submit a review. It starts pending and visible; the company's
    /// reputation is then recomputed (which cannot yet include it).
    pub async fn create_review(
        &self,
        author: Option<&Caller>,
        fields: NewReview,
    ) -> Result<ReviewDoc> {
        validate_new_review(&fields)?;

        let company = fields.company;
        if self.repo.find_company(&company).await?.is_none() {
            return Err(EngineError::NotFound(format!("Company {} not found", company)));
        }

        let id = self
            .repo
            .insert_review(ReviewDoc::new(author.map(|a| a.user_id), fields))
            .await?;
        info!(review = %id, company = %company, "Review created");

        self.reputation.recompute(&company).await?;

        self.repo
            .find_review(&id)
            .await?
            .ok_or_else(|| EngineError::Internal(format!("Review {} vanished after insert", id)))
    }

    /// Reviews shown publicly for a company
    pub async fn public_reviews(&self, company: &ObjectId) -> Result<Vec<ReviewDoc>> {
        self.repo.list_public_reviews(company).await
    }

    // =========================================================================
    // Votes
    // =========================================================================

    pub async fn vote(
        &self,
        caller: &Caller,
        review_id: &ObjectId,
        value: VoteValue,
    ) -> Result<VoteSummary> {
        self.votes.vote(review_id, caller.user_id, value).await
    }

    pub async fn user_vote(
        &self,
        review_id: &ObjectId,
        user: &ObjectId,
    ) -> Result<Option<VoteValue>> {
        self.votes.user_vote(review_id, user).await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    pub async fn report(
        &self,
        caller: &Caller,
        review_id: &ObjectId,
        reason: ReportReason,
        details: Option<String>,
    ) -> Result<ObjectId> {
        self.reports.report(caller, review_id, reason, details).await
    }

    pub async fn resolve_report(
        &self,
        caller: &Caller,
        report_id: &ObjectId,
        action: ReportAction,
        note: Option<String>,
    ) -> Result<ReportDoc> {
        self.reports.resolve(caller, report_id, action, note).await
    }

    // =========================================================================
    // Moderation
    // =========================================================================

    /// Approve or reject a pending review. Approval dismisses the reports
    /// that were pending when it was decided; reports filed afterwards stay
    /// open.
    pub async fn moderate_review(
        &self,
        caller: &Caller,
        review_id: &ObjectId,
        decision: ModerationDecision,
        reason: Option<String>,
    ) -> Result<ReviewDoc> {
        caller.require_admin("moderate reviews")?;
        let moderator = caller.user_id;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let superseded = match decision {
            ModerationDecision::Approved => self.repo.pending_report_ids(review_id).await?,
            ModerationDecision::Rejected => Vec::new(),
        };

        let review = self
            .repo
            .modify_review(review_id, &mut |review: &mut ReviewDoc| {
                moderation::decide(ModerationState::of(review), decision)?.apply_to(review);
                review.moderated_by = Some(moderator);
                review.moderation_reason = reason.clone();
                review.moderated_at = Some(DateTime::now());
                Ok(())
            })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Review {} not found", review_id)))?;

        info!(
            review = %review_id,
            status = %review.moderation_status,
            moderator = %moderator,
            "Review moderated"
        );

        if review.moderation_status == ModerationStatus::Approved {
            let dismissed = self
                .repo
                .dismiss_pending_reports(
                    review_id,
                    &superseded,
                    &moderator,
                    APPROVAL_DISMISSAL_NOTE,
                )
                .await?;
            if dismissed > 0 {
                info!(review = %review_id, dismissed, "Pending reports dismissed on approval");
            }
        }

        Ok(review)
    }

    // =========================================================================
    // Replies
    // =========================================================================

    /// Post or edit the single reply on a public review.
    ///
    /// Admins may reply to any company's review; recruiters must resolve to
    /// the review's company. Editing keeps the original responder.
    pub async fn respond_to_review(
        &self,
        caller: &Caller,
        review_id: &ObjectId,
        content: &str,
    ) -> Result<ReviewDoc> {
        let content = validate_reply(content)?;

        let review = self
            .repo
            .find_review(review_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Review {} not found", review_id)))?;
        if !review.is_public() {
            return Err(not_repliable());
        }

        match caller.user_type {
            UserType::Admin => {}
            UserType::Recruiter => {
                self.affiliation.authorize(caller, &review.company).await?;
            }
            UserType::Candidate | UserType::Employee => {
                return Err(EngineError::Forbidden(
                    "Only recruiters and admins can respond to reviews".into(),
                ));
            }
        }

        let responder = caller.user_id;
        let updated = self
            .repo
            .modify_review(review_id, &mut |review: &mut ReviewDoc| {
                if !review.is_public() {
                    return Err(not_repliable());
                }
                let now = DateTime::now();
                match review.reply.as_mut() {
                    Some(reply) => {
                        reply.content = content.clone();
                        reply.updated_at = now;
                    }
                    None => {
                        review.reply = Some(ReviewReply {
                            responder,
                            content: content.clone(),
                            created_at: now,
                            updated_at: now,
                        });
                    }
                }
                Ok(())
            })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Review {} not found", review_id)))?;

        info!(review = %review_id, responder = %responder, "Reply saved");

        self.notifications.reply_posted(&updated, &responder).await;

        Ok(updated)
    }

    // =========================================================================
    // Reputation
    // =========================================================================

    /// Operator-triggered recompute; same algorithm as the create-time one
    pub async fn recompute_company_reputation(
        &self,
        company: &ObjectId,
    ) -> Result<ReputationSummary> {
        self.reputation.recompute(company).await
    }
}
