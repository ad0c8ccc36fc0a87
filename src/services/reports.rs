//! Report & escalation workflow
//!
//! Filing a report hides the target review and forces it back to `pending`,
//! whatever its moderation status was. Resolving a report is a one-shot
//! transition out of `pending`; dismissing it makes the review visible again
//! without restoring its status.

use bson::oid::ObjectId;
use bson::DateTime;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{
    ReportAction, ReportDoc, ReportReason, ReportStatus, ReportTarget, ReviewDoc,
};
use crate::identity::Caller;
use crate::moderation::{self, ModerationState};
use crate::store::ReviewRepository;
use crate::types::{EngineError, Result};

/// Maximum length of a reporter's free-text details
pub const MAX_DETAILS_LEN: usize = 1000;

/// Trim optional details; blank becomes `None`
pub fn normalize_details(details: Option<String>) -> Result<Option<String>> {
    let Some(details) = details else {
        return Ok(None);
    };
    let trimmed = details.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_DETAILS_LEN {
        return Err(EngineError::Validation(format!(
            "Report details must be at most {} characters",
            MAX_DETAILS_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}

pub struct ReportWorkflow {
    repo: Arc<dyn ReviewRepository>,
}

impl ReportWorkflow {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo }
    }

    /// File a report against a review and pull the review out of circulation.
    ///
    /// The report is stored before the review is hidden, so a hidden review
    /// always has a pending report an admin can resolve.
    pub async fn report(
        &self,
        reporter: &Caller,
        review_id: &ObjectId,
        reason: ReportReason,
        details: Option<String>,
    ) -> Result<ObjectId> {
        let details = normalize_details(details)?;

        if self.repo.find_review(review_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("Review {} not found", review_id)));
        }

        let report_id = self
            .repo
            .insert_report(ReportDoc::against_review(
                reporter.user_id,
                *review_id,
                reason,
                details,
            ))
            .await?;

        let hidden = self
            .repo
            .modify_review(review_id, &mut |review: &mut ReviewDoc| {
                moderation::report_override(ModerationState::of(review)).apply_to(review);
                Ok(())
            })
            .await?;
        if hidden.is_none() {
            warn!(
                report = %report_id,
                review = %review_id,
                "Reported review disappeared before it could be hidden"
            );
            return Err(EngineError::NotFound(format!("Review {} not found", review_id)));
        }

        info!(
            report = %report_id,
            review = %review_id,
            reporter = %reporter.user_id,
            "Review reported; hidden pending re-moderation"
        );
        Ok(report_id)
    }

    /// Dismiss or confirm a pending report. Admin only.
    pub async fn resolve(
        &self,
        moderator: &Caller,
        report_id: &ObjectId,
        action: ReportAction,
        note: Option<String>,
    ) -> Result<ReportDoc> {
        moderator.require_admin("resolve reports")?;
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let moderator_id = moderator.user_id;

        let report = self
            .repo
            .modify_report(report_id, &mut |report: &mut ReportDoc| {
                if report.status != ReportStatus::Pending {
                    return Err(EngineError::Conflict(format!(
                        "Report has already been resolved (status: {})",
                        report.status
                    )));
                }
                report.status = action.resolved_status();
                report.moderator = Some(moderator_id);
                report.resolution_note = note.clone();
                report.resolved_at = Some(DateTime::now());
                Ok(())
            })
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Report {} not found", report_id)))?;

        info!(
            report = %report_id,
            status = %report.status,
            moderator = %moderator_id,
            "Report resolved"
        );

        if action == ReportAction::Dismiss && report.target_type == ReportTarget::Review {
            let restored = self
                .repo
                .modify_review(&report.target_id, &mut |review: &mut ReviewDoc| {
                    moderation::restore_visibility(ModerationState::of(review)).apply_to(review);
                    Ok(())
                })
                .await?;
            if restored.is_none() {
                warn!(
                    report = %report_id,
                    review = %report.target_id,
                    "Dismissed report targets a review that no longer exists"
                );
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ModerationStatus, UserType};
    use crate::store::InMemoryRepository;
    use crate::testing::{review_fields, InterleavingRepository};

    async fn setup(
        status: ModerationStatus,
    ) -> (Arc<InMemoryRepository>, ReportWorkflow, ObjectId) {
        let repo = Arc::new(InMemoryRepository::new());
        let mut review = ReviewDoc::new(None, review_fields(ObjectId::new(), 4));
        review.moderation_status = status;
        let id = repo.insert_review(review).await.unwrap();
        (repo.clone(), ReportWorkflow::new(repo), id)
    }

    fn admin() -> Caller {
        Caller::new(ObjectId::new(), UserType::Admin)
    }

    fn reporter() -> Caller {
        Caller::new(ObjectId::new(), UserType::Candidate)
    }

    #[tokio::test]
    async fn test_report_hides_rejected_review_and_reopens_it() {
        let (repo, workflow, review) = setup(ModerationStatus::Rejected).await;

        let report_id = workflow
            .report(&reporter(), &review, ReportReason::Fake, Some("  paid review ".into()))
            .await
            .unwrap();

        let stored = repo.find_review(&review).await.unwrap().unwrap();
        assert_eq!(stored.moderation_status, ModerationStatus::Pending);
        assert!(!stored.is_visible);

        let report = repo.find_report(&report_id).await.unwrap().unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.details.as_deref(), Some("paid review"));
        assert_eq!(report.target_id, review);
    }

    #[tokio::test]
    async fn test_report_missing_review_stores_nothing() {
        let (repo, workflow, _) = setup(ModerationStatus::Approved).await;
        let missing = ObjectId::new();

        let err = workflow
            .report(&reporter(), &missing, ReportReason::Spam, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(repo.reports_for(&missing).is_empty());
    }

    #[tokio::test]
    async fn test_failed_report_insert_leaves_review_public() {
        let (inner, _, review) = setup(ModerationStatus::Approved).await;
        let repo = Arc::new(InterleavingRepository::new(inner.clone()));
        repo.fail_report_inserts();
        let workflow = ReportWorkflow::new(repo);

        let err = workflow
            .report(&reporter(), &review, ReportReason::Spam, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Database(_)));

        let stored = inner.find_review(&review).await.unwrap().unwrap();
        assert_eq!(stored.moderation_status, ModerationStatus::Approved);
        assert!(stored.is_visible);
        assert!(inner.reports_for(&review).is_empty());
    }

    #[tokio::test]
    async fn test_report_details_length_limit() {
        let (_, workflow, review) = setup(ModerationStatus::Approved).await;
        let err = workflow
            .report(&reporter(), &review, ReportReason::Other, Some("x".repeat(1001)))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dismiss_restores_visibility_not_status() {
        let (repo, workflow, review) = setup(ModerationStatus::Approved).await;
        let report_id = workflow
            .report(&reporter(), &review, ReportReason::Spam, None)
            .await
            .unwrap();

        let admin = admin();
        let report = workflow
            .resolve(&admin, &report_id, ReportAction::Dismiss, Some("not spam".into()))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Dismissed);
        assert_eq!(report.moderator, Some(admin.user_id));
        assert_eq!(report.resolution_note.as_deref(), Some("not spam"));
        assert!(report.resolved_at.is_some());

        let stored = repo.find_review(&review).await.unwrap().unwrap();
        assert!(stored.is_visible);
        assert_eq!(stored.moderation_status, ModerationStatus::Pending);
        assert!(!stored.is_public());
    }

    #[tokio::test]
    async fn test_confirm_leaves_review_hidden() {
        let (repo, workflow, review) = setup(ModerationStatus::Approved).await;
        let report_id = workflow
            .report(&reporter(), &review, ReportReason::Offensive, None)
            .await
            .unwrap();

        workflow
            .resolve(&admin(), &report_id, ReportAction::Confirm, None)
            .await
            .unwrap();

        let stored = repo.find_review(&review).await.unwrap().unwrap();
        assert!(!stored.is_visible);
        assert_eq!(stored.moderation_status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn test_resolved_report_cannot_be_resolved_again() {
        let (_, workflow, review) = setup(ModerationStatus::Approved).await;
        let report_id = workflow
            .report(&reporter(), &review, ReportReason::Spam, None)
            .await
            .unwrap();
        workflow
            .resolve(&admin(), &report_id, ReportAction::Confirm, None)
            .await
            .unwrap();

        let err = workflow
            .resolve(&admin(), &report_id, ReportAction::Dismiss, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_resolve_requires_admin() {
        let (_, workflow, review) = setup(ModerationStatus::Approved).await;
        let report_id = workflow
            .report(&reporter(), &review, ReportReason::Spam, None)
            .await
            .unwrap();

        let err = workflow
            .resolve(&reporter(), &report_id, ReportAction::Dismiss, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_report() {
        let (_, workflow, _) = setup(ModerationStatus::Approved).await;
        let err = workflow
            .resolve(&admin(), &ObjectId::new(), ReportAction::Dismiss, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_normalize_details() {
        assert_eq!(normalize_details(None).unwrap(), None);
        assert_eq!(normalize_details(Some("   ".into())).unwrap(), None);
        assert_eq!(
            normalize_details(Some("x".repeat(1000))).unwrap().map(|d| d.len()),
            Some(1000)
        );
    }
}
