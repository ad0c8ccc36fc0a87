//! Database schemas for the review engine
//!
//! Defines MongoDB document structures for reviews, companies, reports,
//! users and notifications.

mod company;
mod metadata;
mod notification;
mod report;
mod review;
mod user;

pub use company::{CompanyDoc, DimensionRatings, COMPANY_COLLECTION};
pub use metadata::Metadata;
pub use notification::{NotificationDoc, NotificationKind, NOTIFICATION_COLLECTION};
pub use report::{
    ReportAction, ReportDoc, ReportReason, ReportStatus, ReportTarget, REPORT_COLLECTION,
};
pub use review::{
    ModerationStatus, NewReview, ReviewDoc, ReviewReply, ReviewType, SubRatings,
    REVIEW_COLLECTION,
};
pub use user::{RecruiterInfo, RecruiterStatus, UserDoc, UserType, USER_COLLECTION};
