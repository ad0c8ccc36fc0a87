//! Services layer for the review engine
//!
//! Each service owns one consistency concern over the shared stores.
//!
//! ## Services
//!
//! - **VoteLedger**: helpful/unhelpful voter sets and counters
//! - **ReportWorkflow**: report filing, escalation and resolution
//! - **ReputationAggregator**: company rating summary from public reviews
//! - **AffiliationResolver**: tiered recruiter-to-company matching
//! - **NotificationEmitter**: best-effort reply notifications

pub mod affiliation;
pub mod notifications;
pub mod reports;
pub mod reputation;
pub mod votes;

pub use affiliation::{normalize_company_name, AffiliationResolver, Resolution};
pub use notifications::{NotificationEmitter, REPLY_MESSAGE};
pub use reports::{ReportWorkflow, MAX_DETAILS_LEN};
pub use reputation::{ReputationAggregator, ReputationSummary};
pub use votes::{apply_vote, current_vote, VoteLedger, VoteSummary, VoteValue};
