//! Review engine - lifecycle, voting and reputation consistency
//!
//! Keeps reviews, companies, reports and recruiter profiles consistent while
//! unrelated users vote on, report, moderate and reply to the same review.
//!
//! ## Components
//!
//! - **Moderation**: pending/approved/rejected state machine with a separate
//!   report override edge
//! - **Votes**: helpful/unhelpful voter sets and counters
//! - **Reports**: escalation back to moderation and report resolution
//! - **Reputation**: company rating summary from approved, visible reviews
//! - **Affiliation**: tiered recruiter-to-company matching for replies
//! - **Notifications**: best-effort reply notifications

pub mod config;
pub mod db;
pub mod engine;
pub mod identity;
pub mod moderation;
pub mod services;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Args;
pub use engine::ReviewEngine;
pub use identity::Caller;
pub use types::{EngineError, Result};
