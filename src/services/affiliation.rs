//! Company affiliation resolver
//!
//! Decides whether a recruiter works for the company a review is about.
//! Resolution runs in tiers and stops at the first that yields a company:
//!
//! 1. **Cached**: `recruiter_info.company_id` already set on the profile
//! 2. **Exact name**: case-insensitive exact match of the claimed
//!    `company_name` against all companies, unique hit only
//! 3. **Normalized name**: claimed name and the review company's name compared
//!    after [`normalize_company_name`]
//!
//! A cached id is final: when it points elsewhere the recruiter is denied and
//! the name tiers are not consulted. Ids found by tiers 2 and 3 are written
//! back to the profile on a best-effort basis.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::db::schemas::{CompanyDoc, RecruiterInfo};
use crate::identity::Caller;
use crate::store::ReviewRepository;
use crate::types::{EngineError, Result};

/// Fold a company name for fuzzy comparison.
///
/// Strips diacritics (NFKD, then drop combining marks), removes anything that
/// is neither alphanumeric nor whitespace, collapses whitespace runs, and
/// lower-cases.
pub fn normalize_company_name(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Which tier produced a company, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Cached(ObjectId),
    ExactName(ObjectId),
    NormalizedName(ObjectId),
    Unresolved,
}

impl Resolution {
    pub fn company_id(&self) -> Option<ObjectId> {
        match self {
            Resolution::Cached(id) | Resolution::ExactName(id) | Resolution::NormalizedName(id) => {
                Some(*id)
            }
            Resolution::Unresolved => None,
        }
    }

    /// Freshly resolved ids are persisted onto the recruiter profile
    pub fn should_cache(&self) -> bool {
        matches!(self, Resolution::ExactName(_) | Resolution::NormalizedName(_))
    }
}

/// Tier 2: a single company whose name matched exactly
pub fn unique_exact_match(hits: &[CompanyDoc]) -> Option<ObjectId> {
    match hits {
        [only] => only._id,
        _ => None,
    }
}

/// Tier 3: the review's company if its name normalizes to the claimed one
pub fn normalized_match(claimed: &str, company: &CompanyDoc) -> Option<ObjectId> {
    let claimed = normalize_company_name(claimed);
    if !claimed.is_empty() && claimed == normalize_company_name(&company.name) {
        company._id
    } else {
        None
    }
}

pub struct AffiliationResolver {
    repo: Arc<dyn ReviewRepository>,
}

impl AffiliationResolver {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self { repo }
    }

    /// Run the tiers for `info` against a review about `review_company`.
    /// Performs lookups only; never writes.
    pub async fn resolve(
        &self,
        info: &RecruiterInfo,
        review_company: &ObjectId,
    ) -> Result<Resolution> {
        if let Some(cached) = info.company_id {
            debug!(company = %cached, "Affiliation resolved from cached company id");
            return Ok(Resolution::Cached(cached));
        }

        let claimed = info.company_name.trim();
        if claimed.is_empty() {
            return Ok(Resolution::Unresolved);
        }

        let hits = self.repo.find_companies_by_name(claimed).await?;
        if let Some(id) = unique_exact_match(&hits) {
            debug!(company = %id, "Affiliation resolved by exact name");
            return Ok(Resolution::ExactName(id));
        }
        if hits.len() > 1 {
            debug!("Claimed company name '{}' is ambiguous ({} matches)", claimed, hits.len());
        }

        if let Some(company) = self.repo.find_company(review_company).await? {
            if let Some(id) = normalized_match(claimed, &company) {
                debug!(company = %id, "Affiliation resolved by normalized name");
                return Ok(Resolution::NormalizedName(id));
            }
        }

        Ok(Resolution::Unresolved)
    }

    /// Allow `caller` to act for `review_company`, or fail with `Forbidden`.
    pub async fn authorize(
        &self,
        caller: &Caller,
        review_company: &ObjectId,
    ) -> Result<Resolution> {
        let info = caller.recruiter_info.as_ref().ok_or_else(|| {
            EngineError::Forbidden("Recruiter profile has no company affiliation".into())
        })?;

        let resolution = self.resolve(info, review_company).await?;

        if resolution.should_cache() {
            if let Some(company) = resolution.company_id() {
                self.cache_company(&caller.user_id, &company).await;
            }
        }

        match resolution.company_id() {
            Some(company) if company == *review_company => Ok(resolution),
            Some(company) => {
                info!(
                    recruiter = %caller.user_id,
                    recruiter_company = %company,
                    review_company = %review_company,
                    "Recruiter denied: review belongs to another company"
                );
                Err(EngineError::Forbidden(
                    "You can only respond to reviews of your own company".into(),
                ))
            }
            None => Err(EngineError::Forbidden(format!(
                "Could not match your company '{}' to this review's company",
                info.company_name
            ))),
        }
    }

    async fn cache_company(&self, user: &ObjectId, company: &ObjectId) {
        if let Err(e) = self.repo.set_recruiter_company(user, company).await {
            warn!(
                recruiter = %user,
                company = %company,
                "Failed to cache resolved company on recruiter profile: {}",
                e
            );
        }
    }
}
