//! Company document schema
//!
//! The reputation summary (`overall_rating`, `total_reviews`) is written only
//! by the reputation aggregator.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for companies
pub const COMPANY_COLLECTION: &str = "companies";

/// Per-dimension averages kept on the company record.
///
/// Stored for display; the aggregator does not recompute them.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DimensionRatings {
    #[serde(default)]
    pub work_life_balance: f64,
    #[serde(default)]
    pub compensation: f64,
    #[serde(default)]
    pub career_growth: f64,
    #[serde(default)]
    pub management: f64,
    #[serde(default)]
    pub culture: f64,
}

/// Company document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CompanyDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    pub slug: String,

    /// Mean overall rating of approved, visible reviews (2 decimals)
    #[serde(default)]
    pub overall_rating: f64,

    #[serde(default)]
    pub total_reviews: i64,

    #[serde(default)]
    pub dimension_ratings: DimensionRatings,
}

impl CompanyDoc {
    /// Create a company with an empty reputation summary
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name: name.into(),
            slug: slug.into(),
            overall_rating: 0.0,
            total_reviews: 0,
            dimension_ratings: DimensionRatings::default(),
        }
    }
}

impl IntoIndexes for CompanyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "slug": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("slug_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "name": 1 },
                Some(
                    IndexOptions::builder()
                        .name("name_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CompanyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
