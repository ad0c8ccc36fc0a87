//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema indexes on creation and hide
//! soft-deleted documents from reads. Versioned documents additionally get
//! an optimistic read-modify-write primitive ([`MongoCollection::modify`]).

use bson::{doc, oid::ObjectId, Document};
use futures_util::{StreamExt, TryStreamExt};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::db::schemas::Metadata;
use crate::types::{EngineError, Result};

/// Attempts before a contended modification gives up
pub const MAX_MODIFY_ATTEMPTS: usize = 8;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Documents carrying a write counter for compare-and-swap updates
pub trait Versioned {
    fn version(&self) -> i64;
    fn set_version(&mut self, version: i64);
}

/// Match `id` at `expected` version. Documents written before versioning
/// have no `version` field and read back as version 0.
pub fn version_filter(id: &ObjectId, expected: i64) -> Document {
    if expected == 0 {
        doc! {
            "_id": *id,
            "$or": [
                { "version": 0_i64 },
                { "version": { "$exists": false } },
            ],
        }
    } else {
        doc! { "_id": *id, "version": expected }
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping the database
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| EngineError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        *item.mut_metadata() = Metadata::new();

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| EngineError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| EngineError::Database("Failed to get inserted ID".into()))
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))
    }

    /// Find all live documents matching a filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Run an aggregation pipeline; a leading `$match` on live documents is added
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let mut stages = vec![doc! { "$match": { "metadata.is_deleted": { "$ne": true } } }];
        stages.extend(pipeline);

        let cursor = self
            .inner
            .aggregate(stages)
            .await
            .map_err(|e| EngineError::Database(format!("Aggregate failed: {}", e)))?;

        cursor
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| EngineError::Database(format!("Aggregate failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))
    }

    /// Update every document matching a filter
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_many(filter, update.into())
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))
    }
}

impl<T> MongoCollection<T>
where
    T: Serialize
        + DeserializeOwned
        + Unpin
        + Send
        + Sync
        + IntoIndexes
        + MutMetadata
        + Versioned
        + Clone
        + PartialEq,
{
    /// Apply `mutate` to the document with `id` as one atomic step.
    ///
    /// The mutation runs against a fresh read and is written back only if
    /// the stored `version` is still the one that was read; on a lost race
    /// the document is re-read and the mutation re-applied. An error from
    /// `mutate` aborts without writing. Returns `None` if no live document
    /// has this id.
    pub async fn modify<F>(&self, id: &ObjectId, mut mutate: F) -> Result<Option<T>>
    where
        F: FnMut(&mut T) -> Result<()>,
    {
        for attempt in 1..=MAX_MODIFY_ATTEMPTS {
            let Some(current) = self.find_one(doc! { "_id": *id }).await? else {
                return Ok(None);
            };

            let mut next = current.clone();
            mutate(&mut next)?;
            if next == current {
                return Ok(Some(current));
            }

            let expected = current.version();
            next.set_version(expected + 1);
            next.mut_metadata().touch();

            let result = self
                .inner
                .replace_one(version_filter(id, expected), &next)
                .await
                .map_err(|e| EngineError::Database(format!("Replace failed: {}", e)))?;

            if result.matched_count == 1 {
                return Ok(Some(next));
            }

            debug!(
                "Version conflict on {} (expected v{}, attempt {})",
                id, expected, attempt
            );
        }

        warn!("Giving up on contended document {}", id);
        Err(EngineError::Conflict(format!(
            "Document {} is being modified concurrently, try again",
            id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_filter_matches_unversioned_documents_at_zero() {
        let id = ObjectId::new();
        let filter = version_filter(&id, 0);
        assert_eq!(filter.get_object_id("_id").unwrap(), id);
        assert!(!filter.contains_key("version"));

        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].as_document().unwrap().get_i64("version").unwrap(), 0);
        let missing = branches[1]
            .as_document()
            .unwrap()
            .get_document("version")
            .unwrap();
        assert!(!missing.get_bool("$exists").unwrap());
    }

    #[test]
    fn test_version_filter_pins_exact_version() {
        let id = ObjectId::new();
        let filter = version_filter(&id, 3);
        assert_eq!(filter.get_i64("version").unwrap(), 3);
        assert!(!filter.contains_key("$or"));
    }
}
