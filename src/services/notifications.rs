//! Reply notifications
//!
//! Fired after a reply is persisted. Failures are logged and dropped.

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::schemas::{Metadata, NotificationDoc, NotificationKind, ReviewDoc};
use crate::store::NotificationSink;

/// Body of every reply notification
pub const REPLY_MESSAGE: &str = "A company representative has responded to your review.";

pub struct NotificationEmitter {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationEmitter {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Tell the review's author about a reply from `replier`.
    ///
    /// Skipped for anonymous reviews and self-replies. Returns the created
    /// notification id when one was stored.
    pub async fn reply_posted(&self, review: &ReviewDoc, replier: &ObjectId) -> Option<ObjectId> {
        let author = review.author?;
        if author == *replier {
            return None;
        }
        let review_id = review._id?;

        let notification = NotificationDoc {
            _id: None,
            metadata: Metadata::new(),
            recipient: author,
            kind: NotificationKind::ReviewReply,
            review: review_id,
            company: review.company,
            message: REPLY_MESSAGE.to_string(),
            read_at: None,
        };

        match self.sink.create(notification).await {
            Ok(id) => {
                debug!(notification = %id, recipient = %author, "Reply notification created");
                Some(id)
            }
            Err(e) => {
                warn!(
                    review = %review_id,
                    recipient = %author,
                    "Failed to create reply notification: {}",
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRepository;
    use crate::testing::{review_fields, FailingSink};

    fn stored_review(author: Option<ObjectId>) -> ReviewDoc {
        let mut review = ReviewDoc::new(author, review_fields(ObjectId::new(), 5));
        review._id = Some(ObjectId::new());
        review
    }

    #[tokio::test]
    async fn test_author_is_notified() {
        let repo = Arc::new(InMemoryRepository::new());
        let emitter = NotificationEmitter::new(repo.clone());
        let author = ObjectId::new();
        let review = stored_review(Some(author));

        assert!(emitter.reply_posted(&review, &ObjectId::new()).await.is_some());

        let inbox = repo.notifications_for(&author);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::ReviewReply);
        assert_eq!(inbox[0].review, review._id.unwrap());
        assert_eq!(inbox[0].company, review.company);
        assert_eq!(inbox[0].message, REPLY_MESSAGE);
        assert!(inbox[0].read_at.is_none());
    }

    #[tokio::test]
    async fn test_self_reply_and_anonymous_review_skip() {
        let repo = Arc::new(InMemoryRepository::new());
        let emitter = NotificationEmitter::new(repo.clone());
        let author = ObjectId::new();

        assert!(emitter
            .reply_posted(&stored_review(Some(author)), &author)
            .await
            .is_none());
        assert!(emitter
            .reply_posted(&stored_review(None), &ObjectId::new())
            .await
            .is_none());
        assert!(repo.notifications_for(&author).is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let sink = Arc::new(FailingSink::default());
        let emitter = NotificationEmitter::new(sink.clone());

        let id = emitter
            .reply_posted(&stored_review(Some(ObjectId::new())), &ObjectId::new())
            .await;
        assert!(id.is_none());
        assert_eq!(sink.attempts(), 1);
    }
}
