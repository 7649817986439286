//! # Review Queue
//!
//! Hand-off of submitted tiers to the external review process. The engine
//! schedules one [`ReviewRequest`] per successful submission, after commit.
//! The verdict comes back later through `Engine::resolve_review`; nothing
//! in this crate waits for it.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kyc_core::{DocumentId, SubmissionId, TierId, Timestamp, UserId};

/// A submission awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub user: UserId,
    pub tier: TierId,
    pub submission: SubmissionId,
    /// Documents that satisfied the requirements at submit time.
    pub documents: Vec<DocumentId>,
    pub submitted_at: Timestamp,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewQueueError {
    #[error("review queue unavailable: {0}")]
    Unavailable(String),
}

/// Sink for review requests.
pub trait ReviewQueue: Send + Sync {
    fn schedule(&self, request: ReviewRequest) -> Result<(), ReviewQueueError>;
}

/// FIFO queue held in memory. Reviewers (or tests) pull with [`drain`].
///
/// [`drain`]: InMemoryReviewQueue::drain
#[derive(Debug, Default)]
pub struct InMemoryReviewQueue {
    pending: Mutex<VecDeque<ReviewRequest>>,
}

impl InMemoryReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every queued request, oldest first.
    pub fn drain(&self) -> Vec<ReviewRequest> {
        self.pending.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReviewQueue for InMemoryReviewQueue {
    fn schedule(&self, request: ReviewRequest) -> Result<(), ReviewQueueError> {
        self.pending.lock().push_back(request);
        Ok(())
    }
}

/// Queue that logs requests and drops them. Used by the CLI, where an
/// operator resolves reviews by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReviewQueue;

impl ReviewQueue for LogReviewQueue {
    fn schedule(&self, request: ReviewRequest) -> Result<(), ReviewQueueError> {
        tracing::info!(
            user = %request.user,
            tier = %request.tier,
            submission = %request.submission,
            documents = request.documents.len(),
            "review requested"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tier: u8) -> ReviewRequest {
        ReviewRequest {
            user: UserId::new("ada").unwrap(),
            tier: TierId::new(tier).unwrap(),
            submission: SubmissionId::new(),
            documents: vec![DocumentId::new()],
            submitted_at: Timestamp::now(),
        }
    }

    #[test]
    fn drain_is_fifo_and_empties_queue() {
        let queue = InMemoryReviewQueue::new();
        queue.schedule(request(1)).unwrap();
        queue.schedule(request(2)).unwrap();
        assert_eq!(queue.len(), 2);
        let tiers: Vec<u8> = queue.drain().iter().map(|r| r.tier.get()).collect();
        assert_eq!(tiers, vec![1, 2]);
        assert!(queue.is_empty());
    }
}
