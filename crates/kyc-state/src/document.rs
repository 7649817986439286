//! # Document Store
//!
//! Per-user collection of uploaded identity documents. Each record tracks
//! upload progress, review status, and whether it is locked because its
//! tier has been submitted.
//!
//! ## Document lifecycle
//!
//! ```text
//! add ──▶ Pending ──mark_approved──▶ Approved
//!            │
//!            └──mark_rejected──▶ Rejected   (re-upload creates a new record)
//! ```
//!
//! Records are ordered by a per-user creation `sequence`. The evaluator uses
//! it to pick the newest non-rejected record of each kind, so supersession
//! never depends on clock resolution or map iteration order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kyc_core::{DocumentId, DocumentKind, TierId, Timestamp};

use crate::policy::TierDefinition;
use crate::verification::TierStatus;

/// Review status of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// An uploaded document and its review state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Creation order within the owning user's store.
    pub sequence: u64,
    pub kind: DocumentKind,
    /// Tier the document was uploaded against.
    pub tier: TierId,
    /// Opaque reference to the stored bytes (URI or object key).
    pub content_ref: String,
    /// Upload progress in percent, 0..=100.
    pub upload_progress: u8,
    pub status: DocumentStatus,
    /// Set when the tier is submitted; locked documents cannot be deleted.
    pub locked: bool,
    pub created_at: Timestamp,
}

impl Document {
    /// Whether the upload has finished.
    pub fn is_complete(&self) -> bool {
        self.upload_progress >= 100
    }
}

/// Errors from document operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("{id} not found")]
    NotFound { id: DocumentId },

    /// The kind is not one of the tier's required documents.
    #[error("document kind {kind} is not required by tier {tier}")]
    WrongKindForTier { kind: DocumentKind, tier: TierId },

    /// The tier is already submitted or approved and takes no more uploads.
    #[error("tier {tier} is already {status}; uploads are closed")]
    TierAlreadySubmitted { tier: TierId, status: TierStatus },

    /// The document belongs to a submitted tier.
    #[error("{id} is locked by a tier submission")]
    Locked { id: DocumentId },

    #[error("upload of {id} is already complete")]
    AlreadyComplete { id: DocumentId },

    #[error("upload progress for {id} cannot go from {current}% back to {requested}%")]
    ProgressRegression {
        id: DocumentId,
        current: u8,
        requested: u8,
    },

    #[error("upload progress must be within 0..=100, got {requested}")]
    ProgressOutOfRange { requested: u8 },

    /// A reviewed document cannot change its verdict.
    #[error("{id} was already reviewed as {status}")]
    AlreadyReviewed { id: DocumentId, status: DocumentStatus },

    #[error("document content reference must not be empty")]
    EmptyContentRef,
}

/// Ordered collection of a user's documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStore {
    documents: Vec<Document>,
    next_sequence: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new upload against `tier`.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::TierAlreadySubmitted`] if `tier_status` is submitted
    ///   or approved.
    /// - [`DocumentError::WrongKindForTier`] if `kind` is not required by the tier.
    /// - [`DocumentError::EmptyContentRef`] if `content_ref` is blank.
    pub fn add(
        &mut self,
        tier: &TierDefinition,
        tier_status: TierStatus,
        kind: DocumentKind,
        content_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<&Document, DocumentError> {
        if !tier_status.accepts_uploads() {
            return Err(DocumentError::TierAlreadySubmitted {
                tier: tier.id,
                status: tier_status,
            });
        }
        if !tier.requires_document(&kind) {
            return Err(DocumentError::WrongKindForTier {
                kind,
                tier: tier.id,
            });
        }
        let content_ref = content_ref.into();
        if content_ref.trim().is_empty() {
            return Err(DocumentError::EmptyContentRef);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.documents.push(Document {
            id: DocumentId::new(),
            sequence,
            kind,
            tier: tier.id,
            content_ref,
            upload_progress: 0,
            status: DocumentStatus::Pending,
            locked: false,
            created_at: now,
        });
        let index = self.documents.len() - 1;
        Ok(&self.documents[index])
    }

    /// Advance upload progress. Equal values are accepted; lower values fail.
    pub fn update_progress(&mut self, id: DocumentId, percent: u8) -> Result<(), DocumentError> {
        if percent > 100 {
            return Err(DocumentError::ProgressOutOfRange { requested: percent });
        }
        let doc = self.get_mut(id)?;
        if doc.is_complete() {
            return Err(DocumentError::AlreadyComplete { id });
        }
        if percent < doc.upload_progress {
            return Err(DocumentError::ProgressRegression {
                id,
                current: doc.upload_progress,
                requested: percent,
            });
        }
        doc.upload_progress = percent;
        Ok(())
    }

    /// Remove an unlocked document, returning the removed record.
    pub fn delete(&mut self, id: DocumentId) -> Result<Document, DocumentError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(DocumentError::NotFound { id })?;
        if self.documents[index].locked {
            return Err(DocumentError::Locked { id });
        }
        Ok(self.documents.remove(index))
    }

    /// Mark a document approved by the reviewer.
    pub fn mark_approved(&mut self, id: DocumentId) -> Result<&Document, DocumentError> {
        self.set_review(id, DocumentStatus::Approved)
    }

    /// Mark a document rejected. The lock is left untouched.
    pub fn mark_rejected(&mut self, id: DocumentId) -> Result<&Document, DocumentError> {
        self.set_review(id, DocumentStatus::Rejected)
    }

    fn set_review(
        &mut self,
        id: DocumentId,
        verdict: DocumentStatus,
    ) -> Result<&Document, DocumentError> {
        let doc = self.get_mut(id)?;
        match doc.status {
            DocumentStatus::Pending => doc.status = verdict,
            current if current == verdict => {}
            current => return Err(DocumentError::AlreadyReviewed { id, status: current }),
        }
        Ok(doc)
    }

    /// Lock every document of `tier`.
    pub fn lock_tier(&mut self, tier: TierId) {
        for doc in self.documents.iter_mut().filter(|d| d.tier == tier) {
            doc.locked = true;
        }
    }

    /// Unlock the rejected documents of `tier`, returning how many changed.
    pub fn unlock_rejected(&mut self, tier: TierId) -> usize {
        self.unlock_where(tier, DocumentStatus::Rejected)
    }

    /// Unlock every document of `tier` that is not approved, returning how
    /// many changed. Approved documents stay locked.
    pub fn unlock_unapproved(&mut self, tier: TierId) -> usize {
        self.unlock_matching(tier, |status| status != DocumentStatus::Approved)
    }

    fn unlock_where(&mut self, tier: TierId, status: DocumentStatus) -> usize {
        self.unlock_matching(tier, |s| s == status)
    }

    fn unlock_matching(
        &mut self,
        tier: TierId,
        matches: impl Fn(DocumentStatus) -> bool,
    ) -> usize {
        let mut changed = 0;
        for doc in self
            .documents
            .iter_mut()
            .filter(|d| d.tier == tier && d.locked && matches(d.status))
        {
            doc.locked = false;
            changed += 1;
        }
        changed
    }

    pub fn get(&self, id: DocumentId) -> Result<&Document, DocumentError> {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .ok_or(DocumentError::NotFound { id })
    }

    fn get_mut(&mut self, id: DocumentId) -> Result<&mut Document, DocumentError> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(DocumentError::NotFound { id })
    }

    /// Documents uploaded against `tier`, in creation order.
    pub fn for_tier(&self, tier: TierId) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |d| d.tier == tier)
    }

    /// All documents in creation order.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
