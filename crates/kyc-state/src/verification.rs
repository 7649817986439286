//! # Verification State
//!
//! The per-user record owned by the tier state machine: the current tier,
//! the status of every tier, boolean facts, uploaded documents, and the
//! append-only submission and transition logs.
//!
//! Fields are private. All mutation goes through the transition methods in
//! [`crate::machine`], which validate before writing, so a value of this
//! type always satisfies the tier invariants. The type is `Serialize` /
//! `Deserialize` so a persistence gateway can store it as a snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kyc_core::{DocumentId, SubmissionId, TierId, Timestamp, UserId};

use crate::document::DocumentStore;
use crate::policy::TierPolicy;

// ─── Tier Status ─────────────────────────────────────────────────────

/// Lifecycle status of one tier for one user.
///
/// ```text
/// NotStarted ──▶ PendingFacts ◀──▶ PendingDocuments ──submit──▶ Submitted
///                                        ▲                        │   │
///                                        └──── Rejected ◀─────────┘   └──▶ Approved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    /// Nothing has been provided for this tier yet.
    NotStarted,
    /// At least one required fact is still false.
    PendingFacts,
    /// Facts are complete; documents are outstanding or ready to submit.
    PendingDocuments,
    /// Under review. Documents are locked.
    Submitted,
    /// Review passed (terminal for the tier).
    Approved,
    /// Review failed. Recorded in history; the live status moves on to
    /// `PendingDocuments` immediately.
    Rejected,
}

impl TierStatus {
    /// Whether the tier is still collecting requirements.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::PendingFacts | Self::PendingDocuments | Self::Rejected
        )
    }

    /// Whether documents may be uploaded against the tier.
    pub fn accepts_uploads(&self) -> bool {
        self.is_open()
    }

    /// Whether a submission has been made and not sent back.
    pub fn is_submitted_or_later(&self) -> bool {
        matches!(self, Self::Submitted | Self::Approved)
    }
}

impl std::fmt::Display for TierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::PendingFacts => "pending_facts",
            Self::PendingDocuments => "pending_documents",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

// ─── Review and submission records ───────────────────────────────────

/// Verdict delivered by the external reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Approved,
    Rejected,
}

impl std::fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => f.write_str("approved"),
            Self::Rejected => f.write_str("rejected"),
        }
    }
}

/// How a submission was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Approved,
    Rejected,
    /// Closed by the caller after the review never arrived.
    Expired,
}

impl From<ReviewOutcome> for SubmissionOutcome {
    fn from(value: ReviewOutcome) -> Self {
        match value {
            ReviewOutcome::Approved => Self::Approved,
            ReviewOutcome::Rejected => Self::Rejected,
        }
    }
}

/// One submission of a tier for review. Never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub tier: TierId,
    pub submitted_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
    pub outcome: Option<SubmissionOutcome>,
    /// Documents that satisfied the tier's requirements when it was
    /// submitted. Approval applies to these and no others.
    #[serde(default)]
    pub documents: Vec<DocumentId>,
}

impl SubmissionRecord {
    /// Whether the submission is still awaiting a verdict.
    pub fn is_open(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Audit entry for a tier status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTransitionRecord {
    pub tier: TierId,
    pub from: TierStatus,
    pub to: TierStatus,
    pub timestamp: Timestamp,
    pub reason: String,
}

// ─── Verification State ──────────────────────────────────────────────

/// A user's complete verification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationState {
    pub(crate) user_id: UserId,
    pub(crate) current_tier: TierId,
    pub(crate) tier_status: BTreeMap<TierId, TierStatus>,
    pub(crate) facts: BTreeMap<String, bool>,
    pub(crate) documents: DocumentStore,
    pub(crate) submissions: Vec<SubmissionRecord>,
    pub(crate) history: Vec<TierTransitionRecord>,
    pub(crate) created_at: Timestamp,
    #[serde(default)]
    pub(crate) revision: u64,
}

impl VerificationState {
    /// Fresh state for a new account: tier 1, every tier not started.
    pub fn new(user_id: UserId, policy: &TierPolicy, now: Timestamp) -> Self {
        Self {
            user_id,
            current_tier: TierId::FIRST,
            tier_status: policy
                .tiers()
                .map(|t| (t.id, TierStatus::NotStarted))
                .collect(),
            facts: BTreeMap::new(),
            documents: DocumentStore::new(),
            submissions: Vec::new(),
            history: Vec::new(),
            created_at: now,
            revision: 0,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// The tier the user is working toward (or the last tier once fully verified).
    pub fn current_tier(&self) -> TierId {
        self.current_tier
    }

    /// Status of `tier`; tiers unknown to this state read as not started.
    pub fn tier_status(&self, tier: TierId) -> TierStatus {
        self.tier_status
            .get(&tier)
            .copied()
            .unwrap_or(TierStatus::NotStarted)
    }

    /// All tier statuses in ascending tier order.
    pub fn tier_statuses(&self) -> &BTreeMap<TierId, TierStatus> {
        &self.tier_status
    }

    /// Value of a fact; unknown facts read as false.
    pub fn fact(&self, name: &str) -> bool {
        self.facts.get(name).copied().unwrap_or(false)
    }

    pub fn facts(&self) -> &BTreeMap<String, bool> {
        &self.facts
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Submission log in chronological order.
    pub fn submissions(&self) -> &[SubmissionRecord] {
        &self.submissions
    }

    /// Transition log in chronological order.
    pub fn history(&self) -> &[TierTransitionRecord] {
        &self.history
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Number of committed changes. Zero for a state that was never changed
    /// after creation; storage compares it to detect concurrent writers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advance the revision before a changed state is saved.
    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    /// The open submission for `tier`, if one is awaiting review.
    pub fn open_submission(&self, tier: TierId) -> Option<&SubmissionRecord> {
        self.submissions
            .iter()
            .rev()
            .find(|s| s.tier == tier && s.is_open())
    }

    /// When the open submission for `tier` was made, if any.
    ///
    /// Callers that enforce a review deadline compare this against their
    /// clock and call `reset_submission` once it has passed.
    pub fn pending_review_since(&self, tier: TierId) -> Option<Timestamp> {
        self.open_submission(tier).map(|s| s.submitted_at)
    }

    /// Highest approved tier, if any.
    pub fn highest_approved(&self) -> Option<TierId> {
        self.tier_status
            .iter()
            .filter(|(_, status)| **status == TierStatus::Approved)
            .map(|(tier, _)| *tier)
            .max()
    }

    /// Whether every tier in `policy` has been approved.
    pub fn is_fully_verified(&self, policy: &TierPolicy) -> bool {
        self.tier_status(policy.max_tier()) == TierStatus::Approved
    }
}
