//! # Tier State Machine
//!
//! Transition methods on [`VerificationState`]. Every method validates its
//! preconditions before writing a single field, so a returned error always
//! leaves the state untouched. Durable commit and rollback across the
//! persistence gateway are handled one layer up, in `kyc-engine`.
//!
//! ## Rules
//!
//! - Submissions target the current tier only; skipping ahead is `WrongTier`.
//! - A tier that is submitted or approved answers `AlreadySubmitted`.
//! - Submitting locks every document of the tier.
//! - Approval advances `current_tier` by exactly one, unless the tier is the
//!   last one, in which case the user is fully verified.
//! - Rejection records `Submitted → Rejected → PendingDocuments`, unlocks
//!   only the rejected documents, and keeps approved ones.
//! - Approval marks approved exactly the documents that counted when the
//!   tier was submitted.
//! - `reset_submission` is the caller's timeout path for a review that
//!   never arrives; it is not available to end users.

use thiserror::Error;

use kyc_core::{DocumentId, DocumentKind, SubmissionId, TierId, Timestamp};

use crate::document::{Document, DocumentError, DocumentStatus};
use crate::evaluator::{evaluate, RequirementReport};
use crate::policy::{PolicyError, TierDefinition, TierPolicy};
use crate::verification::{
    ReviewOutcome, SubmissionOutcome, SubmissionRecord, TierStatus, TierTransitionRecord,
    VerificationState,
};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from tier transitions.
#[derive(Error, Debug)]
pub enum TierError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The operation targets a tier other than the active one.
    #[error("tier {requested} is not the active tier (current tier is {current})")]
    WrongTier { requested: TierId, current: TierId },

    /// The tier has already been submitted or approved.
    #[error("tier {tier} is already {status}")]
    AlreadySubmitted { tier: TierId, status: TierStatus },

    /// Requirements are unmet.
    #[error("tier {tier} is not ready to submit; missing: {}", .missing.join(", "))]
    NotReady { tier: TierId, missing: Vec<String> },

    /// There is no submission awaiting review for the tier.
    #[error("tier {tier} has no submission under review (status is {status})")]
    NotSubmitted { tier: TierId, status: TierStatus },

    #[error("fact name must not be empty")]
    EmptyFact,
}

// ─── Transitions ─────────────────────────────────────────────────────

impl VerificationState {
    /// Evaluate the checklist of `tier`.
    pub fn report(&self, policy: &TierPolicy, tier: TierId) -> Result<RequirementReport, TierError> {
        let definition = policy.tier(tier)?;
        Ok(evaluate(definition, &self.facts, self.documents.all()))
    }

    /// Whether `tier` could be submitted now, with the unmet requirements.
    ///
    /// Pure query; says nothing about whether `tier` is the current tier.
    pub fn can_submit(
        &self,
        policy: &TierPolicy,
        tier: TierId,
    ) -> Result<(bool, Vec<String>), TierError> {
        let report = self.report(policy, tier)?;
        Ok((report.ready_to_submit, report.missing()))
    }

    /// Set a boolean fact and refresh every open tier that depends on it.
    pub fn set_fact(
        &mut self,
        policy: &TierPolicy,
        name: &str,
        value: bool,
        now: Timestamp,
    ) -> Result<(), TierError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TierError::EmptyFact);
        }
        self.facts.insert(name.to_string(), value);

        let affected: Vec<TierId> = policy
            .tiers()
            .filter(|t| t.requires_fact(name))
            .map(|t| t.id)
            .collect();
        for tier in affected {
            self.refresh_status(policy, tier, now)?;
        }
        Ok(())
    }

    /// Upload a document against `tier`.
    pub fn add_document(
        &mut self,
        policy: &TierPolicy,
        tier: TierId,
        kind: DocumentKind,
        content_ref: impl Into<String>,
        now: Timestamp,
    ) -> Result<DocumentId, TierError> {
        let definition = policy.tier(tier)?;
        let status = self.tier_status(tier);
        let id = self
            .documents
            .add(definition, status, kind, content_ref, now)?
            .id;
        self.refresh_status(policy, tier, now)?;
        Ok(id)
    }

    pub fn update_progress(&mut self, document: DocumentId, percent: u8) -> Result<(), TierError> {
        Ok(self.documents.update_progress(document, percent)?)
    }

    /// Delete an unlocked document, returning the removed record.
    pub fn delete_document(
        &mut self,
        policy: &TierPolicy,
        document: DocumentId,
        now: Timestamp,
    ) -> Result<Document, TierError> {
        let removed = self.documents.delete(document)?;
        self.refresh_status(policy, removed.tier, now)?;
        Ok(removed)
    }

    /// Reviewer verdict on a single document: approved.
    pub fn mark_document_approved(&mut self, document: DocumentId) -> Result<(), TierError> {
        self.documents.mark_approved(document)?;
        Ok(())
    }

    /// Reviewer verdict on a single document: rejected. Locks are unchanged.
    pub fn mark_document_rejected(&mut self, document: DocumentId) -> Result<(), TierError> {
        self.documents.mark_rejected(document)?;
        Ok(())
    }

    /// Submit the current tier for review.
    ///
    /// # Errors
    ///
    /// - [`TierError::AlreadySubmitted`] if the tier is submitted or approved.
    /// - [`TierError::WrongTier`] if `tier` is not the current tier.
    /// - [`TierError::NotReady`] if any requirement is unmet.
    pub fn submit(
        &mut self,
        policy: &TierPolicy,
        tier: TierId,
        now: Timestamp,
    ) -> Result<SubmissionId, TierError> {
        let status = self.tier_status(tier);
        if policy.contains(tier) && status.is_submitted_or_later() {
            return Err(TierError::AlreadySubmitted { tier, status });
        }
        if tier != self.current_tier {
            return Err(TierError::WrongTier {
                requested: tier,
                current: self.current_tier,
            });
        }
        let report = self.report(policy, tier)?;
        if !report.ready_to_submit {
            return Err(TierError::NotReady {
                tier,
                missing: report.missing(),
            });
        }

        let id = SubmissionId::new();
        self.documents.lock_tier(tier);
        self.submissions.push(SubmissionRecord {
            id,
            tier,
            submitted_at: now,
            resolved_at: None,
            outcome: None,
            documents: report.checks.iter().filter_map(|c| c.document).collect(),
        });
        self.transition(tier, TierStatus::Submitted, "submitted for review", now);
        Ok(id)
    }

    /// Apply the reviewer's verdict to a submitted tier.
    ///
    /// # Errors
    ///
    /// - [`TierError::WrongTier`] if the tier is not defined or is not current.
    /// - [`TierError::NotSubmitted`] if the tier is not under review.
    pub fn resolve_review(
        &mut self,
        policy: &TierPolicy,
        tier: TierId,
        outcome: ReviewOutcome,
        now: Timestamp,
    ) -> Result<SubmissionId, TierError> {
        if !policy.contains(tier) {
            return Err(TierError::WrongTier {
                requested: tier,
                current: self.current_tier,
            });
        }
        let status = self.tier_status(tier);
        if status != TierStatus::Submitted {
            return Err(TierError::NotSubmitted { tier, status });
        }
        if tier != self.current_tier {
            return Err(TierError::WrongTier {
                requested: tier,
                current: self.current_tier,
            });
        }
        let submitted: Vec<DocumentId> = self
            .open_submission(tier)
            .map(|s| s.documents.clone())
            .unwrap_or_default();
        let submission = self.close_submission(tier, outcome.into(), now)?;

        match outcome {
            ReviewOutcome::Approved => {
                // Only documents that counted at submit time; a document the
                // reviewer rejected stays rejected.
                for id in submitted {
                    if self.documents.get(id)?.status == DocumentStatus::Pending {
                        self.documents.mark_approved(id)?;
                    }
                }
                self.transition(tier, TierStatus::Approved, "review approved", now);
                self.facts.insert(format!("tier_{tier}_approved"), true);
                if let Some(next) = policy.next_tier(tier) {
                    self.current_tier = next;
                }
            }
            ReviewOutcome::Rejected => {
                self.transition(tier, TierStatus::Rejected, "review rejected", now);
                self.documents.unlock_rejected(tier);
                self.transition(
                    tier,
                    TierStatus::PendingDocuments,
                    "reopened for re-upload",
                    now,
                );
            }
        }
        Ok(submission)
    }

    /// Close an unanswered submission so the tier can be submitted again.
    ///
    /// Unreviewed and rejected documents are unlocked; documents already
    /// approved stay locked and keep counting.
    pub fn reset_submission(
        &mut self,
        tier: TierId,
        now: Timestamp,
    ) -> Result<SubmissionId, TierError> {
        let status = self.tier_status(tier);
        if status != TierStatus::Submitted {
            return Err(TierError::NotSubmitted { tier, status });
        }
        let submission = self.close_submission(tier, SubmissionOutcome::Expired, now)?;
        self.documents.unlock_unapproved(tier);
        self.transition(
            tier,
            TierStatus::PendingDocuments,
            "submission expired without review",
            now,
        );
        Ok(submission)
    }

    /// Limits currently in force: those of the highest approved tier.
    pub fn effective_limits<'p>(&self, policy: &'p TierPolicy) -> Option<&'p TierDefinition> {
        self.highest_approved().and_then(|t| policy.tier(t).ok())
    }

    fn close_submission(
        &mut self,
        tier: TierId,
        outcome: SubmissionOutcome,
        now: Timestamp,
    ) -> Result<SubmissionId, TierError> {
        let status = self.tier_status(tier);
        let record = self
            .submissions
            .iter_mut()
            .rev()
            .find(|s| s.tier == tier && s.is_open())
            .ok_or(TierError::NotSubmitted { tier, status })?;
        record.outcome = Some(outcome);
        record.resolved_at = Some(now);
        Ok(record.id)
    }

    /// Recompute an open tier's status from its facts.
    fn refresh_status(
        &mut self,
        policy: &TierPolicy,
        tier: TierId,
        now: Timestamp,
    ) -> Result<(), TierError> {
        let current = self.tier_status(tier);
        if !current.is_open() || current == TierStatus::Rejected {
            return Ok(());
        }
        let definition = policy.tier(tier)?;
        let next = if definition.required_facts.iter().all(|f| self.fact(f)) {
            TierStatus::PendingDocuments
        } else {
            TierStatus::PendingFacts
        };
        if next != current {
            self.transition(tier, next, "requirements changed", now);
        }
        Ok(())
    }

    fn transition(&mut self, tier: TierId, to: TierStatus, reason: &str, now: Timestamp) {
        let from = self.tier_status(tier);
        self.history.push(TierTransitionRecord {
            tier,
            from,
            to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.tier_status.insert(tier, to);
    }
}
