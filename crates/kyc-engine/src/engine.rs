//! # Engine
//!
//! The entry point callers use. Holds the tier policy, the external
//! collaborators, and a registry of loaded accounts.
//!
//! ## Commit protocol
//!
//! Every mutating operation runs under the user's write lock:
//!
//! 1. refresh the live state from the gateway if the stored revision moved,
//!    then clone it into a working copy,
//! 2. apply the state-machine transition to the copy,
//! 3. save the copy through the [`PersistenceGateway`],
//! 4. swap the copy in as the live state.
//!
//! A validation error at step 2 or a save failure at step 3 drops the copy,
//! so the live state and the stored state never diverge. Notifications and
//! review scheduling happen after the lock is released and cannot undo a
//! commit.
//!
//! The save at step 3 names the revision the live state was loaded at. If
//! another engine sharing the same storage committed in the meantime, the
//! gateway answers [`PersistenceError::Conflict`]; the engine runs the
//! operation again from step 1, so it is re-validated against what the
//! other writer did. A racing second
//! submission therefore fails with `AlreadySubmitted` even across processes.
//!
//! Queries take the read lock and see the last state this engine loaded or
//! committed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use kyc_core::{DocumentId, DocumentKind, SubmissionId, TierId, Timestamp, UserId};
use kyc_state::{
    Document, RequirementReport, ReviewOutcome, TierDefinition, TierError, TierPolicy,
    VerificationState,
};

use crate::error::EngineError;
use crate::notify::{NotificationDispatcher, TierEvent};
use crate::persistence::{PersistenceError, PersistenceGateway};
use crate::review::{ReviewQueue, ReviewRequest};

type Account = Arc<RwLock<VerificationState>>;

/// Attempts per mutation before a revision conflict is returned to the caller.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// KYC tier engine.
pub struct Engine {
    policy: TierPolicy,
    gateway: Arc<dyn PersistenceGateway>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    reviews: Arc<dyn ReviewQueue>,
    accounts: RwLock<HashMap<UserId, Account>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("max_tier", &self.policy.max_tier())
            .field("gateway", &self.gateway.gateway_name())
            .field("loaded_accounts", &self.accounts.read().len())
            .finish()
    }
}

impl Engine {
    pub fn new(
        policy: TierPolicy,
        gateway: Arc<dyn PersistenceGateway>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        reviews: Arc<dyn ReviewQueue>,
    ) -> Self {
        Self {
            policy,
            gateway,
            dispatcher,
            reviews,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    // ─── Accounts ────────────────────────────────────────────────────

    /// Open the account for `user`, creating and saving a fresh state if
    /// the gateway has none. Idempotent; returns the current snapshot.
    pub fn open_account(&self, user: &UserId) -> Result<VerificationState, EngineError> {
        if let Some(account) = self.accounts.read().get(user) {
            return Ok(account.read().clone());
        }

        let mut accounts = self.accounts.write();
        if let Some(account) = accounts.get(user) {
            return Ok(account.read().clone());
        }
        let state = match self.gateway.load(user)? {
            Some(state) => {
                tracing::debug!(user = %user, "account loaded from storage");
                state
            }
            None => {
                let state = VerificationState::new(user.clone(), &self.policy, Timestamp::now());
                match self.gateway.save(user, &state, None) {
                    Ok(()) => {
                        tracing::info!(
                            user = %user,
                            gateway = self.gateway.gateway_name(),
                            "account opened"
                        );
                        state
                    }
                    // Opened concurrently by another engine.
                    Err(PersistenceError::Conflict { .. }) => self
                        .gateway
                        .load(user)?
                        .ok_or_else(|| EngineError::UnknownUser(user.clone()))?,
                    Err(e) => return Err(e.into()),
                }
            }
        };
        accounts.insert(user.clone(), Arc::new(RwLock::new(state.clone())));
        Ok(state)
    }

    /// The loaded account, reading through to the gateway on first use.
    fn account(&self, user: &UserId) -> Result<Account, EngineError> {
        if let Some(account) = self.accounts.read().get(user) {
            return Ok(Arc::clone(account));
        }

        let mut accounts = self.accounts.write();
        if let Some(account) = accounts.get(user) {
            return Ok(Arc::clone(account));
        }
        let state = self
            .gateway
            .load(user)?
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        tracing::debug!(user = %user, "account loaded from storage");
        let account = Arc::new(RwLock::new(state));
        accounts.insert(user.clone(), Arc::clone(&account));
        Ok(account)
    }

    // ─── Queries ─────────────────────────────────────────────────────

    /// A copy of the committed state.
    pub fn snapshot(&self, user: &UserId) -> Result<VerificationState, EngineError> {
        Ok(self.account(user)?.read().clone())
    }

    pub fn report(&self, user: &UserId, tier: TierId) -> Result<RequirementReport, EngineError> {
        let account = self.account(user)?;
        let state = account.read();
        Ok(state.report(&self.policy, tier)?)
    }

    /// Whether `tier` is ready to submit, with the unmet requirements.
    pub fn can_submit(
        &self,
        user: &UserId,
        tier: TierId,
    ) -> Result<(bool, Vec<String>), EngineError> {
        let account = self.account(user)?;
        let state = account.read();
        Ok(state.can_submit(&self.policy, tier)?)
    }

    /// When the open submission of `tier` was made. Callers enforcing a
    /// review deadline compare this with their clock and call
    /// [`Engine::reset_submission`].
    pub fn pending_review_since(
        &self,
        user: &UserId,
        tier: TierId,
    ) -> Result<Option<Timestamp>, EngineError> {
        Ok(self.account(user)?.read().pending_review_since(tier))
    }

    /// Limits of the highest approved tier, if any.
    pub fn effective_limits(&self, user: &UserId) -> Result<Option<TierDefinition>, EngineError> {
        let account = self.account(user)?;
        let state = account.read();
        Ok(state.effective_limits(&self.policy).cloned())
    }

    // ─── Mutations ───────────────────────────────────────────────────

    pub fn set_fact(&self, user: &UserId, name: &str, value: bool) -> Result<(), EngineError> {
        let now = Timestamp::now();
        self.mutate(user, "set_fact", |state, policy| {
            state.set_fact(policy, name, value, now)
        })
    }

    pub fn add_document(
        &self,
        user: &UserId,
        tier: TierId,
        kind: DocumentKind,
        content_ref: &str,
    ) -> Result<DocumentId, EngineError> {
        self.upload_document(user, tier, kind, content_ref, None)
    }

    /// Upload a document and, if `progress` is given, record its upload
    /// progress in the same commit. Nothing is stored if either step fails.
    pub fn upload_document(
        &self,
        user: &UserId,
        tier: TierId,
        kind: DocumentKind,
        content_ref: &str,
        progress: Option<u8>,
    ) -> Result<DocumentId, EngineError> {
        let now = Timestamp::now();
        self.mutate(user, "add_document", |state, policy| {
            let id = state.add_document(policy, tier, kind.clone(), content_ref, now)?;
            if let Some(percent) = progress {
                state.update_progress(id, percent)?;
            }
            Ok(id)
        })
    }

    pub fn update_progress(
        &self,
        user: &UserId,
        document: DocumentId,
        percent: u8,
    ) -> Result<(), EngineError> {
        self.mutate(user, "update_progress", |state, _| {
            state.update_progress(document, percent)
        })
    }

    pub fn delete_document(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<Document, EngineError> {
        let now = Timestamp::now();
        self.mutate(user, "delete_document", |state, policy| {
            state.delete_document(policy, document, now)
        })
    }

    pub fn mark_document_approved(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<(), EngineError> {
        self.mutate(user, "mark_document_approved", |state, _| {
            state.mark_document_approved(document)
        })
    }

    pub fn mark_document_rejected(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<(), EngineError> {
        self.mutate(user, "mark_document_rejected", |state, _| {
            state.mark_document_rejected(document)
        })
    }

    /// Submit `tier` for review.
    ///
    /// On commit the user is notified and a [`ReviewRequest`] is scheduled.
    /// Of two racing submissions for the same tier, the loser receives
    /// `AlreadySubmitted`.
    pub fn submit(&self, user: &UserId, tier: TierId) -> Result<SubmissionId, EngineError> {
        let now = Timestamp::now();
        let (submission, documents) = self.mutate(user, "submit", |state, policy| {
            let submission = state.submit(policy, tier, now)?;
            let documents = state
                .open_submission(tier)
                .map(|s| s.documents.clone())
                .unwrap_or_default();
            Ok((submission, documents))
        })?;

        self.dispatch(user, TierEvent::Submitted, tier, submission);
        let request = ReviewRequest {
            user: user.clone(),
            tier,
            submission,
            documents,
            submitted_at: now,
        };
        if let Err(e) = self.reviews.schedule(request) {
            tracing::warn!(
                user = %user,
                tier = %tier,
                submission = %submission,
                error = %e,
                "review scheduling failed; submission stays open"
            );
        }
        Ok(submission)
    }

    /// Apply the reviewer's verdict and notify the user.
    pub fn resolve_review(
        &self,
        user: &UserId,
        tier: TierId,
        outcome: ReviewOutcome,
    ) -> Result<SubmissionId, EngineError> {
        let now = Timestamp::now();
        let submission = self.mutate(user, "resolve_review", |state, policy| {
            state.resolve_review(policy, tier, outcome, now)
        })?;
        let event = match outcome {
            ReviewOutcome::Approved => TierEvent::Approved,
            ReviewOutcome::Rejected => TierEvent::Rejected,
        };
        self.dispatch(user, event, tier, submission);
        Ok(submission)
    }

    /// Expire an unanswered submission so the tier can be submitted again.
    pub fn reset_submission(
        &self,
        user: &UserId,
        tier: TierId,
    ) -> Result<SubmissionId, EngineError> {
        let now = Timestamp::now();
        self.mutate(user, "reset_submission", |state, _| {
            state.reset_submission(tier, now)
        })
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn mutate<R>(
        &self,
        user: &UserId,
        operation: &'static str,
        mut apply: impl FnMut(&mut VerificationState, &TierPolicy) -> Result<R, TierError>,
    ) -> Result<R, EngineError> {
        let account = self.account(user)?;
        let mut live = account.write();

        let mut attempt = 1;
        loop {
            self.refresh(user, &mut live)?;
            let mut working = live.clone();
            let value = match apply(&mut working, &self.policy) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(user = %user, operation, error = %e, "operation refused");
                    return Err(e.into());
                }
            };
            if working == *live {
                return Ok(value);
            }
            working.bump_revision();

            match self.gateway.save(user, &working, Some(live.revision())) {
                Ok(()) => {
                    *live = working;
                    tracing::info!(
                        user = %user,
                        operation,
                        current_tier = %live.current_tier(),
                        revision = live.revision(),
                        "committed"
                    );
                    return Ok(value);
                }
                Err(PersistenceError::Conflict { found, .. }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::debug!(
                        user = %user,
                        operation,
                        attempt,
                        found = ?found,
                        "stored state moved on; retrying"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        user = %user,
                        operation,
                        error = %e,
                        "save failed; change rolled back"
                    );
                    return Err(e.into());
                }
            }
        }
    }

    /// Replace `live` with the stored state if another writer committed.
    fn refresh(&self, user: &UserId, live: &mut VerificationState) -> Result<(), EngineError> {
        let stored = self
            .gateway
            .load(user)?
            .ok_or_else(|| EngineError::UnknownUser(user.clone()))?;
        if stored.revision() != live.revision() {
            tracing::debug!(
                user = %user,
                cached = live.revision(),
                stored = stored.revision(),
                "reloaded account changed by another writer"
            );
            *live = stored;
        }
        Ok(())
    }

    fn dispatch(&self, user: &UserId, event: TierEvent, tier: TierId, submission: SubmissionId) {
        if let Err(e) = self.dispatcher.notify(user, event, tier, submission) {
            tracing::warn!(
                user = %user,
                tier = %tier,
                submission = %submission,
                event = %event,
                error = %e,
                "notification failed; change stays committed"
            );
        }
    }
}
