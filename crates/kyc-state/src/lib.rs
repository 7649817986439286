//! # kyc-state: Tier Progression Domain
//!
//! Everything about KYC tiers that does not touch I/O: the static tier
//! table, the requirement checklist, document records, and the transitions
//! of a user's verification state.
//!
//! ## Modules
//!
//! - **Policy** (`policy.rs`): tier definitions, limits, YAML loading.
//! - **Evaluator** (`evaluator.rs`): pure checklist evaluation.
//! - **Document** (`document.rs`): upload, progress, review, locking.
//! - **Verification** (`verification.rs`): the per-user state and its records.
//! - **Machine** (`machine.rs`): submit, review, reset, and the other
//!   transitions on `VerificationState`.
//!
//! ## Design
//!
//! The tier lifecycle uses an enum with validated transitions rather than
//! typestates: a user's tiers advance independently of the Rust type of the
//! state object, and the state is persisted and reloaded between steps.
//! Every transition method checks its preconditions first and returns an
//! error without writing anything when they fail.

pub mod document;
pub mod evaluator;
pub mod machine;
pub mod policy;
pub mod verification;

pub use document::{Document, DocumentError, DocumentStatus, DocumentStore};
pub use evaluator::{evaluate, Requirement, RequirementCheck, RequirementReport, RequirementStatus};
pub use machine::TierError;
pub use policy::{Limit, PolicyError, TierDefinition, TierPolicy};
pub use verification::{
    ReviewOutcome, SubmissionOutcome, SubmissionRecord, TierStatus, TierTransitionRecord,
    VerificationState,
};
