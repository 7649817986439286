//! # kyc-core: Foundational Types for the KYC Tier Engine
//!
//! Defines the primitives every other crate in the workspace builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `UserId`, `DocumentId`,
//!    `SubmissionId`, `TierId`, and `DocumentKind` are distinct types with
//!    validated constructors. A document id cannot be passed where a
//!    submission id is expected.
//!
//! 2. **Identifiers are minted once.** `DocumentId` and `SubmissionId` are
//!    UUID v4 values generated at record creation and stored with the record.
//!    They are never recomputed from clocks or counters.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision so
//!    persisted snapshots compare equal after a round trip.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `kyc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::KycCoreError;
pub use identity::{DocumentId, DocumentKind, SubmissionId, TierId, UserId};
pub use temporal::Timestamp;
