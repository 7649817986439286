//! # Core Error Types
//!
//! Construction failures for the primitives in this crate. Domain errors
//! (policy, documents, tier transitions) live in `kyc-state`.

use thiserror::Error;

/// Errors raised while constructing core primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KycCoreError {
    /// An identifier failed validation.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Which identifier namespace was being constructed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A timestamp could not be parsed or constructed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
