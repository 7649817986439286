//! # Engine Errors
//!
//! [`EngineError`] wraps the layer errors below it. Callers that only need
//! to pick a user-facing message or decide whether to retry use
//! [`EngineError::kind`], which flattens every variant into one
//! [`ErrorKind`].

use thiserror::Error;

use kyc_core::UserId;
use kyc_state::{DocumentError, PolicyError, TierError};

use crate::persistence::PersistenceError;

/// Errors returned by [`crate::Engine`] operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The state machine refused the operation. Nothing was written.
    #[error(transparent)]
    Tier(#[from] TierError),

    /// The gateway failed to save or load. Any in-flight change was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// No account has been opened for the user.
    #[error("no verification state for user {0}")]
    UnknownUser(UserId),
}

/// Flat classification of every engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    WrongKindForTier,
    TierAlreadySubmitted,
    WrongTier,
    NotReady,
    AlreadySubmitted,
    Locked,
    NotSubmitted,
    PersistenceFailure,
    AlreadyComplete,
    ProgressRegression,
    ProgressOutOfRange,
    AlreadyReviewed,
    UnknownUser,
    InvalidPolicy,
    /// Blank fact names or content references.
    InvalidInput,
}

impl ErrorKind {
    /// Only persistence failures are transient; everything else fails the
    /// same way on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceFailure)
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Tier(err) => tier_kind(err),
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
            Self::UnknownUser(_) => ErrorKind::UnknownUser,
        }
    }
}

fn tier_kind(err: &TierError) -> ErrorKind {
    match err {
        TierError::Policy(PolicyError::NotFound { .. }) => ErrorKind::NotFound,
        TierError::Policy(_) => ErrorKind::InvalidPolicy,
        TierError::Document(doc) => match doc {
            DocumentError::NotFound { .. } => ErrorKind::NotFound,
            DocumentError::WrongKindForTier { .. } => ErrorKind::WrongKindForTier,
            DocumentError::TierAlreadySubmitted { .. } => ErrorKind::TierAlreadySubmitted,
            DocumentError::Locked { .. } => ErrorKind::Locked,
            DocumentError::AlreadyComplete { .. } => ErrorKind::AlreadyComplete,
            DocumentError::ProgressRegression { .. } => ErrorKind::ProgressRegression,
            DocumentError::ProgressOutOfRange { .. } => ErrorKind::ProgressOutOfRange,
            DocumentError::AlreadyReviewed { .. } => ErrorKind::AlreadyReviewed,
            DocumentError::EmptyContentRef => ErrorKind::InvalidInput,
        },
        TierError::WrongTier { .. } => ErrorKind::WrongTier,
        TierError::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
        TierError::NotReady { .. } => ErrorKind::NotReady,
        TierError::NotSubmitted { .. } => ErrorKind::NotSubmitted,
        TierError::EmptyFact => ErrorKind::InvalidInput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_core::{DocumentId, TierId};

    #[test]
    fn only_persistence_is_retryable() {
        let err = EngineError::Persistence(PersistenceError::Unavailable("disk full".into()));
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(err.kind().is_retryable());

        let err = EngineError::Tier(TierError::WrongTier {
            requested: TierId::new(2).unwrap(),
            current: TierId::FIRST,
        });
        assert_eq!(err.kind(), ErrorKind::WrongTier);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn document_errors_keep_their_kind() {
        let id = DocumentId::new();
        let err = EngineError::from(TierError::from(DocumentError::Locked { id }));
        assert_eq!(err.kind(), ErrorKind::Locked);
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn unknown_tier_lookup_is_not_found() {
        let err = EngineError::from(TierError::from(PolicyError::NotFound {
            tier: TierId::new(7).unwrap(),
            max: TierId::new(3).unwrap(),
        }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
