//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier the engine handles. Each namespace
//! is a distinct type, so a `DocumentId` can never be confused with a
//! `SubmissionId` and a tier number can never be confused with a percentage.
//!
//! String-backed identifiers (`UserId`, `DocumentKind`) are validated on
//! construction *and* on deserialization, because persisted snapshots and
//! policy files are untrusted input. `UserId` values are used as file names
//! by the JSON gateway, so the accepted alphabet excludes path separators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KycCoreError;

const MAX_IDENT_LEN: usize = 64;

// ─── User ────────────────────────────────────────────────────────────

/// Identifier of the account holder whose verification state is tracked.
///
/// Accepts 1–64 characters from `[A-Za-z0-9_.-]`, not starting with `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a user identifier.
    pub fn new(value: impl Into<String>) -> Result<Self, KycCoreError> {
        let value = value.into();
        let invalid = |reason| KycCoreError::InvalidIdentifier {
            kind: "user",
            value: value.clone(),
            reason,
        };
        if value.is_empty() || value.len() > MAX_IDENT_LEN {
            return Err(invalid("length must be between 1 and 64"));
        }
        if value.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(invalid("allowed characters are [A-Za-z0-9_.-]"));
        }
        Ok(Self(value))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = KycCoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = KycCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Document kind ───────────────────────────────────────────────────

/// Kind of an identity document, e.g. `id_front`, `address_proof`.
///
/// Lowercase snake case: 1–64 characters from `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentKind(String);

impl DocumentKind {
    /// Validate and wrap a document kind.
    pub fn new(value: impl Into<String>) -> Result<Self, KycCoreError> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_IDENT_LEN {
            return Err(KycCoreError::InvalidIdentifier {
                kind: "document kind",
                value,
                reason: "length must be between 1 and 64",
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(KycCoreError::InvalidIdentifier {
                kind: "document kind",
                value,
                reason: "allowed characters are [a-z0-9_]",
            });
        }
        Ok(Self(value))
    }

    /// Borrow the kind as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentKind {
    type Error = KycCoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentKind> for String {
    fn from(value: DocumentKind) -> Self {
        value.0
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = KycCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Tier ────────────────────────────────────────────────────────────

/// A verification tier number. Tiers are 1-based; zero is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TierId(u8);

impl TierId {
    /// The entry tier every account starts at.
    pub const FIRST: TierId = TierId(1);

    /// Wrap a tier number, rejecting zero.
    pub fn new(value: u8) -> Result<Self, KycCoreError> {
        if value == 0 {
            return Err(KycCoreError::InvalidIdentifier {
                kind: "tier",
                value: value.to_string(),
                reason: "tiers are numbered from 1",
            });
        }
        Ok(Self(value))
    }

    /// The numeric tier.
    pub fn get(&self) -> u8 {
        self.0
    }

    /// The tier directly above this one, if representable.
    pub fn next(&self) -> Option<TierId> {
        self.0.checked_add(1).map(TierId)
    }
}

impl TryFrom<u8> for TierId {
    type Error = KycCoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TierId> for u8 {
    fn from(value: TierId) -> Self {
        value.0
    }
}

impl std::fmt::Display for TierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TierId {
    type Err = KycCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s.trim().parse::<u8>().map_err(|_| KycCoreError::InvalidIdentifier {
            kind: "tier",
            value: s.to_string(),
            reason: "expected an integer between 1 and 255",
        })?;
        Self::new(n)
    }
}

// ─── UUID-backed record identifiers ──────────────────────────────────

/// Unique identifier of an uploaded document record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

/// Unique identifier of a tier submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl DocumentId {
    /// Generate a new random document identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionId {
    /// Generate a new random submission identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "document:{}", self.0)
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission:{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = KycCoreError;

    /// Accepts either the bare UUID or the `document:<uuid>` display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("document:").unwrap_or(s);
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| KycCoreError::InvalidIdentifier {
                kind: "document",
                value: s.to_string(),
                reason: "expected a UUID",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_typical_handles() {
        for ok in ["alice", "user-42", "acct_7.backup", "A1"] {
            assert!(UserId::new(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn user_id_rejects_path_like_values() {
        for bad in ["", "../etc", ".hidden", "a/b", "a b", &"x".repeat(65)] {
            assert!(UserId::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn user_id_validated_on_deserialize() {
        let ok: UserId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<UserId>("\"a/b\"").is_err());
    }

    #[test]
    fn document_kind_is_snake_case() {
        assert!(DocumentKind::new("id_front").is_ok());
        assert!(DocumentKind::new("IdFront").is_err());
        assert!(DocumentKind::new("id-front").is_err());
        assert!(DocumentKind::new("").is_err());
    }

    #[test]
    fn tier_zero_is_rejected() {
        assert!(TierId::new(0).is_err());
        assert!(serde_json::from_str::<TierId>("0").is_err());
        assert_eq!(TierId::new(1).unwrap(), TierId::FIRST);
    }

    #[test]
    fn tier_next_and_parse() {
        assert_eq!(TierId::FIRST.next().map(|t| t.get()), Some(2));
        assert_eq!(TierId::new(255).unwrap().next(), None);
        assert_eq!("3".parse::<TierId>().unwrap().get(), 3);
        assert!("three".parse::<TierId>().is_err());
    }

    #[test]
    fn tier_serializes_as_integer() {
        let json = serde_json::to_string(&TierId::new(2).unwrap()).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn document_ids_are_unique() {
        assert_ne!(DocumentId::new(), DocumentId::new());
        assert_ne!(SubmissionId::new(), SubmissionId::new());
    }

    #[test]
    fn document_id_parses_display_form() {
        let id = DocumentId::new();
        let parsed: DocumentId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        let bare: DocumentId = id.as_uuid().to_string().parse().unwrap();
        assert_eq!(bare, id);
        assert!("document:nope".parse::<DocumentId>().is_err());
    }
}
