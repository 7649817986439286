//! # Tier Policy
//!
//! The static table of verification tiers: spending limits, the documents
//! each tier requires, and the non-document facts (phone verification,
//! completed profile) that must hold before a tier can be submitted.
//!
//! A policy is immutable once built. [`TierPolicy::new`] validates that tier
//! ids are contiguous from 1 and that no tier lists a requirement twice, so
//! every other component can index tiers without re-checking.
//!
//! ## Default table
//!
//! ```text
//! tier  name      send/day   receive/day  wallet cap  cards  documents          facts
//! 1     Basic     50 000     100 000      300 000     1      profile_photo      phone_verified, basic_info_complete
//! 2     Verified  200 000    unlimited    1 000 000   3      id_front, id_back  bvn_verified
//! 3     Premium   5 000 000  unlimited    unlimited   10     address_proof      source_of_funds_declared
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kyc_core::{DocumentKind, TierId};

// ─── Limits ──────────────────────────────────────────────────────────

/// A monetary limit in whole currency units.
///
/// Serialized as a bare integer for capped limits and as the string
/// `"unlimited"` otherwise, in both JSON and YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LimitRepr", into = "LimitRepr")]
pub enum Limit {
    /// At most this many units.
    Capped(u64),
    /// No ceiling.
    Unlimited,
}

impl Limit {
    /// Whether `amount` fits within the limit.
    pub fn allows(&self, amount: u64) -> bool {
        match self {
            Self::Capped(cap) => amount <= *cap,
            Self::Unlimited => true,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Capped(cap) => write!(f, "{cap}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Amount(u64),
    Keyword(String),
}

impl TryFrom<LimitRepr> for Limit {
    type Error = String;

    fn try_from(value: LimitRepr) -> Result<Self, Self::Error> {
        match value {
            LimitRepr::Amount(cap) => Ok(Self::Capped(cap)),
            LimitRepr::Keyword(word) if word.eq_ignore_ascii_case("unlimited") => {
                Ok(Self::Unlimited)
            }
            LimitRepr::Keyword(word) => Err(format!(
                "limit must be a non-negative integer or \"unlimited\", got {word:?}"
            )),
        }
    }
}

impl From<Limit> for LimitRepr {
    fn from(value: Limit) -> Self {
        match value {
            Limit::Capped(cap) => Self::Amount(cap),
            Limit::Unlimited => Self::Keyword("unlimited".to_string()),
        }
    }
}

// ─── Tier definition ─────────────────────────────────────────────────

/// Static definition of one verification tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDefinition {
    /// 1-based tier number.
    pub id: TierId,
    /// Display label.
    pub name: String,
    pub daily_send_limit: Limit,
    pub daily_receive_limit: Limit,
    pub wallet_cap: Limit,
    pub virtual_card_allowance: u32,
    /// Document kinds that must be uploaded, in display order. May be empty.
    #[serde(default)]
    pub required_documents: Vec<DocumentKind>,
    /// Boolean facts that must be true, in display order. May be empty.
    #[serde(default)]
    pub required_facts: Vec<String>,
}

impl TierDefinition {
    /// Whether documents of `kind` belong to this tier.
    pub fn requires_document(&self, kind: &DocumentKind) -> bool {
        self.required_documents.contains(kind)
    }

    /// Whether this tier gates on `fact`.
    pub fn requires_fact(&self, fact: &str) -> bool {
        self.required_facts.iter().any(|f| f == fact)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from building or querying a tier policy.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// The tier is outside `[1, max_tier]`.
    #[error("tier {tier} is not defined (policy has tiers 1..={max})")]
    NotFound {
        /// The requested tier.
        tier: TierId,
        /// Highest tier in the policy.
        max: TierId,
    },

    /// The table violates a structural rule.
    #[error("invalid tier policy: {0}")]
    Invalid(String),

    /// The YAML source could not be parsed.
    #[error("tier policy YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// ─── Policy ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PolicyFile {
    tiers: Vec<TierDefinition>,
}

/// Validated, read-only table of tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPolicy {
    tiers: Vec<TierDefinition>,
}

impl TierPolicy {
    /// Build a policy from tier definitions listed in order.
    ///
    /// # Errors
    ///
    /// [`PolicyError::Invalid`] if the table is empty, ids are not exactly
    /// `1..=n` in order, or a tier repeats a document kind or fact.
    pub fn new(tiers: Vec<TierDefinition>) -> Result<Self, PolicyError> {
        if tiers.is_empty() {
            return Err(PolicyError::Invalid("policy defines no tiers".to_string()));
        }
        if tiers.len() > usize::from(u8::MAX) {
            return Err(PolicyError::Invalid(format!(
                "policy defines {} tiers, at most 255 are supported",
                tiers.len()
            )));
        }
        for (index, tier) in tiers.iter().enumerate() {
            let expected = index + 1;
            if usize::from(tier.id.get()) != expected {
                return Err(PolicyError::Invalid(format!(
                    "tier at position {expected} has id {}; ids must be 1..=n without gaps",
                    tier.id
                )));
            }
            let mut kinds = BTreeSet::new();
            for kind in &tier.required_documents {
                if !kinds.insert(kind) {
                    return Err(PolicyError::Invalid(format!(
                        "tier {} lists document kind {kind} twice",
                        tier.id
                    )));
                }
            }
            let mut facts = BTreeSet::new();
            for fact in &tier.required_facts {
                if fact.trim().is_empty() {
                    return Err(PolicyError::Invalid(format!(
                        "tier {} has an empty fact name",
                        tier.id
                    )));
                }
                if !facts.insert(fact) {
                    return Err(PolicyError::Invalid(format!(
                        "tier {} lists fact {fact} twice",
                        tier.id
                    )));
                }
            }
        }
        Ok(Self { tiers })
    }

    /// Parse a policy from YAML of the form `tiers: [ {id: 1, ...}, ... ]`.
    pub fn from_yaml(source: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_yaml::from_str(source)?;
        Self::new(file.tiers)
    }

    /// The three-tier table the app ships with.
    pub fn standard() -> Self {
        let kinds = |names: &[&str]| -> Vec<DocumentKind> {
            names
                .iter()
                .filter_map(|n| DocumentKind::new(*n).ok())
                .collect()
        };
        let facts = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();

        Self {
            tiers: vec![
                TierDefinition {
                    id: TierId::FIRST,
                    name: "Basic".to_string(),
                    daily_send_limit: Limit::Capped(50_000),
                    daily_receive_limit: Limit::Capped(100_000),
                    wallet_cap: Limit::Capped(300_000),
                    virtual_card_allowance: 1,
                    required_documents: kinds(&["profile_photo"]),
                    required_facts: facts(&["phone_verified", "basic_info_complete"]),
                },
                TierDefinition {
                    id: tier_id(2),
                    name: "Verified".to_string(),
                    daily_send_limit: Limit::Capped(200_000),
                    daily_receive_limit: Limit::Unlimited,
                    wallet_cap: Limit::Capped(1_000_000),
                    virtual_card_allowance: 3,
                    required_documents: kinds(&["id_front", "id_back"]),
                    required_facts: facts(&["bvn_verified"]),
                },
                TierDefinition {
                    id: tier_id(3),
                    name: "Premium".to_string(),
                    daily_send_limit: Limit::Capped(5_000_000),
                    daily_receive_limit: Limit::Unlimited,
                    wallet_cap: Limit::Unlimited,
                    virtual_card_allowance: 10,
                    required_documents: kinds(&["address_proof"]),
                    required_facts: facts(&["source_of_funds_declared"]),
                },
            ],
        }
    }

    /// Look up a tier.
    pub fn tier(&self, id: TierId) -> Result<&TierDefinition, PolicyError> {
        self.tiers
            .get(usize::from(id.get()) - 1)
            .ok_or(PolicyError::NotFound {
                tier: id,
                max: self.max_tier(),
            })
    }

    /// Whether `id` names a tier in this policy.
    pub fn contains(&self, id: TierId) -> bool {
        id <= self.max_tier()
    }

    /// The highest tier.
    pub fn max_tier(&self) -> TierId {
        self.tiers.last().map(|t| t.id).unwrap_or(TierId::FIRST)
    }

    /// The tier after `id`, or `None` if `id` is the last one.
    pub fn next_tier(&self, id: TierId) -> Option<TierId> {
        id.next().filter(|next| self.contains(*next))
    }

    /// All tiers in ascending order.
    pub fn tiers(&self) -> impl Iterator<Item = &TierDefinition> {
        self.tiers.iter()
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Tier numbers used by the built-in table are non-zero literals.
fn tier_id(n: u8) -> TierId {
    TierId::new(n).unwrap_or(TierId::FIRST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u8) -> TierId {
        TierId::new(n).unwrap()
    }

    #[test]
    fn standard_policy_is_valid() {
        let policy = TierPolicy::standard();
        let rebuilt = TierPolicy::new(policy.tiers().cloned().collect()).unwrap();
        assert_eq!(rebuilt, policy);
        assert_eq!(policy.max_tier(), t(3));
    }

    #[test]
    fn lookup_outside_range_is_not_found() {
        let policy = TierPolicy::standard();
        assert!(policy.tier(t(1)).is_ok());
        assert!(policy.tier(t(3)).is_ok());
        assert!(matches!(
            policy.tier(t(4)),
            Err(PolicyError::NotFound { tier, .. }) if tier == t(4)
        ));
    }

    #[test]
    fn next_tier_stops_at_max() {
        let policy = TierPolicy::standard();
        assert_eq!(policy.next_tier(t(1)), Some(t(2)));
        assert_eq!(policy.next_tier(t(3)), None);
    }

    #[test]
    fn gaps_in_ids_are_rejected() {
        let mut tiers: Vec<_> = TierPolicy::standard().tiers().cloned().collect();
        tiers.remove(1);
        assert!(matches!(TierPolicy::new(tiers), Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn duplicate_requirements_are_rejected() {
        let mut tiers: Vec<_> = TierPolicy::standard().tiers().cloned().collect();
        tiers[1]
            .required_documents
            .push(DocumentKind::new("id_front").unwrap());
        assert!(matches!(TierPolicy::new(tiers), Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn empty_policy_is_rejected() {
        assert!(TierPolicy::new(Vec::new()).is_err());
    }

    #[test]
    fn loads_from_yaml() {
        let yaml = r#"
tiers:
  - id: 1
    name: Starter
    daily_send_limit: 10000
    daily_receive_limit: 20000
    wallet_cap: 50000
    virtual_card_allowance: 0
    required_facts: [phone_verified]
  - id: 2
    name: Full
    daily_send_limit: 100000
    daily_receive_limit: unlimited
    wallet_cap: unlimited
    virtual_card_allowance: 2
    required_documents: [passport]
"#;
        let policy = TierPolicy::from_yaml(yaml).unwrap();
        let first = policy.tier(t(1)).unwrap();
        assert!(first.required_documents.is_empty());
        assert_eq!(first.daily_send_limit, Limit::Capped(10_000));
        let second = policy.tier(t(2)).unwrap();
        assert_eq!(second.daily_receive_limit, Limit::Unlimited);
        assert!(second.requires_document(&DocumentKind::new("passport").unwrap()));
    }

    #[test]
    fn yaml_with_bad_limit_is_rejected() {
        let yaml = r#"
tiers:
  - id: 1
    name: Starter
    daily_send_limit: lots
    daily_receive_limit: 1
    wallet_cap: 1
    virtual_card_allowance: 0
"#;
        assert!(matches!(TierPolicy::from_yaml(yaml), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn limit_serializes_without_sentinels() {
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "\"unlimited\"");
        assert_eq!(serde_json::to_string(&Limit::Capped(5)).unwrap(), "5");
        assert!(Limit::Unlimited.allows(u64::MAX));
        assert!(!Limit::Capped(5).allows(6));
    }
}
