//! # Requirement Evaluator
//!
//! Pure evaluation of a tier's checklist against the user's facts and
//! documents. No side effects; the state machine calls it before every
//! submission and callers may call it freely for progress screens.
//!
//! ## Document rules
//!
//! Only documents uploaded against the evaluated tier with a matching kind
//! are considered. Among those, the non-rejected record with the highest
//! creation `sequence` counts; older non-rejected records are superseded and
//! ignored. A rejected record never satisfies a requirement: the kind stays
//! `Rejected` until a fresh upload arrives.
//!
//! A pending document satisfies "ready to submit" but not "fully approved".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kyc_core::{DocumentId, DocumentKind, TierId};

use crate::document::{Document, DocumentStatus};
use crate::policy::TierDefinition;

/// Outcome for one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Met,
    Pending,
    /// Every record of this kind was rejected; a re-upload is needed.
    Rejected,
}

/// A single checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum Requirement {
    Fact(String),
    Document(DocumentKind),
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fact(name) => f.write_str(name),
            Self::Document(kind) => write!(f, "{kind}"),
        }
    }
}

/// Evaluation of one requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub requirement: Requirement,
    pub status: RequirementStatus,
    /// The document that counts toward a document requirement, if any.
    pub document: Option<DocumentId>,
}

/// Checklist for a tier with aggregate readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementReport {
    pub tier: TierId,
    /// Facts first, then documents, each in policy order.
    pub checks: Vec<RequirementCheck>,
    /// Every requirement is `Met`.
    pub ready_to_submit: bool,
    /// Ready, and every counting document is approved.
    pub fully_approved: bool,
}

impl RequirementReport {
    /// Names of requirements that are not `Met`, in checklist order.
    pub fn missing(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| c.status != RequirementStatus::Met)
            .map(|c| c.requirement.to_string())
            .collect()
    }

    /// Status of a particular requirement, if the tier has it.
    pub fn status_of(&self, requirement: &Requirement) -> Option<RequirementStatus> {
        self.checks
            .iter()
            .find(|c| &c.requirement == requirement)
            .map(|c| c.status)
    }
}

/// Evaluate `tier` against `facts` and `docs`.
///
/// `docs` may contain documents of any tier; only those of `tier.id` are
/// considered.
pub fn evaluate<'a>(
    tier: &TierDefinition,
    facts: &BTreeMap<String, bool>,
    docs: impl IntoIterator<Item = &'a Document>,
) -> RequirementReport {
    let docs: Vec<&Document> = docs.into_iter().filter(|d| d.tier == tier.id).collect();
    let mut checks = Vec::with_capacity(tier.required_facts.len() + tier.required_documents.len());
    let mut all_approved = true;

    for fact in &tier.required_facts {
        let status = if facts.get(fact).copied().unwrap_or(false) {
            RequirementStatus::Met
        } else {
            RequirementStatus::Pending
        };
        checks.push(RequirementCheck {
            requirement: Requirement::Fact(fact.clone()),
            status,
            document: None,
        });
    }

    for kind in &tier.required_documents {
        let of_kind: Vec<&Document> = docs.iter().copied().filter(|d| &d.kind == kind).collect();
        let counting = of_kind
            .iter()
            .filter(|d| d.status != DocumentStatus::Rejected)
            .max_by_key(|d| d.sequence);

        let (status, document) = match counting {
            Some(doc) => {
                if doc.status != DocumentStatus::Approved {
                    all_approved = false;
                }
                (RequirementStatus::Met, Some(doc.id))
            }
            None if !of_kind.is_empty() => (RequirementStatus::Rejected, None),
            None => (RequirementStatus::Pending, None),
        };
        checks.push(RequirementCheck {
            requirement: Requirement::Document(kind.clone()),
            status,
            document,
        });
    }

    let ready_to_submit = checks.iter().all(|c| c.status == RequirementStatus::Met);
    RequirementReport {
        tier: tier.id,
        checks,
        ready_to_submit,
        fully_approved: ready_to_submit && all_approved,
    }
}
