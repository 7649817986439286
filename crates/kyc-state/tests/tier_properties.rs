//! # Tier Progression Properties
//!
//! Generated checks over the standard policy:
//!
//! 1. `can_submit` agrees with a direct reading of the rules for every
//!    combination of facts and document statuses.
//! 2. `current_tier` never decreases and never moves by more than one per
//!    approval, whatever sequence of operations is applied. Documents of a
//!    submitted tier stay locked throughout.

use proptest::prelude::*;

use kyc_core::{DocumentKind, TierId, Timestamp, UserId};
use kyc_state::{
    DocumentStatus, ReviewOutcome, TierError, TierPolicy, TierStatus, VerificationState,
};

fn tier(n: u8) -> TierId {
    TierId::new(n).unwrap()
}

/// What a test case uploads for one required kind.
#[derive(Debug, Clone, Copy)]
enum Upload {
    Missing,
    Pending,
    Approved,
    Rejected,
    RejectedThenPending,
}

fn upload() -> impl Strategy<Value = Upload> {
    prop_oneof![
        Just(Upload::Missing),
        Just(Upload::Pending),
        Just(Upload::Approved),
        Just(Upload::Rejected),
        Just(Upload::RejectedThenPending),
    ]
}

fn fresh(policy: &TierPolicy) -> VerificationState {
    VerificationState::new(UserId::new("prop-user").unwrap(), policy, Timestamp::now())
}

proptest! {
    #[test]
    fn can_submit_iff_facts_true_and_documents_not_rejected(
        tier_n in 1u8..=3,
        fact_values in prop::collection::vec(any::<bool>(), 2),
        uploads in prop::collection::vec(upload(), 2),
    ) {
        let policy = TierPolicy::standard();
        let definition = policy.tier(tier(tier_n)).unwrap().clone();
        let mut state = fresh(&policy);
        let now = Timestamp::now();

        let mut expected = true;
        for (fact, value) in definition.required_facts.iter().zip(fact_values.iter()) {
            state.set_fact(&policy, fact, *value, now).unwrap();
            expected &= *value;
        }

        for (kind, plan) in definition.required_documents.iter().zip(uploads.iter()) {
            let add = |state: &mut VerificationState, kind: &DocumentKind| {
                state
                    .add_document(&policy, definition.id, kind.clone(), "mem://doc", now)
                    .unwrap()
            };
            match plan {
                Upload::Missing => expected = false,
                Upload::Pending => {
                    add(&mut state, kind);
                }
                Upload::Approved => {
                    let id = add(&mut state, kind);
                    state.mark_document_approved(id).unwrap();
                }
                Upload::Rejected => {
                    let id = add(&mut state, kind);
                    state.mark_document_rejected(id).unwrap();
                    expected = false;
                }
                Upload::RejectedThenPending => {
                    let id = add(&mut state, kind);
                    state.mark_document_rejected(id).unwrap();
                    add(&mut state, kind);
                }
            }
        }

        let (ready, missing) = state.can_submit(&policy, definition.id).unwrap();
        prop_assert_eq!(ready, expected);
        prop_assert_eq!(missing.is_empty(), expected);
    }
}

/// Operations the monotonicity property draws from.
#[derive(Debug, Clone)]
enum Op {
    CompleteTier(u8),
    Submit(u8),
    Approve(u8),
    Reject(u8),
    RejectDocuments(u8),
    Reset(u8),
}

fn op() -> impl Strategy<Value = Op> {
    (0usize..6, 1u8..=4).prop_map(|(which, t)| match which {
        0 => Op::CompleteTier(t),
        1 => Op::Submit(t),
        2 => Op::Approve(t),
        3 => Op::Reject(t),
        4 => Op::RejectDocuments(t),
        _ => Op::Reset(t),
    })
}

fn complete_tier(policy: &TierPolicy, state: &mut VerificationState, n: u8) {
    let Ok(definition) = policy.tier(tier(n)) else {
        return;
    };
    let now = Timestamp::now();
    for fact in &definition.required_facts {
        let _ = state.set_fact(policy, fact, true, now);
    }
    for kind in &definition.required_documents {
        let _ = state.add_document(policy, definition.id, kind.clone(), "mem://doc", now);
    }
}

proptest! {
    #[test]
    fn current_tier_is_monotonic_and_steps_by_one(ops in prop::collection::vec(op(), 1..40)) {
        let policy = TierPolicy::standard();
        let mut state = fresh(&policy);
        let now = Timestamp::now();

        for op in ops {
            let before = state.current_tier();
            let mut approved = false;
            match op {
                Op::CompleteTier(n) => complete_tier(&policy, &mut state, n),
                Op::Submit(n) => {
                    let _ = state.submit(&policy, tier(n), now);
                }
                Op::Approve(n) => {
                    approved = state
                        .resolve_review(&policy, tier(n), ReviewOutcome::Approved, now)
                        .is_ok();
                }
                Op::Reject(n) => {
                    let _ = state.resolve_review(&policy, tier(n), ReviewOutcome::Rejected, now);
                }
                Op::RejectDocuments(n) => {
                    let pending: Vec<_> = state
                        .documents()
                        .for_tier(tier(n))
                        .filter(|d| d.status == DocumentStatus::Pending)
                        .map(|d| d.id)
                        .collect();
                    for id in pending {
                        state.mark_document_rejected(id).unwrap();
                    }
                }
                Op::Reset(n) => {
                    let _ = state.reset_submission(tier(n), now);
                }
            }
            let after = state.current_tier();
            prop_assert!(after >= before);
            if approved && policy.next_tier(before).is_some() {
                prop_assert_eq!(after.get(), before.get() + 1);
            } else {
                prop_assert_eq!(after, before);
            }

            let submitted: Vec<TierId> = state
                .tier_statuses()
                .iter()
                .filter(|(_, s)| **s == TierStatus::Submitted)
                .map(|(t, _)| *t)
                .collect();
            for t in submitted {
                prop_assert!(state.documents().for_tier(t).all(|d| d.locked));
            }
        }
    }
}

#[test]
fn submit_two_ahead_is_wrong_tier() {
    let policy = TierPolicy::standard();
    let mut state = fresh(&policy);
    complete_tier(&policy, &mut state, 3);
    assert!(matches!(
        state.submit(&policy, tier(3), Timestamp::now()),
        Err(TierError::WrongTier { .. })
    ));
}
