//! # Account Subcommands
//!
//! - `open`: create the user's verification state (idempotent).
//! - `status`: print current tier, per-tier checklist, documents, and
//!   submissions as JSON.
//! - `set-fact`: set or clear a boolean fact.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use kyc_core::{TierId, Timestamp, UserId};
use kyc_engine::Engine;
use kyc_state::{
    Document, RequirementCheck, SubmissionRecord, TierStatus, TierTransitionRecord,
    VerificationState,
};

use crate::print_json;

/// Arguments for `kyc open`.
#[derive(Args, Debug)]
pub struct OpenArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
}

/// Arguments for `kyc status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Include the tier transition log.
    #[arg(long)]
    pub history: bool,
}

/// Arguments for `kyc set-fact`.
#[derive(Args, Debug)]
pub struct SetFactArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Fact name (e.g. `phone_verified`).
    #[arg(long)]
    pub name: String,
    /// Clear the fact instead of setting it.
    #[arg(long)]
    pub unset: bool,
}

pub fn run_open(args: &OpenArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let state = engine.open_account(&args.user)?;
    writeln!(
        out,
        "OK: account {} at tier {}",
        state.user_id(),
        state.current_tier()
    )?;
    Ok(0)
}

pub fn run_status(args: &StatusArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let state = engine.snapshot(&args.user)?;
    let view = StatusView::build(engine, &state, args.history)?;
    print_json(out, &view)?;
    Ok(0)
}

pub fn run_set_fact(args: &SetFactArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let value = !args.unset;
    engine.set_fact(&args.user, &args.name, value)?;
    writeln!(out, "OK: {} = {value}", args.name.trim())?;
    Ok(0)
}

// ─── Status view ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView<'a> {
    user: &'a UserId,
    current_tier: TierId,
    fully_verified: bool,
    tiers: Vec<TierView<'a>>,
    facts: &'a BTreeMap<String, bool>,
    documents: &'a [Document],
    submissions: &'a [SubmissionRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<&'a [TierTransitionRecord]>,
}

#[derive(Serialize)]
struct TierView<'a> {
    tier: TierId,
    name: &'a str,
    status: TierStatus,
    ready_to_submit: bool,
    checks: Vec<RequirementCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_review_since: Option<Timestamp>,
}

impl<'a> StatusView<'a> {
    fn build(
        engine: &'a Engine,
        state: &'a VerificationState,
        history: bool,
    ) -> Result<Self> {
        let policy = engine.policy();
        let mut tiers = Vec::new();
        for definition in policy.tiers() {
            let report = state.report(policy, definition.id)?;
            tiers.push(TierView {
                tier: definition.id,
                name: &definition.name,
                status: state.tier_status(definition.id),
                ready_to_submit: report.ready_to_submit,
                checks: report.checks,
                pending_review_since: state.pending_review_since(definition.id),
            });
        }
        Ok(Self {
            user: state.user_id(),
            current_tier: state.current_tier(),
            fully_verified: state.is_fully_verified(policy),
            tiers,
            facts: state.facts(),
            documents: state.documents().all(),
            submissions: state.submissions(),
            history: history.then(|| state.history()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{build_engine, resolve_config};
    use kyc_engine::EngineConfig;

    fn engine(dir: &std::path::Path) -> Engine {
        build_engine(&resolve_config(
            EngineConfig::default(),
            Some(dir.to_path_buf()),
            None,
        ))
        .unwrap()
    }

    #[test]
    fn open_then_status_prints_json() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let user = UserId::new("ada").unwrap();

        let mut out = Vec::new();
        run_open(&OpenArgs { user: user.clone() }, &engine, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("tier 1"));

        let mut out = Vec::new();
        run_status(
            &StatusArgs {
                user,
                history: false,
            },
            &engine,
            &mut out,
        )
        .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["current_tier"], 1);
        assert_eq!(json["tiers"].as_array().unwrap().len(), 3);
        assert_eq!(json["tiers"][0]["status"], "not_started");
        assert!(json.get("history").is_none());
    }

    #[test]
    fn set_fact_updates_status() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let user = UserId::new("ada").unwrap();
        engine.open_account(&user).unwrap();

        let args = SetFactArgs {
            user: user.clone(),
            name: "phone_verified".into(),
            unset: false,
        };
        run_set_fact(&args, &engine, &mut Vec::new()).unwrap();
        assert!(engine.snapshot(&user).unwrap().fact("phone_verified"));
        assert_eq!(
            engine.snapshot(&user).unwrap().tier_status(TierId::FIRST),
            TierStatus::PendingFacts
        );
    }

    #[test]
    fn status_of_unknown_user_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let args = StatusArgs {
            user: UserId::new("ghost").unwrap(),
            history: true,
        };
        assert!(run_status(&args, &engine, &mut Vec::new()).is_err());
    }
}
