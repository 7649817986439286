//! # Submission Subcommands
//!
//! - `submit`: submit the current tier for review.
//! - `resolve`: record the reviewer's verdict on a submitted tier.
//! - `reset`: expire a submission whose review never arrived.

use std::io::Write;

use anyhow::Result;
use clap::{Args, ValueEnum};

use kyc_core::{TierId, UserId};
use kyc_engine::Engine;
use kyc_state::ReviewOutcome;

/// Arguments for `kyc submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Tier to submit; must be the user's current tier.
    #[arg(long)]
    pub tier: TierId,
}

/// Reviewer verdict on a tier.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierVerdict {
    Approve,
    Reject,
}

impl From<TierVerdict> for ReviewOutcome {
    fn from(value: TierVerdict) -> Self {
        match value {
            TierVerdict::Approve => ReviewOutcome::Approved,
            TierVerdict::Reject => ReviewOutcome::Rejected,
        }
    }
}

/// Arguments for `kyc resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Submitted tier.
    #[arg(long)]
    pub tier: TierId,
    /// Verdict to apply.
    #[arg(long, value_enum)]
    pub verdict: TierVerdict,
}

/// Arguments for `kyc reset`.
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Submitted tier.
    #[arg(long)]
    pub tier: TierId,
}

pub fn run_submit(args: &SubmitArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let submission = engine.submit(&args.user, args.tier)?;
    writeln!(out, "OK: tier {} submitted as {submission}", args.tier)?;
    Ok(0)
}

pub fn run_resolve(args: &ResolveArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let outcome = ReviewOutcome::from(args.verdict);
    let submission = engine.resolve_review(&args.user, args.tier, outcome)?;
    let state = engine.snapshot(&args.user)?;
    writeln!(
        out,
        "OK: {submission} {outcome}; current tier is {}",
        state.current_tier()
    )?;
    Ok(0)
}

pub fn run_reset(args: &ResetArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let submission = engine.reset_submission(&args.user, args.tier)?;
    writeln!(out, "OK: {submission} expired; tier {} reopened", args.tier)?;
    Ok(0)
}
