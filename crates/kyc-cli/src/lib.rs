//! # kyc-cli: Operator Command-Line Interface
//!
//! Drives the KYC tier engine against a directory of JSON snapshots. Every
//! invocation is a fresh process: accounts are read through the
//! `JsonFileGateway`, changed, and written back.
//!
//! ## Subcommands
//!
//! - `open`, `status`, `set-fact`: account lifecycle and facts
//! - `upload`, `progress`, `delete`, `review-doc`: documents
//! - `submit`, `resolve`, `reset`: tier submissions and reviews
//! - `policy`: print the tier table in force
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; tier rules live in `kyc-state`.
//! - Handlers write to a caller-supplied writer so tests can capture output.
//! - Structured output is JSON.

pub mod account;
pub mod context;
pub mod document;
pub mod policy;
pub mod review;

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Write `value` as pretty JSON followed by a newline.
pub(crate) fn print_json(out: &mut dyn Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
