//! # Policy Subcommand
//!
//! Prints the tier table in force, as JSON or YAML.

use std::io::Write;

use anyhow::Result;
use clap::{Args, ValueEnum};

use kyc_engine::Engine;

use crate::print_json;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyFormat {
    #[default]
    Json,
    Yaml,
}

/// Arguments for `kyc policy`.
#[derive(Args, Debug)]
pub struct PolicyArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = PolicyFormat::Json)]
    pub format: PolicyFormat,
}

pub fn run_policy(args: &PolicyArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    match args.format {
        PolicyFormat::Json => print_json(out, engine.policy())?,
        PolicyFormat::Yaml => out.write_all(serde_yaml::to_string(engine.policy())?.as_bytes())?,
    }
    Ok(0)
}
