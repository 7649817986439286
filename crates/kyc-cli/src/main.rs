//! # kyc CLI entry point
//!
//! Parses command-line arguments, builds the engine from environment
//! configuration plus flag overrides, and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kyc_cli::account::{run_open, run_set_fact, run_status, OpenArgs, SetFactArgs, StatusArgs};
use kyc_cli::context::{build_engine, resolve_config};
use kyc_cli::document::{
    run_delete, run_progress, run_review_doc, run_upload, DeleteArgs, ProgressArgs,
    ReviewDocArgs, UploadArgs,
};
use kyc_cli::policy::{run_policy, PolicyArgs};
use kyc_cli::review::{run_reset, run_resolve, run_submit, ResetArgs, ResolveArgs, SubmitArgs};
use kyc_engine::{EngineConfig, EngineError};

/// KYC tier engine CLI.
///
/// Manages user verification tiers stored as JSON snapshots: facts,
/// document uploads, tier submissions, and review verdicts.
#[derive(Parser, Debug)]
#[command(name = "kyc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Snapshot directory (overrides KYC_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// YAML tier policy (overrides KYC_TIER_POLICY).
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a user's verification account.
    Open(OpenArgs),

    /// Show a user's tiers, checklist, documents, and submissions.
    Status(StatusArgs),

    /// Set or clear a boolean fact.
    SetFact(SetFactArgs),

    /// Record a document upload.
    Upload(UploadArgs),

    /// Advance a document's upload progress.
    Progress(ProgressArgs),

    /// Delete an unlocked document.
    Delete(DeleteArgs),

    /// Approve or reject a single document.
    ReviewDoc(ReviewDocArgs),

    /// Submit the current tier for review.
    Submit(SubmitArgs),

    /// Approve or reject a submitted tier.
    Resolve(ResolveArgs),

    /// Expire a submission whose review never arrived.
    Reset(ResetArgs),

    /// Print the tier table in force.
    Policy(PolicyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match EngineConfig::from_env() {
        Ok(config) => resolve_config(config, cli.data_dir.clone(), cli.policy.clone()),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    // RUST_LOG wins, then -v, then KYC_LOG_LEVEL.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new(&config.log_level),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    let out = &mut stdout;
    let result = match &cli.command {
        Commands::Open(args) => run_open(args, &engine, out),
        Commands::Status(args) => run_status(args, &engine, out),
        Commands::SetFact(args) => run_set_fact(args, &engine, out),
        Commands::Upload(args) => run_upload(args, &engine, out),
        Commands::Progress(args) => run_progress(args, &engine, out),
        Commands::Delete(args) => run_delete(args, &engine, out),
        Commands::ReviewDoc(args) => run_review_doc(args, &engine, out),
        Commands::Submit(args) => run_submit(args, &engine, out),
        Commands::Resolve(args) => run_resolve(args, &engine, out),
        Commands::Reset(args) => run_reset(args, &engine, out),
        Commands::Policy(args) => run_policy(args, &engine, out),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 75 (`EX_TEMPFAIL`) for retryable storage failures, 2 for refused
/// operations, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EngineError>() {
        Some(e) if e.kind().is_retryable() => 75,
        Some(_) => 2,
        None => 1,
    }
}
