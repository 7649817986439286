//! # Document Subcommands
//!
//! - `upload`: record a document against a tier, optionally with its
//!   progress in the same commit.
//! - `progress`: report upload progress for a document.
//! - `delete`: remove an unlocked document.
//! - `review-doc`: reviewer verdict on a single document.

use std::io::Write;

use anyhow::Result;
use clap::{Args, ValueEnum};

use kyc_core::{DocumentId, DocumentKind, TierId, UserId};
use kyc_engine::Engine;

/// Arguments for `kyc upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Tier the document is submitted under.
    #[arg(long)]
    pub tier: TierId,
    /// Document kind (e.g. `profile_photo`, `id_front`).
    #[arg(long)]
    pub kind: DocumentKind,
    /// Opaque reference to the stored content (URI or object key).
    #[arg(long = "ref")]
    pub content_ref: String,
    /// Upload progress to record in the same commit, in percent (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub progress: Option<u8>,
}

/// Arguments for `kyc progress`.
#[derive(Args, Debug)]
pub struct ProgressArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Document identifier, bare UUID or `document:<uuid>`.
    #[arg(long)]
    pub document: DocumentId,
    /// Progress in percent (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub percent: u8,
}

/// Arguments for `kyc delete`.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Document identifier.
    #[arg(long)]
    pub document: DocumentId,
}

/// Reviewer verdict on a document.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentVerdict {
    Approve,
    Reject,
}

/// Arguments for `kyc review-doc`.
#[derive(Args, Debug)]
pub struct ReviewDocArgs {
    /// User identifier.
    #[arg(long)]
    pub user: UserId,
    /// Document identifier.
    #[arg(long)]
    pub document: DocumentId,
    /// Verdict to record.
    #[arg(long, value_enum)]
    pub verdict: DocumentVerdict,
}

pub fn run_upload(args: &UploadArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let id = engine.upload_document(
        &args.user,
        args.tier,
        args.kind.clone(),
        &args.content_ref,
        args.progress,
    )?;
    writeln!(out, "{id}")?;
    Ok(0)
}

pub fn run_progress(args: &ProgressArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    engine.update_progress(&args.user, args.document, args.percent)?;
    writeln!(out, "OK: {} at {}%", args.document, args.percent)?;
    Ok(0)
}

pub fn run_delete(args: &DeleteArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let removed = engine.delete_document(&args.user, args.document)?;
    writeln!(out, "OK: deleted {} ({})", removed.id, removed.kind)?;
    Ok(0)
}

pub fn run_review_doc(args: &ReviewDocArgs, engine: &Engine, out: &mut dyn Write) -> Result<u8> {
    let label = match args.verdict {
        DocumentVerdict::Approve => {
            engine.mark_document_approved(&args.user, args.document)?;
            "approved"
        }
        DocumentVerdict::Reject => {
            engine.mark_document_rejected(&args.user, args.document)?;
            "rejected"
        }
    };
    writeln!(out, "OK: {} marked {label}", args.document)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use crate::context::{build_engine, resolve_config};
    use kyc_engine::{EngineConfig, EngineError, ErrorKind};
    use kyc_state::DocumentStatus;

    fn setup() -> (tempfile::TempDir, Engine, UserId) {
        let dir = tempfile::tempdir().unwrap();
        let engine = build_engine(&resolve_config(
            EngineConfig::default(),
            Some(dir.path().to_path_buf()),
            None,
        ))
        .unwrap();
        let user = UserId::new("ada").unwrap();
        engine.open_account(&user).unwrap();
        (dir, engine, user)
    }

    fn upload(engine: &Engine, user: &UserId, kind: &str) -> DocumentId {
        let mut out = Vec::new();
        let args = UploadArgs {
            user: user.clone(),
            tier: TierId::FIRST,
            kind: DocumentKind::new(kind).unwrap(),
            content_ref: "s3://bucket/object".into(),
            progress: Some(100),
        };
        run_upload(&args, engine, &mut out).unwrap();
        String::from_utf8(out).unwrap().trim().parse().unwrap()
    }

    #[test]
    fn upload_prints_a_parseable_id() {
        let (_dir, engine, user) = setup();
        let id = upload(&engine, &user, "profile_photo");
        let state = engine.snapshot(&user).unwrap();
        let doc = state.documents().get(id).unwrap();
        assert_eq!(doc.upload_progress, 100);
    }

    #[test]
    fn upload_with_out_of_range_progress_commits_nothing() {
        let (_dir, engine, user) = setup();
        let args = UploadArgs {
            user: user.clone(),
            tier: TierId::FIRST,
            kind: DocumentKind::new("profile_photo").unwrap(),
            content_ref: "s3://bucket/object".into(),
            progress: Some(150),
        };
        let mut out = Vec::new();
        let err = run_upload(&args, &engine, &mut out).unwrap_err();
        let kind = err.downcast_ref::<EngineError>().map(EngineError::kind);
        assert_eq!(kind, Some(ErrorKind::ProgressOutOfRange));
        assert!(out.is_empty());
        assert!(engine.snapshot(&user).unwrap().documents().is_empty());
    }

    #[test]
    fn progress_flags_are_range_checked_at_parse_time() {
        #[derive(clap::Parser, Debug)]
        struct Upload {
            #[command(flatten)]
            args: UploadArgs,
        }

        let base = [
            "kyc", "--user", "ada", "--tier", "1", "--kind", "profile_photo", "--ref", "s3://x",
        ];
        let parsed = Upload::try_parse_from(base.iter().chain(&["--progress", "100"])).unwrap();
        assert_eq!(parsed.args.progress, Some(100));
        assert!(Upload::try_parse_from(base.iter().chain(&["--progress", "150"])).is_err());
    }

    #[test]
    fn review_and_delete() {
        let (_dir, engine, user) = setup();
        let id = upload(&engine, &user, "profile_photo");
        let args = ReviewDocArgs {
            user: user.clone(),
            document: id,
            verdict: DocumentVerdict::Reject,
        };
        run_review_doc(&args, &engine, &mut Vec::new()).unwrap();
        assert_eq!(
            engine.snapshot(&user).unwrap().documents().get(id).unwrap().status,
            DocumentStatus::Rejected
        );

        let args = DeleteArgs {
            user: user.clone(),
            document: id,
        };
        run_delete(&args, &engine, &mut Vec::new()).unwrap();
        assert!(engine.snapshot(&user).unwrap().documents().is_empty());
    }

    #[test]
    fn progress_past_completion_is_refused() {
        let (_dir, engine, user) = setup();
        let id = upload(&engine, &user, "profile_photo");
        let args = ProgressArgs {
            user,
            document: id,
            percent: 100,
        };
        let err = run_progress(&args, &engine, &mut Vec::new()).unwrap_err();
        let kind = err.downcast_ref::<EngineError>().map(EngineError::kind);
        assert_eq!(kind, Some(ErrorKind::AlreadyComplete));
    }
}
