//! # Persistence Gateway
//!
//! Durable storage for [`VerificationState`] snapshots. The engine reads
//! through the gateway when an account is first touched and writes through
//! after every committed mutation; a failed write rolls the mutation back.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryGateway`]: a process-local map, with fault injection for
//!   exercising rollback paths.
//! - [`JsonFileGateway`]: one pretty-printed `<user>.json` file per user.
//!   Writes go to a hidden temporary file first and are renamed into place,
//!   so a crash mid-write never leaves a truncated snapshot behind.
//!
//! ## Revisions
//!
//! Every save names the revision the caller last saw. A gateway refuses the
//! write with [`PersistenceError::Conflict`] when the stored snapshot has
//! moved on, which happens when another engine (another process, for the
//! file gateway) committed in between. The engine reloads and retries.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

use kyc_core::UserId;
use kyc_state::VerificationState;

/// Errors from a persistence gateway.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot for {user}: {source}")]
    Serialization {
        user: UserId,
        #[source]
        source: serde_json::Error,
    },

    /// A stored snapshot names a different user than the file it was read from.
    #[error("snapshot for {expected} contains state of {found}")]
    UserMismatch { expected: UserId, found: UserId },

    /// The stored snapshot is not at the revision the writer started from.
    /// `None` means no snapshot.
    #[error("snapshot for {user} changed concurrently (expected revision {expected:?}, found {found:?})")]
    Conflict {
        user: UserId,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// The backing store refused the request.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Storage for per-user verification state.
///
/// Implementations must be `Send + Sync`; the engine shares one gateway
/// across every thread behind an `Arc`.
pub trait PersistenceGateway: Send + Sync {
    /// Load the stored state, or `None` if the user has never been saved.
    fn load(&self, user: &UserId) -> Result<Option<VerificationState>, PersistenceError>;

    /// Replace the stored state, provided the stored revision still equals
    /// `expected_revision` (`None`: nothing may be stored yet). Fails with
    /// [`PersistenceError::Conflict`] otherwise and leaves storage untouched.
    fn save(
        &self,
        user: &UserId,
        state: &VerificationState,
        expected_revision: Option<u64>,
    ) -> Result<(), PersistenceError>;

    /// Human-readable name for log output.
    fn gateway_name(&self) -> &str;
}

// ─── In-memory ───────────────────────────────────────────────────────

/// Process-local gateway.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    records: RwLock<HashMap<UserId, VerificationState>>,
    failing_saves: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `save` fail with
    /// [`PersistenceError::Unavailable`].
    pub fn fail_next_saves(&self, count: usize) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The stored state for `user`, bypassing the trait.
    pub fn stored(&self, user: &UserId) -> Option<VerificationState> {
        self.records.read().get(user).cloned()
    }
}

impl PersistenceGateway for InMemoryGateway {
    fn load(&self, user: &UserId) -> Result<Option<VerificationState>, PersistenceError> {
        Ok(self.records.read().get(user).cloned())
    }

    fn save(
        &self,
        user: &UserId,
        state: &VerificationState,
        expected_revision: Option<u64>,
    ) -> Result<(), PersistenceError> {
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PersistenceError::Unavailable(format!(
                "injected save failure for {user}"
            )));
        }
        let mut records = self.records.write();
        check_revision(user, expected_revision, records.get(user))?;
        records.insert(user.clone(), state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn gateway_name(&self) -> &str {
        "InMemoryGateway"
    }
}

fn check_revision(
    user: &UserId,
    expected: Option<u64>,
    stored: Option<&VerificationState>,
) -> Result<(), PersistenceError> {
    let found = stored.map(VerificationState::revision);
    if found != expected {
        return Err(PersistenceError::Conflict {
            user: user.clone(),
            expected,
            found,
        });
    }
    Ok(())
}

// ─── JSON files ──────────────────────────────────────────────────────

const LOCK_ATTEMPTS: u32 = 200;
const LOCK_BACKOFF: Duration = Duration::from_millis(10);

/// Gateway storing each user's state as `<root>/<user>.json`.
///
/// `UserId` admits only `[A-Za-z0-9_.-]` with no leading dot, so a user id
/// is always a plain file name inside `root`.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    root: PathBuf,
}

impl JsonFileGateway {
    /// Open (and create if needed) the storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| PersistenceError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file for `user`.
    pub fn path_for(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.json", user.as_str()))
    }

    fn temp_path_for(&self, user: &UserId) -> PathBuf {
        self.root.join(format!(".{}.json.tmp", user.as_str()))
    }

    fn lock_path_for(&self, user: &UserId) -> PathBuf {
        self.root.join(format!(".{}.json.lock", user.as_str()))
    }

    /// Take the per-user write lock shared by every process using `root`.
    ///
    /// The lock is a marker file created with `create_new`, which fails with
    /// `AlreadyExists` while another writer holds it. A marker left behind by
    /// a crashed process has to be removed by hand.
    fn lock(&self, user: &UserId) -> Result<WriteLock, PersistenceError> {
        let path = self.lock_path_for(user);
        for _ in 0..LOCK_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(_) => return Ok(WriteLock { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    thread::sleep(LOCK_BACKOFF);
                }
                Err(source) => return Err(PersistenceError::Io { path, source }),
            }
        }
        Err(PersistenceError::Unavailable(format!(
            "write lock {} is held by another writer",
            path.display()
        )))
    }
}

/// Held write lock; removes the marker file when dropped.
#[derive(Debug)]
struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release write lock");
        }
    }
}

impl PersistenceGateway for JsonFileGateway {
    fn load(&self, user: &UserId) -> Result<Option<VerificationState>, PersistenceError> {
        let path = self.path_for(user);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };
        let state: VerificationState =
            serde_json::from_str(&raw).map_err(|source| PersistenceError::Serialization {
                user: user.clone(),
                source,
            })?;
        if state.user_id() != user {
            return Err(PersistenceError::UserMismatch {
                expected: user.clone(),
                found: state.user_id().clone(),
            });
        }
        Ok(Some(state))
    }

    fn save(
        &self,
        user: &UserId,
        state: &VerificationState,
        expected_revision: Option<u64>,
    ) -> Result<(), PersistenceError> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|source| PersistenceError::Serialization {
                user: user.clone(),
                source,
            })?;
        let _lock = self.lock(user)?;
        check_revision(user, expected_revision, self.load(user)?.as_ref())?;

        let temp = self.temp_path_for(user);
        let io_err = |path: &Path, source: std::io::Error| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = fs::File::create(&temp).map_err(|e| io_err(&temp, e))?;
        file.write_all(&bytes).map_err(|e| io_err(&temp, e))?;
        file.sync_all().map_err(|e| io_err(&temp, e))?;
        drop(file);

        let target = self.path_for(user);
        fs::rename(&temp, &target).map_err(|e| io_err(&target, e))?;
        Ok(())
    }

    fn gateway_name(&self) -> &str {
        "JsonFileGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_core::Timestamp;
    use kyc_state::TierPolicy;

    fn state(user: &str) -> VerificationState {
        VerificationState::new(
            UserId::new(user).unwrap(),
            &TierPolicy::standard(),
            Timestamp::now(),
        )
    }

    #[test]
    fn in_memory_round_trip() {
        let gateway = InMemoryGateway::new();
        let s = state("ada");
        assert!(gateway.load(s.user_id()).unwrap().is_none());
        gateway.save(s.user_id(), &s, None).unwrap();
        assert_eq!(gateway.load(s.user_id()).unwrap(), Some(s));
        assert_eq!(gateway.save_count(), 1);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let gateway = InMemoryGateway::new();
        let s = state("ada");
        gateway.fail_next_saves(2);
        assert!(matches!(
            gateway.save(s.user_id(), &s, None),
            Err(PersistenceError::Unavailable(_))
        ));
        assert!(gateway.save(s.user_id(), &s, None).is_err());
        gateway.save(s.user_id(), &s, None).unwrap();
        assert_eq!(gateway.save_count(), 1);
    }

    #[test]
    fn json_file_paths_stay_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = JsonFileGateway::open(dir.path()).unwrap();
        let user = UserId::new("user-42").unwrap();
        assert_eq!(gateway.path_for(&user), dir.path().join("user-42.json"));
    }

    #[test]
    fn in_memory_save_checks_revision() {
        let gateway = InMemoryGateway::new();
        let mut s = state("ada");
        gateway.save(s.user_id(), &s, None).unwrap();
        assert!(matches!(
            gateway.save(s.user_id(), &s, None),
            Err(PersistenceError::Conflict { expected: None, found: Some(0), .. })
        ));

        s.bump_revision();
        gateway.save(s.user_id(), &s, Some(0)).unwrap();
        let err = gateway.save(s.user_id(), &s, Some(0)).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Conflict { expected: Some(0), found: Some(1), .. }
        ));
        assert_eq!(gateway.stored(s.user_id()).map(|s| s.revision()), Some(1));
    }

    #[test]
    fn json_file_stale_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = JsonFileGateway::open(dir.path()).unwrap();
        let mut s = state("ada");
        gateway.save(s.user_id(), &s, None).unwrap();
        s.bump_revision();
        gateway.save(s.user_id(), &s, Some(0)).unwrap();

        let mut stale = state("ada");
        stale.bump_revision();
        assert!(matches!(
            gateway.save(stale.user_id(), &stale, Some(0)),
            Err(PersistenceError::Conflict { found: Some(1), .. })
        ));
        assert_eq!(gateway.load(s.user_id()).unwrap(), Some(s));
        assert!(!gateway.lock_path_for(stale.user_id()).exists());
    }

    #[test]
    fn json_file_held_lock_blocks_writers() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = JsonFileGateway::open(dir.path()).unwrap();
        let s = state("ada");
        let held = gateway.lock(s.user_id()).unwrap();
        assert!(matches!(
            gateway.save(s.user_id(), &s, None),
            Err(PersistenceError::Unavailable(_))
        ));
        drop(held);
        gateway.save(s.user_id(), &s, None).unwrap();
    }
}
