//! # Notification Dispatcher
//!
//! Outbound tier events. Delivery is best-effort: the engine invokes the
//! dispatcher only after a change has been committed, logs any failure at
//! `warn`, and never rolls the change back because a notification failed.
//!
//! Dispatch happens outside the user's lock, so concurrent callers may
//! deliver events for one user out of order (an `approved` can overtake the
//! `submitted` it answers). Every event carries the [`SubmissionId`] it
//! belongs to; consumers that care about order correlate on it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kyc_core::{SubmissionId, TierId, UserId};

/// Tier lifecycle events announced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierEvent {
    Submitted,
    Approved,
    Rejected,
}

impl std::fmt::Display for TierEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Delivers tier events to the user through whatever channel the host app
/// provides.
pub trait NotificationDispatcher: Send + Sync {
    fn notify(
        &self,
        user: &UserId,
        event: TierEvent,
        tier: TierId,
        submission: SubmissionId,
    ) -> Result<(), NotifyError>;
}

/// Dispatcher that only writes a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn notify(
        &self,
        user: &UserId,
        event: TierEvent,
        tier: TierId,
        submission: SubmissionId,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            user = %user,
            tier = %tier,
            event = %event,
            submission = %submission,
            "tier notification"
        );
        Ok(())
    }
}

/// A delivered notification, as captured by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user: UserId,
    pub event: TierEvent,
    pub tier: TierId,
    pub submission: SubmissionId,
}

/// Dispatcher that keeps every notification in memory. Can be switched
/// into a failing mode to exercise the engine's best-effort path.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    delivered: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// While `failing` is set, every `notify` call returns an error and
    /// nothing is recorded.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Notifications delivered so far, oldest first.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn notify(
        &self,
        user: &UserId,
        event: TierEvent,
        tier: TierId,
        submission: SubmissionId,
    ) -> Result<(), NotifyError> {
        if *self.failing.lock() {
            return Err(NotifyError::Unavailable("recording dispatcher set to fail".into()));
        }
        self.delivered.lock().push(Notification {
            user: user.clone(),
            event,
            tier,
            submission,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_dispatcher_captures_in_order() {
        let dispatcher = RecordingDispatcher::new();
        let user = UserId::new("ada").unwrap();
        let submission = SubmissionId::new();
        dispatcher
            .notify(&user, TierEvent::Submitted, TierId::FIRST, submission)
            .unwrap();
        dispatcher
            .notify(&user, TierEvent::Approved, TierId::FIRST, submission)
            .unwrap();
        let delivered = dispatcher.delivered();
        let events: Vec<TierEvent> = delivered.iter().map(|n| n.event).collect();
        assert_eq!(events, vec![TierEvent::Submitted, TierEvent::Approved]);
        assert!(delivered.iter().all(|n| n.submission == submission));
    }

    #[test]
    fn failing_mode_records_nothing() {
        let dispatcher = RecordingDispatcher::new();
        dispatcher.set_failing(true);
        let user = UserId::new("ada").unwrap();
        assert!(dispatcher
            .notify(&user, TierEvent::Rejected, TierId::FIRST, SubmissionId::new())
            .is_err());
        assert!(dispatcher.delivered().is_empty());
    }
}
