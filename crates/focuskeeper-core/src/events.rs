use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::session::{SessionRecord, SessionStatus};
use crate::timer::TimerMode;

/// Every state change in the engine produces an Event.
/// The UI listens for them; session submission outcomes arrive the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        session_id: String,
        time_left: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        time_left: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: TimerMode,
        to: TimerMode,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero on its own.
    TimerCompleted {
        mode: TimerMode,
        next_mode: TimerMode,
        cycle_number: u8,
        at: DateTime<Utc>,
    },
    ModeSwitched {
        mode: TimerMode,
        time_left: u64,
        at: DateTime<Utc>,
    },
    DurationSet {
        minutes: u32,
        at: DateTime<Utc>,
    },
    SubjectChanged {
        subject: Option<String>,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// A session record was handed to the backend collaborator.
    SessionSubmitted {
        session_id: String,
        status: SessionStatus,
        duration_min: u64,
        at: DateTime<Utc>,
    },
    /// The backend accepted a submission.
    SessionRecorded {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// The backend rejected a submission or could not be reached.
    /// Nothing is retried; the timer has already moved on.
    SessionSubmissionFailed {
        session_id: String,
        message: String,
        at: DateTime<Utc>,
    },
    SessionRated {
        session_id: String,
        rating: u8,
        at: DateTime<Utc>,
    },
    /// A pending session was cleared without a rating.
    PendingSessionResolved {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// State was replaced wholesale from the store after another instance wrote it.
    StateSynced {
        mode: TimerMode,
        is_active: bool,
        time_left: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: TimerMode,
        label: String,
        time_left: u64,
        is_active: bool,
        cycle_number: u8,
        sessions_completed: u64,
        subject: Option<String>,
        task_id: Option<String>,
        pending_session: Option<SessionRecord>,
        at: DateTime<Utc>,
    },
}

/// Sending half of the engine's notification channel.
///
/// Sends never block and never fail loudly: a UI that stopped listening
/// does not stop the timer.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event dropped: no listener");
        }
    }
}
