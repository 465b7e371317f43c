//! Turning finished runs into session records and handing them to the backend.

mod http;
mod record;
mod recorder;

pub use http::HttpSessionSink;
pub use record::{SessionRecord, SessionStatus, SESSION_SOURCE};
pub use recorder::{duration_minutes, RunSummary, SessionRecorder};

use std::sync::Mutex;

use chrono::Utc;

use crate::events::{Event, Notifier};

/// The backend collaborator that stores sessions.
///
/// `submit` must return immediately. The outcome is reported later through
/// `notifier` as [`Event::SessionRecorded`] or [`Event::SessionSubmissionFailed`].
pub trait SessionSink: Send + Sync {
    fn submit(&self, record: SessionRecord, notifier: Notifier);
}

/// Keeps every submitted record in memory and reports the outcome at once.
#[derive(Debug, Default)]
pub struct MemorySink {
    submitted: Mutex<Vec<SessionRecord>>,
    failure: Mutex<Option<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every submission fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let sink = Self::default();
        sink.set_failure(Some(message.into()));
        sink
    }

    pub fn set_failure(&self, message: Option<String>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = message;
        }
    }

    /// Every record handed to this sink, accepted or not, oldest first.
    pub fn submitted(&self) -> Vec<SessionRecord> {
        self.submitted
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl SessionSink for MemorySink {
    fn submit(&self, record: SessionRecord, notifier: Notifier) {
        let session_id = record.session_id.clone();
        if let Ok(mut records) = self.submitted.lock() {
            records.push(record);
        }

        let failure = self.failure.lock().ok().and_then(|f| f.clone());
        let event = match failure {
            Some(message) => Event::SessionSubmissionFailed {
                session_id,
                message,
                at: Utc::now(),
            },
            None => Event::SessionRecorded {
                session_id,
                at: Utc::now(),
            },
        };
        notifier.notify(event);
    }
}
