use std::sync::Arc;

use crate::clock::to_datetime;
use crate::events::{Event, Notifier};
use crate::timer::{TimerMode, PRODUCTIVE_THRESHOLD_SECS};

use super::{SessionRecord, SessionSink, SessionStatus, SESSION_SOURCE};

/// What the engine knows about a run at the moment it ends.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub session_id: String,
    pub mode: TimerMode,
    pub subject: Option<String>,
    pub task_id: Option<String>,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub cycle_number: u8,
}

/// Recorded minutes for `elapsed_secs`: rounded up, then capped per mode.
pub fn duration_minutes(mode: TimerMode, elapsed_secs: u64) -> u64 {
    elapsed_secs.div_ceil(60).min(mode.record_cap_min())
}

pub struct SessionRecorder {
    sink: Arc<dyn SessionSink>,
    notifier: Notifier,
}

impl SessionRecorder {
    pub fn new(sink: Arc<dyn SessionSink>, notifier: Notifier) -> Self {
        Self { sink, notifier }
    }

    /// Build and submit the record for a finished run.
    ///
    /// Returns `None` when nothing was submitted: breaks are never logged and
    /// runs shorter than the productive threshold are dropped as noise.
    pub fn record(
        &self,
        run: RunSummary,
        elapsed_secs: u64,
        status: SessionStatus,
    ) -> Option<SessionRecord> {
        if run.mode.is_break() {
            return None;
        }
        if elapsed_secs < PRODUCTIVE_THRESHOLD_SECS {
            tracing::debug!(
                session_id = %run.session_id,
                elapsed_secs,
                "run below productive threshold, not recording"
            );
            return None;
        }

        let record = SessionRecord {
            session_id: run.session_id,
            session_type: run.mode.session_type().to_string(),
            subject: run.subject,
            task_id: run.task_id,
            start_time: to_datetime(run.started_at_ms),
            end_time: to_datetime(run.ended_at_ms),
            duration: duration_minutes(run.mode, elapsed_secs),
            cycle_number: run.cycle_number,
            status,
            source: SESSION_SOURCE.to_string(),
            focus_rating: None,
            notes: None,
        };
        self.dispatch(record.clone());
        Some(record)
    }

    /// Re-submit a record that gained a rating. The backend keys on `sessionId`.
    pub fn amend(&self, record: SessionRecord) {
        self.dispatch(record);
    }

    fn dispatch(&self, record: SessionRecord) {
        tracing::info!(
            session_id = %record.session_id,
            session_type = %record.session_type,
            duration_min = record.duration,
            status = ?record.status,
            "submitting session"
        );
        self.notifier.notify(Event::SessionSubmitted {
            session_id: record.session_id.clone(),
            status: record.status,
            duration_min: record.duration,
            at: record.end_time,
        });
        self.sink.submit(record, self.notifier.clone());
    }
}
