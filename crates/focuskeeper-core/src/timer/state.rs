//! The persisted timer aggregate and its key-by-key storage layout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::mode::{TimerMode, CYCLE_LENGTH, MANUAL_DURATION_MAX, STOPWATCH_CAP_SECS};
use super::projection::{countdown_left, stopwatch_elapsed};
use crate::error::StoreError;
use crate::session::SessionRecord;
use crate::storage::PersistentStore;

/// Store keys. Each field of [`TimerState`] lives under its own key.
pub mod keys {
    pub const MODE: &str = "mode";
    pub const TIME_LEFT: &str = "timeLeft";
    pub const TARGET_TIME: &str = "targetTime";
    pub const START_TIME: &str = "startTime";
    pub const IS_ACTIVE: &str = "isActive";
    pub const CYCLE_NUMBER: &str = "cycleNumber";
    pub const SESSIONS_COMPLETED: &str = "sessionsCompleted";
    pub const SUBJECT: &str = "subject";
    pub const TASK_ID: &str = "taskId";
    pub const LAST_UPDATE: &str = "lastUpdate";
    pub const PENDING_SESSION: &str = "pendingSession";
    pub const SESSION_ID: &str = "sessionId";
    pub const SESSION_STARTED_AT: &str = "sessionStartedAt";
    pub const PLANNED_DURATION: &str = "plannedDuration";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub is_active: bool,
    /// Epoch ms at which an active countdown reaches zero.
    pub target_time: Option<i64>,
    /// Epoch ms anchor of an active stopwatch, shifted back by time already counted.
    pub start_time: Option<i64>,
    /// Seconds left (countdown) or elapsed (stopwatch). A cached projection
    /// while active, authoritative while inactive.
    pub time_left: u64,
    pub cycle_number: u8,
    pub sessions_completed: u64,
    pub subject: Option<String>,
    pub task_id: Option<String>,
    pub last_update: i64,
    pub pending_session: Option<SessionRecord>,
    /// Id of the run in flight (started and not yet ended).
    pub session_id: Option<String>,
    /// Epoch ms at which the run in flight first started.
    pub session_started_at: Option<i64>,
    /// Seconds the current countdown run was planned for.
    pub planned_duration: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        let mode = TimerMode::Focus;
        Self {
            mode,
            is_active: false,
            target_time: None,
            start_time: None,
            time_left: mode.nominal_secs(),
            cycle_number: 1,
            sessions_completed: 0,
            subject: None,
            task_id: None,
            last_update: 0,
            pending_session: None,
            session_id: None,
            session_started_at: None,
            planned_duration: mode.nominal_secs(),
        }
    }
}

impl TimerState {
    /// Read every key from `store`, falling back field by field to defaults.
    /// Never fails: unreadable or malformed values are logged and replaced.
    pub fn load(store: &dyn PersistentStore) -> Self {
        let mode: TimerMode = read(store, keys::MODE).unwrap_or(TimerMode::Focus);
        let nominal = mode.nominal_secs();

        let max_planned = if mode.is_countdown() {
            u64::from(MANUAL_DURATION_MAX) * 60
        } else {
            0
        };
        let planned_duration = bounded(
            read(store, keys::PLANNED_DURATION),
            keys::PLANNED_DURATION,
            max_planned,
        )
        .unwrap_or(nominal);
        let max_time_left = if mode.is_countdown() {
            planned_duration
        } else {
            STOPWATCH_CAP_SECS
        };
        let time_left = bounded(read(store, keys::TIME_LEFT), keys::TIME_LEFT, max_time_left)
            .unwrap_or(planned_duration);

        let mut state = Self {
            mode,
            is_active: read(store, keys::IS_ACTIVE).unwrap_or(false),
            target_time: read(store, keys::TARGET_TIME),
            start_time: read(store, keys::START_TIME),
            time_left,
            cycle_number: read(store, keys::CYCLE_NUMBER)
                .filter(|c| (1..=CYCLE_LENGTH).contains(c))
                .unwrap_or(1),
            sessions_completed: read(store, keys::SESSIONS_COMPLETED).unwrap_or(0),
            subject: read(store, keys::SUBJECT),
            task_id: read(store, keys::TASK_ID),
            last_update: read(store, keys::LAST_UPDATE).unwrap_or(0),
            pending_session: read(store, keys::PENDING_SESSION),
            session_id: read(store, keys::SESSION_ID),
            session_started_at: read(store, keys::SESSION_STARTED_AT),
            planned_duration,
        };

        // Only the anchor belonging to the current mode is meaningful.
        if mode.is_countdown() {
            state.start_time = None;
        } else {
            state.target_time = None;
        }
        if !state.is_active {
            state.target_time = None;
            state.start_time = None;
        } else if state.target_time.is_none() && state.start_time.is_none() {
            tracing::warn!(?mode, "active timer persisted without an anchor, treating as paused");
            state.is_active = false;
        }
        state
    }

    /// Write every key. `lastUpdate` goes last so a reader that sees the new
    /// value also sees the rest of the write.
    pub fn save(&self, store: &dyn PersistentStore, origin: &str) -> Result<(), StoreError> {
        write(store, origin, keys::MODE, &self.mode)?;
        write(store, origin, keys::IS_ACTIVE, &self.is_active)?;
        write(store, origin, keys::TARGET_TIME, &self.target_time)?;
        write(store, origin, keys::START_TIME, &self.start_time)?;
        write(store, origin, keys::TIME_LEFT, &self.time_left)?;
        write(store, origin, keys::CYCLE_NUMBER, &self.cycle_number)?;
        write(store, origin, keys::SESSIONS_COMPLETED, &self.sessions_completed)?;
        write(store, origin, keys::SUBJECT, &self.subject)?;
        write(store, origin, keys::TASK_ID, &self.task_id)?;
        write(store, origin, keys::PENDING_SESSION, &self.pending_session)?;
        write(store, origin, keys::SESSION_ID, &self.session_id)?;
        write(store, origin, keys::SESSION_STARTED_AT, &self.session_started_at)?;
        write(store, origin, keys::PLANNED_DURATION, &self.planned_duration)?;
        write(store, origin, keys::LAST_UPDATE, &self.last_update)
    }

    /// Refresh `time_left` from the active anchor. No-op while inactive.
    pub fn project(&mut self, now_ms: i64) {
        if !self.is_active {
            return;
        }
        match (self.mode.is_countdown(), self.target_time, self.start_time) {
            (true, Some(target), _) => {
                self.time_left = countdown_left(target, now_ms).min(self.planned_duration)
            }
            (false, _, Some(start)) => self.time_left = stopwatch_elapsed(start, now_ms),
            _ => {}
        }
    }

    /// Seconds of the current run already spent, as of the last projection.
    pub fn elapsed_secs(&self) -> u64 {
        if self.mode.is_countdown() {
            self.planned_duration.saturating_sub(self.time_left)
        } else {
            self.time_left
        }
    }

    pub fn run_in_flight(&self) -> bool {
        self.session_id.is_some()
    }
}

fn read<T: DeserializeOwned>(store: &dyn PersistentStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read persisted timer field");
            return None;
        }
    };
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring malformed persisted timer field");
            None
        }
    }
}

/// Drop a persisted count of seconds above `max`.
fn bounded(value: Option<u64>, key: &str, max: u64) -> Option<u64> {
    match value {
        Some(secs) if secs > max => {
            tracing::warn!(key, secs, max, "ignoring out-of-range persisted timer field");
            None
        }
        other => other,
    }
}

fn write<T: Serialize>(
    store: &dyn PersistentStore,
    origin: &str,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    // Plain data types always serialize.
    let raw = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    store.set(key, &raw, origin)
}
