//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads -- a [`BackgroundSignal`] wakes the caller, who invokes
//! `tick()`. Time is never accumulated from ticks: every call recomputes it
//! from the absolute anchor stored in [`TimerState`], so missed ticks, a
//! suspended process or a closed window cost nothing.
//!
//! ## State Transitions
//!
//! ```text
//! FOCUS --(complete | skip)--> SHORT_BREAK   (cycle < 4, cycle += 1)
//! FOCUS --(complete | skip)--> LONG_BREAK    (cycle = 4, cycle  = 1)
//! SHORT_BREAK | LONG_BREAK --(complete | skip)--> FOCUS
//! STOPWATCH: start / pause / reset / skip (finish) only
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(clock, store, signal, sink, notifier);
//! engine.start();
//! // On every signal tick:
//! engine.tick(); // Returns Some(Event::TimerCompleted) when a countdown ends
//! ```

use std::sync::Arc;

use uuid::Uuid;

use super::mode::{TimerMode, CYCLE_LENGTH, MANUAL_DURATION_MAX, MANUAL_DURATION_MIN};
use super::state::TimerState;
use crate::clock::{to_datetime, Clock};
use crate::error::TimerError;
use crate::events::{Event, Notifier};
use crate::session::{RunSummary, SessionRecord, SessionRecorder, SessionSink, SessionStatus};
use crate::signal::BackgroundSignal;
use crate::storage::PersistentStore;
use crate::sync::new_instance_id;

/// Core timer engine. One instance per open window; instances sharing a
/// store converge through [`crate::sync::CrossTabSynchronizer`].
pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    store: Arc<dyn PersistentStore>,
    signal: Box<dyn BackgroundSignal>,
    recorder: SessionRecorder,
    notifier: Notifier,
    origin: String,
    state: TimerState,
}

impl TimerEngine {
    /// Rehydrate from `store`, catching up on any time that passed while no
    /// engine was running.
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn PersistentStore>,
        signal: Box<dyn BackgroundSignal>,
        sink: Arc<dyn SessionSink>,
        notifier: Notifier,
    ) -> Self {
        let state = TimerState::load(&*store);
        let mut engine = Self {
            clock,
            store,
            signal,
            recorder: SessionRecorder::new(sink, notifier.clone()),
            notifier,
            origin: new_instance_id(),
            state,
        };
        engine.rehydrate();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn mode(&self) -> TimerMode {
        self.state.mode
    }

    pub fn time_left(&self) -> u64 {
        self.state.time_left
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn cycle_number(&self) -> u8 {
        self.state.cycle_number
    }

    pub fn sessions_completed(&self) -> u64 {
        self.state.sessions_completed
    }

    pub fn pending_session(&self) -> Option<&SessionRecord> {
        self.state.pending_session.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    /// Identifier stamped on every store write made by this instance.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn store(&self) -> &Arc<dyn PersistentStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.state.mode,
            label: self.state.mode.label().to_string(),
            time_left: self.state.time_left,
            is_active: self.state.is_active,
            cycle_number: self.state.cycle_number,
            sessions_completed: self.state.sessions_completed,
            subject: self.state.subject.clone(),
            task_id: self.state.task_id.clone(),
            pending_session: self.state.pending_session.clone(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_active {
            return None;
        }
        let now = self.clock.now_ms();
        let mode = self.state.mode;

        if mode.is_countdown() && self.state.time_left == 0 {
            self.state.time_left = mode.nominal_secs();
            self.state.planned_duration = mode.nominal_secs();
        }

        if self.state.session_id.is_none() {
            self.state.session_id = Some(Uuid::new_v4().to_string());
            self.state.session_started_at = Some(now);
            if mode.is_countdown() {
                self.state.planned_duration = self.state.time_left;
            }
            if let Some(pending) = self.state.pending_session.take() {
                self.emit(Event::PendingSessionResolved {
                    session_id: pending.session_id,
                    at: to_datetime(now),
                });
            }
        }

        let left_ms = secs_to_ms(self.state.time_left);
        self.state.is_active = true;
        if mode.is_countdown() {
            self.state.target_time = Some(now.saturating_add(left_ms));
            self.state.start_time = None;
        } else {
            self.state.start_time = Some(now.saturating_sub(left_ms));
            self.state.target_time = None;
        }

        self.signal.start();
        self.persist(now);
        tracing::debug!(?mode, time_left = self.state.time_left, "timer started");

        let session_id = self.state.session_id.clone().unwrap_or_default();
        Some(self.emit(Event::TimerStarted {
            mode,
            session_id,
            time_left: self.state.time_left,
            at: to_datetime(now),
        }))
    }

    /// Stop counting and keep the run. Never submits a session.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        let now = self.clock.now_ms();
        if let Some(completed) = self.catch_up(now) {
            return Some(completed);
        }

        self.state.is_active = false;
        self.state.target_time = None;
        self.state.start_time = None;
        self.signal.stop();
        self.persist(now);

        Some(self.emit(Event::TimerPaused {
            mode: self.state.mode,
            time_left: self.state.time_left,
            at: to_datetime(now),
        }))
    }

    /// Abandon the run in flight (recording it as interrupted when it was
    /// long enough) and restore the mode's nominal duration.
    ///
    /// A paused run still counts as in flight and is recorded too.
    pub fn reset(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        if self.catch_up(now).is_none()
            && self.state.run_in_flight()
            && !self.state.mode.is_break()
        {
            let elapsed = self.state.elapsed_secs();
            self.record(elapsed, SessionStatus::Interrupted, now);
        }

        let mode = self.state.mode;
        self.enter_mode(mode);
        self.signal.stop();
        self.persist(now);

        Some(self.emit(Event::TimerReset {
            mode,
            at: to_datetime(now),
        }))
    }

    /// Force the current run to its terminal transition.
    pub fn skip(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        if let Some(completed) = self.catch_up(now) {
            return Some(completed);
        }

        let from = self.state.mode;
        match from {
            TimerMode::Focus => {
                let elapsed = self.state.elapsed_secs();
                let status = if elapsed >= self.state.planned_duration {
                    SessionStatus::Completed
                } else {
                    SessionStatus::Interrupted
                };
                self.finish_focus(status, elapsed, now);
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => self.enter_mode(TimerMode::Focus),
            TimerMode::Stopwatch => {
                if self.state.run_in_flight() {
                    let elapsed = self.state.elapsed_secs();
                    self.record(elapsed, SessionStatus::Completed, now);
                }
                self.enter_mode(TimerMode::Stopwatch);
            }
        }

        self.signal.stop();
        self.persist(now);
        tracing::debug!(?from, to = ?self.state.mode, "timer skipped");

        Some(self.emit(Event::TimerSkipped {
            from,
            to: self.state.mode,
            at: to_datetime(now),
        }))
    }

    /// Select a mode. Discards a paused run without recording it.
    pub fn switch_mode(&mut self, mode: TimerMode) -> Result<Event, TimerError> {
        if self.state.is_active {
            return Err(TimerError::RunActive);
        }
        let now = self.clock.now_ms();
        self.enter_mode(mode);
        self.persist(now);

        Ok(self.emit(Event::ModeSwitched {
            mode,
            time_left: self.state.time_left,
            at: to_datetime(now),
        }))
    }

    /// Override the length of the next countdown run.
    pub fn set_manual_duration(&mut self, minutes: u32) -> Result<Event, TimerError> {
        if self.state.is_active {
            return Err(TimerError::RunActive);
        }
        if !self.state.mode.is_countdown() {
            return Err(TimerError::UnsupportedMode(self.state.mode));
        }
        if !(MANUAL_DURATION_MIN..=MANUAL_DURATION_MAX).contains(&minutes) {
            return Err(TimerError::InvalidDuration {
                min: MANUAL_DURATION_MIN,
                max: MANUAL_DURATION_MAX,
                got: minutes,
            });
        }

        let now = self.clock.now_ms();
        let secs = u64::from(minutes) * 60;
        self.state.session_id = None;
        self.state.session_started_at = None;
        self.state.time_left = secs;
        self.state.planned_duration = secs;
        self.persist(now);

        Ok(self.emit(Event::DurationSet {
            minutes,
            at: to_datetime(now),
        }))
    }

    pub fn set_subject(&mut self, subject: Option<String>, task_id: Option<String>) -> Event {
        let now = self.clock.now_ms();
        self.state.subject = subject.clone();
        self.state.task_id = task_id.clone();
        self.persist(now);

        self.emit(Event::SubjectChanged {
            subject,
            task_id,
            at: to_datetime(now),
        })
    }

    /// Attach the user's rating to the pending session and re-submit it.
    pub fn rate_pending_session(
        &mut self,
        rating: u8,
        notes: Option<String>,
    ) -> Result<Event, TimerError> {
        if !(1..=5).contains(&rating) {
            return Err(TimerError::InvalidRating(rating));
        }
        let mut record = self
            .state
            .pending_session
            .take()
            .ok_or(TimerError::NoPendingSession)?;

        let now = self.clock.now_ms();
        record.focus_rating = Some(rating);
        record.notes = notes.filter(|n| !n.trim().is_empty());
        let session_id = record.session_id.clone();
        self.recorder.amend(record);
        self.persist(now);

        Ok(self.emit(Event::SessionRated {
            session_id,
            rating,
            at: to_datetime(now),
        }))
    }

    pub fn dismiss_pending_session(&mut self) -> Option<Event> {
        let pending = self.state.pending_session.take()?;
        let now = self.clock.now_ms();
        self.persist(now);

        Some(self.emit(Event::PendingSessionResolved {
            session_id: pending.session_id,
            at: to_datetime(now),
        }))
    }

    /// Call on every background tick. Returns `Some(Event::TimerCompleted)`
    /// when a countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        let now = self.clock.now_ms();
        self.catch_up(now)
    }

    /// Replace in-memory state with whatever the store holds now.
    pub fn resync_from_store(&mut self) -> Event {
        let now = self.clock.now_ms();
        self.state = TimerState::load(&*self.store);
        self.state.project(now);
        self.sync_signal();
        tracing::debug!(
            mode = ?self.state.mode,
            is_active = self.state.is_active,
            "timer state resynced from store"
        );

        self.emit(Event::StateSynced {
            mode: self.state.mode,
            is_active: self.state.is_active,
            time_left: self.state.time_left,
            at: to_datetime(now),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rehydrate(&mut self) {
        let now = self.clock.now_ms();
        if self.catch_up(now).is_some() {
            tracing::info!(mode = ?self.state.mode, "run finished while no engine was running");
        }
        self.sync_signal();
    }

    /// Re-project an active run; a countdown found at zero completes now.
    fn catch_up(&mut self, now: i64) -> Option<Event> {
        if !self.state.is_active {
            return None;
        }
        self.state.project(now);
        if self.state.mode.is_countdown() && self.state.time_left == 0 {
            Some(self.complete_naturally(now))
        } else {
            None
        }
    }

    fn complete_naturally(&mut self, now: i64) -> Event {
        let finished = self.state.mode;
        let ended_at = self.state.target_time.unwrap_or(now).min(now);
        match finished {
            TimerMode::Focus => {
                let planned = self.state.planned_duration;
                self.finish_focus(SessionStatus::Completed, planned, ended_at);
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => self.enter_mode(TimerMode::Focus),
            TimerMode::Stopwatch => {}
        }

        self.signal.stop();
        self.persist(now);
        tracing::debug!(?finished, next = ?self.state.mode, "countdown completed");

        self.emit(Event::TimerCompleted {
            mode: finished,
            next_mode: self.state.mode,
            cycle_number: self.state.cycle_number,
            at: to_datetime(ended_at),
        })
    }

    /// Terminal transition out of FOCUS: record, count, advance the cycle.
    fn finish_focus(&mut self, status: SessionStatus, elapsed: u64, ended_at: i64) {
        self.record(elapsed, status, ended_at);
        if status == SessionStatus::Completed {
            self.state.sessions_completed += 1;
        }

        let next = if self.state.cycle_number < CYCLE_LENGTH {
            self.state.cycle_number += 1;
            TimerMode::ShortBreak
        } else {
            self.state.cycle_number = 1;
            TimerMode::LongBreak
        };
        self.enter_mode(next);
    }

    fn record(&mut self, elapsed: u64, status: SessionStatus, ended_at: i64) {
        let Some(session_id) = self.state.session_id.clone() else {
            return;
        };
        let run = RunSummary {
            session_id,
            mode: self.state.mode,
            subject: self.state.subject.clone(),
            task_id: self.state.task_id.clone(),
            started_at_ms: self
                .state
                .session_started_at
                .unwrap_or_else(|| ended_at.saturating_sub(secs_to_ms(elapsed))),
            ended_at_ms: ended_at,
            cycle_number: self.state.cycle_number,
        };
        if let Some(record) = self.recorder.record(run, elapsed, status) {
            self.state.pending_session = Some(record);
        }
    }

    /// Idle in `mode` at its nominal duration, with no run in flight.
    fn enter_mode(&mut self, mode: TimerMode) {
        self.state.mode = mode;
        self.state.is_active = false;
        self.state.target_time = None;
        self.state.start_time = None;
        self.state.time_left = mode.nominal_secs();
        self.state.planned_duration = mode.nominal_secs();
        self.state.session_id = None;
        self.state.session_started_at = None;
    }

    fn sync_signal(&mut self) {
        if self.state.is_active {
            self.signal.start();
        } else {
            self.signal.stop();
        }
    }

    fn persist(&mut self, now: i64) {
        self.state.last_update = now;
        if let Err(e) = self.state.save(&*self.store, &self.origin) {
            tracing::warn!(error = %e, "failed to persist timer state");
        }
    }

    fn emit(&self, event: Event) -> Event {
        self.notifier.notify(event.clone());
        event
    }
}

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session::MemorySink;
    use crate::signal::ManualSignal;
    use crate::storage::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    struct Harness {
        engine: TimerEngine,
        clock: ManualClock,
        sink: Arc<MemorySink>,
        signal: ManualSignal,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new(T0);
        let sink = Arc::new(MemorySink::new());
        let signal = ManualSignal::new();
        let (notifier, _rx) = Notifier::channel();
        let engine = TimerEngine::new(
            Arc::new(clock.clone()),
            Arc::new(MemoryStore::new()),
            Box::new(signal.clone()),
            sink.clone(),
            notifier,
        );
        Harness {
            engine,
            clock,
            sink,
            signal,
        }
    }

    #[test]
    fn start_pause_resume() {
        let mut h = harness();
        assert!(!h.engine.is_active());

        assert!(h.engine.start().is_some());
        assert!(h.engine.is_active());
        assert!(h.signal.is_running());
        assert!(h.engine.start().is_none());

        h.clock.advance_secs(100);
        assert!(h.engine.pause().is_some());
        assert!(!h.engine.is_active());
        assert!(!h.signal.is_running());
        assert_eq!(h.engine.time_left(), 1400);
        assert!(h.engine.state().target_time.is_none());

        h.clock.advance_secs(500);
        assert_eq!(h.engine.time_left(), 1400);
        h.engine.start();
        h.clock.advance_secs(100);
        h.engine.tick();
        assert_eq!(h.engine.time_left(), 1300);
        assert!(h.sink.submitted().is_empty());
    }

    #[test]
    fn session_id_is_stable_across_pause() {
        let mut h = harness();
        h.engine.start();
        let first = h.engine.session_id().map(str::to_string);
        h.engine.pause();
        h.engine.start();
        assert_eq!(h.engine.session_id().map(str::to_string), first);

        h.engine.reset();
        assert!(h.engine.session_id().is_none());
        h.engine.start();
        assert_ne!(h.engine.session_id().map(str::to_string), first);
    }

    #[test]
    fn tick_counts_from_anchor_not_calls() {
        let mut h = harness();
        h.engine.start();
        // One tick after a long gap equals many small ticks.
        h.clock.advance_secs(600);
        h.engine.tick();
        assert_eq!(h.engine.time_left(), 900);
    }

    #[test]
    fn skip_break_returns_to_focus_without_session() {
        let mut h = harness();
        h.engine.switch_mode(TimerMode::ShortBreak).unwrap();
        h.engine.start();
        h.clock.advance_secs(120);
        h.engine.skip();
        assert_eq!(h.engine.mode(), TimerMode::Focus);
        assert_eq!(h.engine.time_left(), 1500);
        assert!(h.sink.submitted().is_empty());
    }

    #[test]
    fn switch_mode_rejected_while_active() {
        let mut h = harness();
        h.engine.start();
        assert_eq!(
            h.engine.switch_mode(TimerMode::Stopwatch),
            Err(TimerError::RunActive)
        );
        assert_eq!(h.engine.mode(), TimerMode::Focus);
    }

    #[test]
    fn manual_duration_bounds() {
        let mut h = harness();
        assert!(matches!(
            h.engine.set_manual_duration(0),
            Err(TimerError::InvalidDuration { got: 0, .. })
        ));
        assert!(h.engine.set_manual_duration(301).is_err());
        assert_eq!(h.engine.time_left(), 1500);

        h.engine.set_manual_duration(50).unwrap();
        assert_eq!(h.engine.time_left(), 3000);

        h.engine.switch_mode(TimerMode::Stopwatch).unwrap();
        assert_eq!(
            h.engine.set_manual_duration(10),
            Err(TimerError::UnsupportedMode(TimerMode::Stopwatch))
        );
    }

    #[test]
    fn pause_after_expiry_completes_instead() {
        let mut h = harness();
        h.engine.start();
        h.clock.advance_secs(1600);
        let event = h.engine.pause().unwrap();
        assert!(matches!(event, Event::TimerCompleted { .. }));
        assert_eq!(h.engine.mode(), TimerMode::ShortBreak);
        assert_eq!(h.sink.submitted().len(), 1);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let h = harness();
        match h.engine.snapshot() {
            Event::StateSnapshot {
                mode,
                time_left,
                is_active,
                cycle_number,
                ..
            } => {
                assert_eq!(mode, TimerMode::Focus);
                assert_eq!(time_left, 1500);
                assert!(!is_active);
                assert_eq!(cycle_number, 1);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
