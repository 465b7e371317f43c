use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use serde::Serialize;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use focuskeeper_core::storage::PersistentStore;
use focuskeeper_core::timer::TimerMode;
use focuskeeper_core::{
    BackgroundSignal, Config, CrossTabSynchronizer, Event, HttpSessionSink, IntervalSignal,
    ManualSignal, Notifier, SqliteStore, SystemClock, TimerEngine,
};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// How often `watch` checks the database for writes from other processes.
const RECONCILE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the current mode
    Start,
    /// Pause the running timer
    Pause,
    /// Abandon the current run and restore the mode's duration
    Reset,
    /// End the current run now and move to the next mode
    Skip,
    /// Switch mode (focus, short-break, long-break, stopwatch)
    Mode {
        mode: TimerMode,
    },
    /// Set the length of the next countdown run, in minutes
    Duration {
        minutes: u32,
    },
    /// Tag upcoming sessions with a subject and task
    Subject {
        subject: Option<String>,
        #[arg(long)]
        task_id: Option<String>,
    },
    /// Rate the last recorded session (1-5)
    Rate {
        rating: u8,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Clear the last recorded session without rating it
    Dismiss,
    /// Print current timer state as JSON
    Status,
    /// Follow the timer until interrupted
    Watch,
}

struct Session {
    engine: TimerEngine,
    events: UnboundedReceiver<Event>,
    /// Submissions handed to the backend without a reported outcome yet.
    in_flight: usize,
}

impl Session {
    fn open(config: &Config, signal: Box<dyn BackgroundSignal>) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn PersistentStore> = Arc::new(SqliteStore::open()?);
        let sink = Arc::new(HttpSessionSink::new(&config.backend)?);
        tracing::debug!(endpoint = %sink.endpoint(), "session backend");
        let (notifier, events) = Notifier::channel();
        let engine = TimerEngine::new(Arc::new(SystemClock), store, signal, sink, notifier);
        Ok(Self {
            engine,
            events,
            in_flight: 0,
        })
    }

    fn print_event(&mut self, event: &Event) -> CliResult {
        match event {
            Event::SessionSubmitted { .. } => self.in_flight += 1,
            Event::SessionRecorded { .. } | Event::SessionSubmissionFailed { .. } => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            _ => {}
        }
        print_json(event)
    }

    fn flush_events(&mut self) -> CliResult {
        while let Ok(event) = self.events.try_recv() {
            self.print_event(&event)?;
        }
        Ok(())
    }

    /// Wait for outstanding submissions to report, up to `timeout`.
    async fn settle(&mut self, timeout: Duration) -> CliResult {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            match tokio::time::timeout_at(deadline, self.events.recv()).await {
                Ok(Some(event)) => self.print_event(&event)?,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(pending = self.in_flight, "gave up waiting for the backend");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub fn run(action: TimerAction, config: &Config) -> CliResult {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        match action {
            TimerAction::Watch => watch(config).await,
            action => one_shot(action, config).await,
        }
    })
}

async fn one_shot(action: TimerAction, config: &Config) -> CliResult {
    let mut session = Session::open(config, Box::new(ManualSignal::new()))?;
    let engine = &mut session.engine;

    match action {
        TimerAction::Start => {
            engine.start();
        }
        TimerAction::Pause => {
            engine.pause();
        }
        TimerAction::Reset => {
            engine.reset();
        }
        TimerAction::Skip => {
            engine.skip();
        }
        TimerAction::Mode { mode } => {
            engine.switch_mode(mode)?;
        }
        TimerAction::Duration { minutes } => {
            engine.set_manual_duration(minutes)?;
        }
        TimerAction::Subject { subject, task_id } => {
            engine.set_subject(subject, task_id);
        }
        TimerAction::Rate { rating, notes } => {
            engine.rate_pending_session(rating, notes)?;
        }
        TimerAction::Dismiss => {
            engine.dismiss_pending_session();
        }
        TimerAction::Status | TimerAction::Watch => {}
    }

    session.flush_events()?;
    session
        .settle(Duration::from_secs(config.backend.timeout_secs))
        .await?;
    print_json(&session.engine.snapshot())
}

async fn watch(config: &Config) -> CliResult {
    let period = Duration::from_millis(config.timer.tick_interval_ms.max(1));
    let (signal, mut ticks) = IntervalSignal::new(period, Handle::current());
    let mut session = Session::open(config, Box::new(signal))?;
    let mut sync = CrossTabSynchronizer::attach(&session.engine);
    let mut reconcile = tokio::time::interval(RECONCILE_INTERVAL);

    session.flush_events()?;
    print_json(&session.engine.snapshot())?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(_) = ticks.recv() => {
                session.engine.tick();
                let state = session.engine.state();
                if state.is_active {
                    println!("{} {}", state.mode.label(), format_clock(state.time_left));
                }
            }
            _ = reconcile.tick() => {
                if sync.pump(&mut session.engine).is_none() {
                    sync.reconcile(&mut session.engine);
                }
            }
            Some(event) = session.events.recv() => session.print_event(&event)?,
        }
    }

    session
        .settle(Duration::from_secs(config.backend.timeout_secs))
        .await
}
