//! Background tick sources.
//!
//! A signal only wakes the engine up. Missed, late or bunched ticks are
//! harmless because every tick recomputes time from absolute anchors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub trait BackgroundSignal: Send {
    /// Begin delivering ticks. Starting a running signal does nothing.
    fn start(&mut self);

    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// One wake-up from a background signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Ticks from a `tokio::time::interval`, delivered on a channel that the
/// driver loop turns into `TimerEngine::tick` calls.
pub struct IntervalSignal {
    period: Duration,
    runtime: Handle,
    tx: mpsc::UnboundedSender<Tick>,
    task: Option<JoinHandle<()>>,
}

impl IntervalSignal {
    pub fn new(period: Duration, runtime: Handle) -> (Self, mpsc::UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signal = Self {
            period,
            runtime,
            tx,
            task: None,
        };
        (signal, rx)
    }
}

impl BackgroundSignal for IntervalSignal {
    fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let tx = self.tx.clone();
        let period = self.period;
        self.task = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Tick).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IntervalSignal {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A signal that never ticks by itself. Tests and one-shot callers drive
/// `tick()` directly; clones share the running flag so it can be observed.
#[derive(Debug, Clone, Default)]
pub struct ManualSignal {
    running: Arc<AtomicBool>,
}

impl ManualSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackgroundSignal for ManualSignal {
    fn start(&mut self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
