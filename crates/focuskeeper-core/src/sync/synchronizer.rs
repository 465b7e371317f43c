use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

use crate::events::Event;
use crate::storage::StoreChange;
use crate::timer::{keys, TimerEngine};

/// Keeps one engine in step with writes made by other instances sharing
/// its store. Conflicts resolve as last write wins: a foreign write causes
/// a wholesale reload, never a merge.
pub struct CrossTabSynchronizer {
    changes: Receiver<StoreChange>,
    origin: String,
}

impl CrossTabSynchronizer {
    /// Subscribe to `engine`'s store. Writes made before this call are not seen.
    pub fn attach(engine: &TimerEngine) -> Self {
        Self {
            changes: engine.store().subscribe(),
            origin: engine.origin().to_string(),
        }
    }

    /// Drain pending change notifications. Resyncs at most once, and only
    /// when some write came from another instance.
    pub fn pump(&mut self, engine: &mut TimerEngine) -> Option<Event> {
        let mut foreign = false;
        loop {
            match self.changes.try_recv() {
                Ok(change) => {
                    if change.origin != self.origin {
                        foreign = true;
                    }
                }
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "change feed lagged, forcing resync");
                    foreign = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        foreign.then(|| engine.resync_from_store())
    }

    /// Resync when the stored `lastUpdate` differs from the engine's.
    ///
    /// Covers writers the change feed cannot reach, such as another process
    /// sharing the same database file.
    pub fn reconcile(&mut self, engine: &mut TimerEngine) -> Option<Event> {
        let stored = match engine.store().get(keys::LAST_UPDATE) {
            Ok(raw) => raw.and_then(|raw| serde_json::from_str::<i64>(&raw).ok()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read lastUpdate");
                return None;
            }
        };
        match stored {
            Some(stored) if stored != engine.state().last_update => {
                Some(engine.resync_from_store())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::events::Notifier;
    use crate::session::MemorySink;
    use crate::signal::ManualSignal;
    use crate::storage::{MemoryStore, PersistentStore};
    use crate::timer::TimerMode;

    fn engine(store: Arc<MemoryStore>, clock: &ManualClock) -> TimerEngine {
        let (notifier, _rx) = Notifier::channel();
        TimerEngine::new(
            Arc::new(clock.clone()),
            store,
            Box::new(ManualSignal::new()),
            Arc::new(MemorySink::new()),
            notifier,
        )
    }

    #[test]
    fn own_writes_do_not_resync() {
        let clock = ManualClock::new(1_700_000_000_000);
        let mut a = engine(Arc::new(MemoryStore::new()), &clock);
        let mut sync = CrossTabSynchronizer::attach(&a);

        a.start();
        assert!(sync.pump(&mut a).is_none());
        assert!(sync.reconcile(&mut a).is_none());
    }

    #[test]
    fn foreign_write_resyncs_once() {
        let clock = ManualClock::new(1_700_000_000_000);
        let store = Arc::new(MemoryStore::new());
        let mut a = engine(store.clone(), &clock);
        let mut b = engine(store, &clock);
        let mut sync = CrossTabSynchronizer::attach(&a);

        b.switch_mode(TimerMode::LongBreak).unwrap();
        let event = sync.pump(&mut a);
        assert!(matches!(
            event,
            Some(Event::StateSynced {
                mode: TimerMode::LongBreak,
                ..
            })
        ));
        assert_eq!(a.time_left(), 900);
        assert!(sync.pump(&mut a).is_none());
    }

    #[test]
    fn reconcile_picks_up_unannounced_writes() {
        let clock = ManualClock::new(1_700_000_000_000);
        let store = Arc::new(MemoryStore::new());
        let mut a = engine(store.clone(), &clock);
        let mut sync = CrossTabSynchronizer::attach(&a);

        store.set(keys::MODE, "\"STOPWATCH\"", "other-process").unwrap();
        store.set(keys::TIME_LEFT, "0", "other-process").unwrap();
        store.set(keys::LAST_UPDATE, "1700000005000", "other-process").unwrap();
        // Drop the notifications to simulate a writer outside this process.
        while sync.changes.try_recv().is_ok() {}

        assert!(sync.reconcile(&mut a).is_some());
        assert_eq!(a.mode(), TimerMode::Stopwatch);
        assert!(sync.reconcile(&mut a).is_none());
    }
}
