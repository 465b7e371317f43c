//! # Focuskeeper Core Library
//!
//! Core logic for the Focuskeeper focus timer: a Pomodoro-style countdown
//! cycle plus an open-ended stopwatch, persisted so a run survives restarts
//! and stays consistent across every open window.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. The caller invokes
//!   `tick()` when its background signal fires; time is always recomputed
//!   from absolute anchors
//! - **Storage**: Key/value timer state (SQLite or in-memory) and TOML
//!   configuration
//! - **Sessions**: Productive runs are submitted to a REST backend without
//!   blocking the engine
//! - **Sync**: Last-write-wins convergence between instances sharing a store
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`PersistentStore`]: Durable key/value storage with a change feed
//! - [`SessionSink`]: Where finished sessions are sent
//! - [`CrossTabSynchronizer`]: Multi-instance convergence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod session;
pub mod signal;
pub mod storage;
pub mod sync;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BackendError, ConfigError, CoreError, StoreError, TimerError};
pub use events::{Event, Notifier};
pub use session::{HttpSessionSink, MemorySink, SessionRecord, SessionSink, SessionStatus};
pub use signal::{BackgroundSignal, IntervalSignal, ManualSignal, Tick};
pub use storage::{Config, MemoryStore, PersistentStore, SqliteStore};
pub use sync::CrossTabSynchronizer;
pub use timer::{TimerEngine, TimerMode, TimerState};
