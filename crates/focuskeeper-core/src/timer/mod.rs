mod engine;
mod mode;
mod projection;
mod state;

pub use engine::TimerEngine;
pub use mode::{
    TimerMode, CYCLE_LENGTH, MANUAL_DURATION_MAX, MANUAL_DURATION_MIN, PRODUCTIVE_THRESHOLD_SECS,
    STOPWATCH_CAP_SECS,
};
pub use projection::{countdown_left, stopwatch_elapsed};
pub use state::{keys, TimerState};
