use serde::{Deserialize, Serialize};

/// Minimum elapsed seconds before a run is worth recording.
pub const PRODUCTIVE_THRESHOLD_SECS: u64 = 60;

/// Stopwatch runs stop counting up at four hours.
pub const STOPWATCH_CAP_SECS: u64 = 4 * 60 * 60;

/// Focus runs per cycle; the last one is followed by a long break.
pub const CYCLE_LENGTH: u8 = 4;

/// Bounds for a manual countdown duration, in minutes.
pub const MANUAL_DURATION_MIN: u32 = 1;
pub const MANUAL_DURATION_MAX: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
    Stopwatch,
}

impl TimerMode {
    pub const ALL: [TimerMode; 4] = [
        TimerMode::Focus,
        TimerMode::ShortBreak,
        TimerMode::LongBreak,
        TimerMode::Stopwatch,
    ];

    /// Nominal run length in seconds. A stopwatch counts up from zero.
    pub fn nominal_secs(self) -> u64 {
        match self {
            TimerMode::Focus => 25 * 60,
            TimerMode::ShortBreak => 5 * 60,
            TimerMode::LongBreak => 15 * 60,
            TimerMode::Stopwatch => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
            TimerMode::Stopwatch => "Stopwatch",
        }
    }

    /// The `type` string the backend expects for sessions of this mode.
    pub fn session_type(self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
            TimerMode::Stopwatch => "stopwatch",
        }
    }

    pub fn is_countdown(self) -> bool {
        self != TimerMode::Stopwatch
    }

    pub fn is_break(self) -> bool {
        matches!(self, TimerMode::ShortBreak | TimerMode::LongBreak)
    }

    /// Upper bound for a recorded duration, in minutes. Countdown modes cap
    /// at their nominal length even when a manual duration ran longer.
    pub fn record_cap_min(self) -> u64 {
        match self {
            TimerMode::Stopwatch => STOPWATCH_CAP_SECS / 60,
            _ => self.nominal_secs().div_ceil(60),
        }
    }
}

impl std::str::FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "focus" => Ok(TimerMode::Focus),
            "short_break" | "short" => Ok(TimerMode::ShortBreak),
            "long_break" | "long" => Ok(TimerMode::LongBreak),
            "stopwatch" => Ok(TimerMode::Stopwatch),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
