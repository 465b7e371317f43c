use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Value of the `source` field on every submission.
pub const SESSION_SOURCE: &str = "pomodoro";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Reached its natural end, or was accepted as done.
    Completed,
    /// Skipped or reset before completion.
    Interrupted,
}

/// Body of `POST /focus`. Also kept as the pending session awaiting a rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    #[serde(rename = "type")]
    pub session_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whole minutes, rounded up.
    pub duration: u64,
    pub cycle_number: u8,
    pub status: SessionStatus,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
