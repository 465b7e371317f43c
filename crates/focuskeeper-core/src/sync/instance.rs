// Instance IDs tag every store write so a window can tell its own writes
// from another window's.
// Format: "tab-<uuid>"

use uuid::Uuid;

pub const INSTANCE_ID_PREFIX: &str = "tab-";

/// Fresh identifier for one engine instance. Not persisted: a reopened
/// window is a new instance.
pub fn new_instance_id() -> String {
    format!("{}{}", INSTANCE_ID_PREFIX, Uuid::new_v4())
}
