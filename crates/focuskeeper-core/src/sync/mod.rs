//! Cross-instance synchronization.
//!
//! Every engine tags its store writes with an instance id. A
//! [`CrossTabSynchronizer`] watches the store's change feed and reloads the
//! engine when another instance wrote.

mod instance;
mod synchronizer;

pub use instance::{new_instance_id, INSTANCE_ID_PREFIX};
pub use synchronizer::CrossTabSynchronizer;
