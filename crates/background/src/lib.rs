//! Fire-and-forget work that outlives the request which started it.
//!
//! Tasks handed to [`BackgroundTaskManager::spawn`] run on the tokio runtime, detached from
//! the HTTP response. Errors and panics are caught and logged per task. On shutdown the
//! manager waits for outstanding tasks up to a deadline, and reports what it left behind.

#![deny(missing_docs)]

mod error;
mod manager;

pub use error::BackgroundError;
pub use manager::{BackgroundTaskManager, DrainOutcome, ManagerState};
