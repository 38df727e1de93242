/// Errors returned when submitting background work.
#[derive(Debug, thiserror::Error)]
pub enum BackgroundError {
    /// The manager finished draining and no longer accepts tasks.
    #[error("background task '{0}' rejected: the task manager is stopped")]
    Stopped(String),
}
