use thiserror::Error;

/// BackgroundFailure (spec §7): logged, never surfaced to the user, never
/// affects the response already delivered.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("background queue is full, job dropped")]
    QueueFull,
    #[error("background queue is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BackgroundError>;
