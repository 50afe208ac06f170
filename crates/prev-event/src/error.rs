//! Event channel errors.

use thiserror::Error;

/// Errors raised by the event channel.
#[derive(Error, Debug)]
pub enum EventError {
    /// The subscription was never registered or has already been removed.
    #[error("Unknown subscription for event type {0}")]
    UnknownSubscription(&'static str),

    /// The async delivery worker could not be started.
    #[error("Failed to spawn async event worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, EventError>;
