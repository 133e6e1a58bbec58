//! Dispatch Error Types
//!
//! Error handling for worker thread lifecycle management. Dispatch itself is
//! infallible by design: registration always succeeds, publishing to zero
//! subscribers is a no-op, and posting to a stopped worker is a programming
//! error that panics rather than returning an error value.

use thiserror::Error;

/// Result alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Worker thread lifecycle errors
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The OS refused to spawn the worker thread
    #[error("failed to spawn worker thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// `start()` called on a worker that is already running
    #[error("worker thread '{0}' already started")]
    AlreadyStarted(String),

    /// `join()` called on a worker that was never started
    #[error("worker thread '{0}' was never started")]
    NotStarted(String),

    /// The worker thread panicked before it could be joined
    #[error("worker thread '{0}' panicked")]
    Join(String),
}
