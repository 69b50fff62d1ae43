use std::io;
use thiserror::Error;

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a chain run.
#[derive(Debug, Error)]
pub enum Error {
    /// The chain was asked to run with no workers.
    #[error("a chain needs at least one worker, got {workers}")]
    InvalidArgument { workers: usize },

    /// A worker thread could not be spawned. No action ran.
    #[error("failed to spawn worker for position {position}")]
    ResourceExhaustion {
        position: usize,
        #[source]
        source: io::Error,
    },

    /// A worker gave up waiting for its predecessor.
    #[error("worker at position {position} timed out waiting for its turn")]
    Timeout { position: usize },

    /// The action panicked.
    #[error("worker at position {position} panicked")]
    WorkerPanicked { position: usize },

    /// The predecessor of this position stopped without handing off.
    #[error("worker at position {position} was abandoned by its predecessor")]
    Abandoned { position: usize },

    /// The action could not write its output.
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// Position at which the chain stopped, if the error belongs to one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Error::ResourceExhaustion { position, .. }
            | Error::Timeout { position }
            | Error::WorkerPanicked { position }
            | Error::Abandoned { position } => Some(*position),
            Error::InvalidArgument { .. } | Error::Output(_) => None,
        }
    }
}
