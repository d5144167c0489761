//! Error types for gesture detection and action dispatch.

use std::process::ExitStatus;

/// Errors raised by the detection core, session setup, and frame sources.
#[derive(Debug, thiserror::Error)]
pub enum GestureError {
    /// A hand arrived with the wrong number of landmarks.
    #[error("invalid hand: expected {expected} landmarks, got {got}")]
    InvalidInput { expected: usize, got: usize },

    /// A session or debouncer parameter was rejected at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A frame record could not be parsed.
    #[error("malformed frame on line {line}: {reason}")]
    Frame { line: usize, reason: String },

    /// Reading from the frame stream failed.
    #[error("frame source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a host action.  Opaque to the detection core.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: ExitStatus },
}
