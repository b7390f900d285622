//! Error taxonomy for the packaging core.

use thiserror::Error;

/// Failures surfaced by the builder, preflight check and session gate.
///
/// Process faults that happen mid-run travel through the event channel as
/// `RunEvent::Fault` instead; the variant here exists for callers that need to
/// turn such an event back into an error value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    /// A mandatory selection field was empty or blank.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// The packaging tool could not be reached, even after one install attempt.
    #[error("{tool} is not available: {reason}")]
    ToolUnavailable { tool: String, reason: String },

    /// Spawning or reading the child process failed.
    #[error("process fault: {0}")]
    ProcessFault(String),

    /// A run was requested while another one was still active.
    #[error("a packaging run is already in progress")]
    RunInProgress,
}

pub type PackResult<T> = std::result::Result<T, PackError>;
