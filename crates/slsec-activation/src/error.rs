//! Error types for the activation controller
//!
//! Covers:
//! - Environment read failures
//! - Agent start failures
//! - Lifecycle misuse (double start, cancelled start)
//! - Configuration errors

use std::path::PathBuf;

/// Main activation error type
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// Environment could not be read
    #[error("environment read failed for {name}: {reason}")]
    EnvironmentRead {
        /// Variable that was being read
        name: String,
        /// Underlying reason
        reason: String,
    },

    /// Agent start action failed
    #[error("agent start failed: {0}")]
    AgentStart(#[from] AgentStartError),

    /// Controller started more than once
    #[error("controller already started")]
    DoubleStart,

    /// Start sequence aborted by its cancellation token
    #[error("start cancelled")]
    Cancelled,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl SecurityError {
    /// Create an environment read error
    #[inline]
    pub fn environment_read(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvironmentRead {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Programming errors that should fail the host rather than be logged
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DoubleStart | Self::Config(_))
    }
}

/// Agent start failures
#[derive(Debug, thiserror::Error)]
pub enum AgentStartError {
    /// The agent refused or failed to launch
    #[error("launch failed: {0}")]
    Launch(String),

    /// Trace log could not be written
    #[error("trace log {path:?} not writable: {source}")]
    TraceLog {
        /// Trace log path
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },
}
