//! Security agent lifecycle interface
//!
//! The agent itself is opaque; the controller only needs a way to start it.
//! [`ServerlessSecurityAgent`] is the default launcher: it emits the start
//! marker through `tracing` and, when the trace log variable names a file,
//! appends the same marker there.

use crate::config::SecurityConfig;
use crate::env::EnvironmentSource;
use crate::error::AgentStartError;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Marker emitted when the agent start handler runs
pub const START_MARKER: &str = "Start up Serverless Security Agent Handler.";

/// Handle to a started agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
}

impl AgentHandle {
    /// Create handle stamped now
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Agent ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the agent was started
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for AgentHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts the security agent
pub trait AgentLauncher: Send + Sync {
    /// Start the agent
    ///
    /// # Errors
    /// `AgentStartError` if the agent could not be started
    fn start_agent(&self) -> Result<AgentHandle, AgentStartError>;
}

/// Default launcher for the serverless security agent
pub struct ServerlessSecurityAgent {
    config: SecurityConfig,
    env: Arc<dyn EnvironmentSource>,
}

impl ServerlessSecurityAgent {
    /// Create launcher reading the trace log location from `env`
    #[must_use]
    pub fn new(config: SecurityConfig, env: Arc<dyn EnvironmentSource>) -> Self {
        Self { config, env }
    }

    fn trace_log_path(&self) -> Option<PathBuf> {
        match self.env.var(&self.config.trace_log_var) {
            Ok(Some(path)) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Trace log location unavailable: {}", e);
                None
            }
        }
    }
}

impl AgentLauncher for ServerlessSecurityAgent {
    fn start_agent(&self) -> Result<AgentHandle, AgentStartError> {
        let handle = AgentHandle::new();
        tracing::info!(agent_id = %handle.id(), "{}", START_MARKER);

        if let Some(path) = self.trace_log_path() {
            append_trace_record(&path, handle.started_at())?;
        }

        Ok(handle)
    }
}

impl std::fmt::Debug for ServerlessSecurityAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerlessSecurityAgent")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Append `<timestamp>, message: <marker>` to the trace log
fn append_trace_record(path: &Path, at: DateTime<Utc>) -> Result<(), AgentStartError> {
    let to_err = |source: std::io::Error| AgentStartError::TraceLog {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(to_err)?;
    writeln!(file, "{}, message: {}", at.to_rfc3339(), START_MARKER).map_err(to_err)
}
