//! Controller configuration
//!
//! Names the environment variables the controller and the default launcher
//! consult, and the tokens that count as "enabled".

use crate::error::SecurityError;
use serde::Deserialize;

/// Default enablement variable
pub const DEFAULT_ENABLEMENT_VAR: &str = "AZURE_FUNCTIONS_SECURITY_AGENT_ENABLED";

/// Default variable holding the agent trace log path
pub const DEFAULT_TRACE_LOG_VAR: &str = "SERVERLESS_SECURITY_LOG_CONFIG";

/// Security activation configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Variable that enables the agent
    pub enablement_var: String,
    /// Variable naming the trace log file written on agent start
    pub trace_log_var: String,
    /// Values treated as enabled (compared case-insensitively, trimmed)
    pub truthy_tokens: Vec<String>,
}

impl SecurityConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate from TOML
    ///
    /// # Errors
    /// `SecurityError::Config` on malformed TOML or failed validation
    pub fn from_toml_str(source: &str) -> Result<Self, SecurityError> {
        let config: Self =
            toml::from_str(source).map_err(|e| SecurityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// With enablement variable
    #[inline]
    #[must_use]
    pub fn with_enablement_var(mut self, name: impl Into<String>) -> Self {
        self.enablement_var = name.into();
        self
    }

    /// With trace log variable
    #[inline]
    #[must_use]
    pub fn with_trace_log_var(mut self, name: impl Into<String>) -> Self {
        self.trace_log_var = name.into();
        self
    }

    /// With truthy tokens
    #[inline]
    #[must_use]
    pub fn with_truthy_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.truthy_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    /// `SecurityError::Config` if a variable name is empty or no truthy token is set
    pub fn validate(&self) -> Result<(), SecurityError> {
        if self.enablement_var.trim().is_empty() {
            return Err(SecurityError::Config("enablement_var is empty".to_string()));
        }
        if self.trace_log_var.trim().is_empty() {
            return Err(SecurityError::Config("trace_log_var is empty".to_string()));
        }
        if self.truthy_tokens.iter().all(|t| t.trim().is_empty()) {
            return Err(SecurityError::Config("no truthy tokens configured".to_string()));
        }
        Ok(())
    }

    /// Check whether a raw variable value counts as enabled
    #[must_use]
    pub fn is_truthy(&self, value: &str) -> bool {
        let value = value.trim();
        !value.is_empty()
            && self
                .truthy_tokens
                .iter()
                .any(|token| token.trim().eq_ignore_ascii_case(value))
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enablement_var: DEFAULT_ENABLEMENT_VAR.to_string(),
            trace_log_var: DEFAULT_TRACE_LOG_VAR.to_string(),
            truthy_tokens: vec!["1".to_string(), "true".to_string()],
        }
    }
}
