//! Environment sources
//!
//! The controller never touches `std::env` directly; it reads through an
//! [`EnvironmentSource`] so hosts and tests can supply their own view of the
//! environment.

use crate::config::SecurityConfig;
use crate::error::SecurityError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::env::VarError;

/// Read access to environment variables
pub trait EnvironmentSource: Send + Sync {
    /// Look up a variable; `Ok(None)` when unset
    ///
    /// # Errors
    /// `SecurityError::EnvironmentRead` if the environment cannot be read
    fn var(&self, name: &str) -> Result<Option<String>, SecurityError>;

    /// Read a boolean flag; unset or unrecognized values are `false`
    ///
    /// # Errors
    /// Propagates [`EnvironmentSource::var`] failures
    fn read_flag(&self, name: &str, config: &SecurityConfig) -> Result<bool, SecurityError> {
        Ok(self
            .var(name)?
            .is_some_and(|value| config.is_truthy(&value)))
    }
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, name: &str) -> Result<Option<String>, SecurityError> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(err @ VarError::NotUnicode(_)) => {
                Err(SecurityError::environment_read(name, err.to_string()))
            }
        }
    }
}

/// In-memory environment for hosts that manage their own settings
#[derive(Debug, Default)]
pub struct InMemoryEnvironment {
    vars: RwLock<HashMap<String, String>>,
}

impl InMemoryEnvironment {
    /// Create empty environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear a variable (`None` removes it)
    pub fn set_var(&self, name: impl Into<String>, value: Option<&str>) {
        let name = name.into();
        let mut vars = self.vars.write();
        match value {
            Some(value) => {
                vars.insert(name, value.to_string());
            }
            None => {
                vars.remove(&name);
            }
        }
    }

    /// Number of variables set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.read().len()
    }

    /// Check if no variables are set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.read().is_empty()
    }
}

impl EnvironmentSource for InMemoryEnvironment {
    fn var(&self, name: &str) -> Result<Option<String>, SecurityError> {
        Ok(self.vars.read().get(name).cloned())
    }
}
