//! Core types for the activation controller

use serde::{Deserialize, Serialize};

/// Whether the security agent has been activated in this process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum ActivationState {
    /// Placeholder mode or agent not enabled
    #[default]
    Dormant,
    /// Agent enabled after specialization
    Active,
}

impl ActivationState {
    /// Compute state from the enablement flag and the gate
    #[inline]
    #[must_use]
    pub fn compute(enabled: bool, specialized: bool) -> Self {
        if enabled && specialized {
            Self::Active
        } else {
            Self::Dormant
        }
    }

    /// Check if active
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Latch: once active, stays active
    #[inline]
    #[must_use]
    pub fn latch(self, next: Self) -> Self {
        if self.is_active() {
            Self::Active
        } else {
            next
        }
    }
}

impl std::fmt::Display for ActivationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dormant => write!(f, "dormant"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Snapshot published by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityOptions {
    /// Raw enablement flag as last read
    pub enable_defender: bool,
    /// Computed activation state
    pub state: ActivationState,
}

impl SecurityOptions {
    /// Create snapshot
    #[inline]
    #[must_use]
    pub fn new(enable_defender: bool, state: ActivationState) -> Self {
        Self {
            enable_defender,
            state,
        }
    }
}
