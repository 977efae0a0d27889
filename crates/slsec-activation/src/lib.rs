//! SLSEC Activation - deferred start of the serverless security agent
//!
//! A placeholder host must not trust identity-dependent configuration. This
//! crate keeps the security agent dormant until the host is specialized:
//! - [`SpecializationGate`] latches the one-time specialization signal
//! - [`SecurityOptionsController`] reads the enablement flag only after the
//!   gate fires and starts the agent exactly once on activation
//!
//! # Example
//!
//! ```rust
//! use slsec_activation::prelude::*;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), SecurityError> {
//! let env = Arc::new(InMemoryEnvironment::new());
//! let gate = Arc::new(SpecializationGate::new());
//! let config = SecurityConfig::new();
//! let launcher = Arc::new(ServerlessSecurityAgent::new(config.clone(), env.clone()));
//! let controller = Arc::new(SecurityOptionsController::new(
//!     config,
//!     env.clone(),
//!     launcher,
//!     gate.clone(),
//! )?);
//!
//! controller.start(&CancellationToken::new())?;
//! env.set_var(DEFAULT_ENABLEMENT_VAR, Some("1"));
//! assert_eq!(controller.state(), ActivationState::Dormant);
//!
//! gate.signal()?;
//! assert_eq!(controller.state(), ActivationState::Active);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod agent;
pub mod config;
pub mod controller;
pub mod env;
pub mod error;
pub mod gate;
pub mod types;

pub use agent::{AgentHandle, AgentLauncher, ServerlessSecurityAgent, START_MARKER};
pub use config::{SecurityConfig, DEFAULT_ENABLEMENT_VAR, DEFAULT_TRACE_LOG_VAR};
pub use controller::SecurityOptionsController;
pub use env::{EnvironmentSource, InMemoryEnvironment, ProcessEnvironment};
pub use error::{AgentStartError, SecurityError};
pub use gate::{Listener, SignalOutcome, SpecializationGate};
pub use types::{ActivationState, SecurityOptions};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring the activation controller
    pub use crate::{
        ActivationState, AgentLauncher, InMemoryEnvironment, SecurityConfig, SecurityError,
        SecurityOptions, SecurityOptionsController, ServerlessSecurityAgent, SpecializationGate,
        DEFAULT_ENABLEMENT_VAR,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
