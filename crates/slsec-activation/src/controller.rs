//! Security options controller
//!
//! Owns the published [`SecurityOptions`] snapshot and recomputes it from the
//! environment when a refresh is permitted:
//! - once at [`SecurityOptionsController::start`], forced dormant
//! - once more when the [`SpecializationGate`] fires
//!
//! On the Dormant → Active transition the agent launcher is invoked before
//! the new snapshot is published. The launcher runs at most once per
//! controller. A failed launch is reported to the caller but the snapshot
//! still reflects the configuration: activation state and agent health are
//! independent.

use crate::agent::{AgentHandle, AgentLauncher, ServerlessSecurityAgent};
use crate::config::SecurityConfig;
use crate::env::{EnvironmentSource, ProcessEnvironment};
use crate::error::SecurityError;
use crate::gate::SpecializationGate;
use crate::types::{ActivationState, SecurityOptions};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Agent bookkeeping, guarded by the refresh lock
#[derive(Debug, Default)]
struct AgentSlot {
    handle: Option<AgentHandle>,
    start_attempted: bool,
}

/// Deferred-activation controller for the security agent
pub struct SecurityOptionsController {
    config: SecurityConfig,
    env: Arc<dyn EnvironmentSource>,
    launcher: Arc<dyn AgentLauncher>,
    gate: Arc<SpecializationGate>,
    started: AtomicBool,
    /// Serializes refreshes; readers go through `current`
    agent: Mutex<AgentSlot>,
    current: watch::Sender<SecurityOptions>,
}

impl SecurityOptionsController {
    /// Create dormant controller
    ///
    /// # Errors
    /// `SecurityError::Config` if `config` is invalid
    pub fn new(
        config: SecurityConfig,
        env: Arc<dyn EnvironmentSource>,
        launcher: Arc<dyn AgentLauncher>,
        gate: Arc<SpecializationGate>,
    ) -> Result<Self, SecurityError> {
        config.validate()?;
        let (current, _) = watch::channel(SecurityOptions::default());
        Ok(Self {
            config,
            env,
            launcher,
            gate,
            started: AtomicBool::new(false),
            agent: Mutex::new(AgentSlot::default()),
            current,
        })
    }

    /// Controller wired to the process environment and the default launcher
    ///
    /// # Errors
    /// `SecurityError::Config` if `config` is invalid
    pub fn for_process(
        config: SecurityConfig,
        gate: Arc<SpecializationGate>,
    ) -> Result<Self, SecurityError> {
        let env: Arc<dyn EnvironmentSource> = Arc::new(ProcessEnvironment);
        let launcher = Arc::new(ServerlessSecurityAgent::new(config.clone(), Arc::clone(&env)));
        Self::new(config, env, launcher, gate)
    }

    /// Last published snapshot
    #[inline]
    #[must_use]
    pub fn current_value(&self) -> SecurityOptions {
        *self.current.borrow()
    }

    /// Current activation state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ActivationState {
        self.current_value().state
    }

    /// Last read enablement flag
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.current_value().enable_defender
    }

    /// Receive every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SecurityOptions> {
        self.current.subscribe()
    }

    /// Handle of the started agent, if any
    #[must_use]
    pub fn agent_handle(&self) -> Option<AgentHandle> {
        self.agent.lock().handle.clone()
    }

    /// Whether the launcher has been invoked
    #[must_use]
    pub fn agent_start_attempted(&self) -> bool {
        self.agent.lock().start_attempted
    }

    /// Whether `start` has been called
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// The gate this controller listens on
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &Arc<SpecializationGate> {
        &self.gate
    }

    /// Compute the initial snapshot and subscribe to specialization
    ///
    /// `cancel` only aborts this sequence; once registered, the
    /// specialization refresh always runs. A cancelled start registers
    /// nothing and may be retried. If the gate has already fired, the
    /// specialization refresh runs before this returns.
    ///
    /// # Errors
    /// - `SecurityError::DoubleStart` on a second call
    /// - `SecurityError::Cancelled` if `cancel` fired before registration
    /// - any refresh error when the gate had already fired
    pub fn start(self: &Arc<Self>, cancel: &CancellationToken) -> Result<(), SecurityError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::error!("Security options controller started twice");
            return Err(SecurityError::DoubleStart);
        }

        // Forced dormant: no environment read, no launch, nothing to undo.
        self.recompute(false)?;

        if cancel.is_cancelled() {
            tracing::warn!("Start cancelled before specialization registration");
            self.started.store(false, Ordering::Release);
            return Err(SecurityError::Cancelled);
        }

        let controller = Arc::downgrade(self);
        self.gate.on_specialize(move || match controller.upgrade() {
            Some(controller) => controller.refresh().map(|_| ()),
            None => Ok(()),
        })
    }

    /// Recompute from the environment if the gate allows it
    pub(crate) fn refresh(&self) -> Result<SecurityOptions, SecurityError> {
        self.recompute(self.gate.is_specialized())
    }

    fn recompute(&self, specialized: bool) -> Result<SecurityOptions, SecurityError> {
        let mut agent = self.agent.lock();
        let previous = self.current_value();

        // The flag is untrusted in placeholder mode and is not read at all.
        let enabled = if specialized {
            match self.env.read_flag(&self.config.enablement_var, &self.config) {
                Ok(enabled) => enabled,
                Err(e) => {
                    tracing::warn!("Keeping {} after failed refresh: {}", previous.state, e);
                    return Err(e);
                }
            }
        } else {
            false
        };

        let state = previous
            .state
            .latch(ActivationState::compute(enabled, specialized));
        let next = SecurityOptions::new(enabled, state);

        let mut launch = Ok(());
        if !previous.state.is_active() && state.is_active() && !agent.start_attempted {
            agent.start_attempted = true;
            match self.launcher.start_agent() {
                Ok(handle) => {
                    tracing::info!(agent_id = %handle.id(), "Security agent started");
                    agent.handle = Some(handle);
                }
                Err(e) => {
                    tracing::error!("Security agent failed to start: {}", e);
                    launch = Err(e);
                }
            }
        }

        self.current.send_replace(next);
        tracing::debug!(
            enabled = next.enable_defender,
            state = %next.state,
            specialized,
            "Security options refreshed"
        );

        launch?;
        Ok(next)
    }
}

impl std::fmt::Debug for SecurityOptionsController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityOptionsController")
            .field("config", &self.config)
            .field("current", &self.current_value())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}
