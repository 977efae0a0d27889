//! Testing utilities for SLSEC workspace
//!
//! Shared fakes and fixtures: a launcher that records invocations, a
//! `tracing` layer that keeps event messages in memory, and a host fixture
//! wiring both into a controller.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use slsec_activation::{
    AgentHandle, AgentLauncher, AgentStartError, InMemoryEnvironment, SecurityConfig,
    SecurityOptionsController, SpecializationGate,
};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

/// Launcher that records every invocation
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    invocations: Mutex<Vec<DateTime<Utc>>>,
    fail_with: Option<String>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose every start fails with `reason`
    pub fn failing(reason: &str) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }

    pub fn invocations(&self) -> Vec<DateTime<Utc>> {
        self.invocations.lock().clone()
    }
}

impl AgentLauncher for RecordingLauncher {
    fn start_agent(&self) -> Result<AgentHandle, AgentStartError> {
        self.invocations.lock().push(Utc::now());
        match &self.fail_with {
            Some(reason) => Err(AgentStartError::Launch(reason.clone())),
            None => Ok(AgentHandle::new()),
        }
    }
}

/// In-memory sink for `tracing` event messages
#[derive(Debug, Clone, Default)]
pub struct TraceCapture {
    messages: Arc<Mutex<Vec<String>>>,
}

impl TraceCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Number of captured events whose message equals `marker`
    pub fn count(&self, marker: &str) -> usize {
        self.messages.lock().iter().filter(|m| *m == marker).count()
    }

    /// Run `f` with a subscriber that feeds this capture
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for TraceCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.messages.lock().push(message);
        }
    }
}

/// Controller wired to an in-memory environment and a recording launcher
pub struct TestHost {
    pub env: Arc<InMemoryEnvironment>,
    pub gate: Arc<SpecializationGate>,
    pub launcher: Arc<RecordingLauncher>,
    pub controller: Arc<SecurityOptionsController>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_launcher(RecordingLauncher::new())
    }

    pub fn with_launcher(launcher: RecordingLauncher) -> Self {
        let env = Arc::new(InMemoryEnvironment::new());
        let gate = Arc::new(SpecializationGate::new());
        let launcher = Arc::new(launcher);
        let controller = SecurityOptionsController::new(
            SecurityConfig::new(),
            env.clone(),
            launcher.clone(),
            gate.clone(),
        )
        .unwrap();

        Self {
            env,
            gate,
            launcher,
            controller: Arc::new(controller),
        }
    }

    /// Set the enablement variable (`None` clears it)
    pub fn set_enabled(&self, value: Option<&str>) {
        self.env
            .set_var(slsec_activation::DEFAULT_ENABLEMENT_VAR, value);
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
