//! End-to-end placeholder → specialized flow with the default agent launcher.

use slsec_activation::prelude::*;
use slsec_activation::{DEFAULT_TRACE_LOG_VAR, START_MARKER};
use slsec_test_utils::TraceCapture;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Host {
    env: Arc<InMemoryEnvironment>,
    gate: Arc<SpecializationGate>,
    controller: Arc<SecurityOptionsController>,
}

fn host() -> Host {
    let env = Arc::new(InMemoryEnvironment::new());
    let gate = Arc::new(SpecializationGate::new());
    let config = SecurityConfig::new();
    let launcher = Arc::new(ServerlessSecurityAgent::new(config.clone(), env.clone()));
    let controller = SecurityOptionsController::new(config, env.clone(), launcher, gate.clone())
        .unwrap();

    Host {
        env,
        gate,
        controller: Arc::new(controller),
    }
}

#[test]
fn test_security_agent_enabled_on_specialization() {
    let host = host();
    let capture = TraceCapture::new();

    capture.in_scope(|| {
        // Placeholder mode
        host.env.set_var(DEFAULT_ENABLEMENT_VAR, None);
        host.controller.start(&CancellationToken::new()).unwrap();
        assert!(!host.controller.current_value().enable_defender);

        host.env.set_var(DEFAULT_ENABLEMENT_VAR, Some("1"));
        assert!(!host.controller.current_value().enable_defender);
        assert_eq!(capture.count(START_MARKER), 0);

        // Specialization refreshes
        host.gate.signal().unwrap();
        assert!(host.controller.current_value().enable_defender);
        assert_eq!(host.controller.state(), ActivationState::Active);
        assert_eq!(capture.count(START_MARKER), 1);

        host.gate.signal().unwrap();
        assert_eq!(capture.count(START_MARKER), 1);
    });

    let messages = capture.messages();
    let marker_at = messages.iter().position(|m| m == START_MARKER).unwrap();
    let dispatch_at = messages
        .iter()
        .position(|m| m.starts_with("Host specialized"))
        .unwrap();
    assert!(dispatch_at < marker_at);
}

#[test]
fn test_trace_log_records_agent_start() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("tracelog.txt");

    let host = host();
    host.env
        .set_var(DEFAULT_TRACE_LOG_VAR, Some(log_path.to_str().unwrap()));
    host.controller.start(&CancellationToken::new()).unwrap();
    host.env.set_var(DEFAULT_ENABLEMENT_VAR, Some("1"));

    assert!(!log_path.exists());
    host.gate.signal().unwrap();
    host.gate.signal().unwrap();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let records: Vec<_> = contents
        .lines()
        .filter(|line| {
            line.split_once(',')
                .is_some_and(|(_, message)| message == format!(" message: {START_MARKER}"))
        })
        .collect();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_disabled_agent_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("tracelog.txt");

    let host = host();
    let capture = TraceCapture::new();
    host.env
        .set_var(DEFAULT_TRACE_LOG_VAR, Some(log_path.to_str().unwrap()));

    capture.in_scope(|| {
        host.controller.start(&CancellationToken::new()).unwrap();
        host.gate.signal().unwrap();
    });

    assert_eq!(host.controller.state(), ActivationState::Dormant);
    assert_eq!(capture.count(START_MARKER), 0);
    assert!(!log_path.exists());
}
