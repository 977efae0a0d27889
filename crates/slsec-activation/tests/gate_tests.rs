//! SpecializationGate Tests
//!
//! Latching and listener dispatch under repeated and concurrent signals.

use proptest::prelude::*;
use slsec_activation::{SignalOutcome, SpecializationGate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn counting_listener(gate: &SpecializationGate, counter: &Arc<AtomicUsize>) {
    let counter = Arc::clone(counter);
    gate.on_specialize(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_signal_without_listeners() {
    let gate = SpecializationGate::new();
    assert_eq!(
        gate.signal().unwrap(),
        SignalOutcome::Dispatched { listeners: 0 }
    );
    assert!(gate.is_specialized());
}

#[test]
fn test_concurrent_signals_fire_once() {
    let gate = Arc::new(SpecializationGate::new());
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..4 {
        counting_listener(&gate, &counter);
    }

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                gate.signal().unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let dispatched = outcomes
        .iter()
        .filter(|o| matches!(o, SignalOutcome::Dispatched { .. }))
        .count();

    assert_eq!(dispatched, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 4);
}

#[test]
fn test_registration_racing_signal_never_missed() {
    for _ in 0..50 {
        let gate = Arc::new(SpecializationGate::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));

        let registrar = {
            let gate = Arc::clone(&gate);
            let counter = Arc::clone(&counter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    counting_listener(&gate, &counter);
                }
            })
        };

        barrier.wait();
        gate.signal().unwrap();
        registrar.join().unwrap();

        // Every listener ran exactly once, whichever side of the latch it landed on.
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        assert_eq!(gate.listener_count(), 0);
        assert_eq!(gate.signal().unwrap(), SignalOutcome::AlreadySignaled);
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }
}

proptest! {
    #[test]
    fn prop_listeners_fire_exactly_once(listeners in 0usize..16, signals in 1usize..10) {
        let gate = SpecializationGate::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..listeners {
            counting_listener(&gate, &counter);
        }

        let dispatched = (0..signals)
            .map(|_| gate.signal().unwrap())
            .filter(|o| matches!(o, SignalOutcome::Dispatched { .. }))
            .count();

        prop_assert_eq!(dispatched, 1);
        prop_assert_eq!(counter.load(Ordering::SeqCst), listeners);
    }
}
