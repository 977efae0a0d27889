//! Specialization gate
//!
//! A single-fire latch marking the placeholder → specialized transition.
//! Listeners registered before the gate fires run once, in registration
//! order, on the thread that calls [`SpecializationGate::signal`]. Listeners
//! registered afterwards run immediately on the registering thread.

use crate::error::SecurityError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot listener
pub type Listener = Box<dyn FnOnce() -> Result<(), SecurityError> + Send>;

/// Result of a `signal` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// This call fired the gate and ran the listeners
    Dispatched {
        /// Listeners invoked
        listeners: usize,
    },
    /// Gate had already fired; nothing ran
    AlreadySignaled,
}

/// Single-fire specialization latch
#[derive(Default)]
pub struct SpecializationGate {
    fired: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
}

impl SpecializationGate {
    /// Create unfired gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Has the host been specialized
    #[inline]
    #[must_use]
    pub fn is_specialized(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Listeners waiting for the signal
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Register a one-shot listener
    ///
    /// Registration order is kept only for listeners registered before the
    /// gate fires. A listener registered once the latch is set runs at once
    /// on this thread, possibly while `signal` is still dispatching earlier
    /// listeners on another.
    ///
    /// # Errors
    /// Only when the gate has already fired: the listener runs immediately
    /// and its error is returned.
    pub fn on_specialize<F>(&self, listener: F) -> Result<(), SecurityError>
    where
        F: FnOnce() -> Result<(), SecurityError> + Send + 'static,
    {
        let mut listeners = self.listeners.lock();
        // Checked under the lock: `signal` sets the latch before it drains.
        if self.fired.load(Ordering::Acquire) {
            drop(listeners);
            return listener();
        }
        listeners.push(Box::new(listener));
        Ok(())
    }

    /// Fire the gate
    ///
    /// Every listener runs even if an earlier one fails.
    ///
    /// # Errors
    /// The first listener failure; later failures are logged.
    pub fn signal(&self) -> Result<SignalOutcome, SecurityError> {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Specialization already signaled");
            return Ok(SignalOutcome::AlreadySignaled);
        }

        let listeners = std::mem::take(&mut *self.listeners.lock());
        let count = listeners.len();
        tracing::info!("Host specialized, dispatching {} listener(s)", count);

        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener() {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    tracing::error!("Specialization listener failed: {}", e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(SignalOutcome::Dispatched { listeners: count }),
        }
    }
}

impl std::fmt::Debug for SpecializationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecializationGate")
            .field("fired", &self.is_specialized())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn gate_starts_unfired() {
        let gate = SpecializationGate::new();
        assert!(!gate.is_specialized());
        assert_eq!(gate.listener_count(), 0);
    }

    #[test]
    fn listeners_run_in_order_once() {
        let gate = SpecializationGate::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            gate.on_specialize(move || {
                order.lock().push(i);
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(gate.listener_count(), 3);

        assert_eq!(
            gate.signal().unwrap(),
            SignalOutcome::Dispatched { listeners: 3 }
        );
        assert_eq!(gate.signal().unwrap(), SignalOutcome::AlreadySignaled);

        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(gate.listener_count(), 0);
        assert!(gate.is_specialized());
    }

    #[test]
    fn late_listener_runs_immediately() {
        let gate = SpecializationGate::new();
        gate.signal().unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        gate.on_specialize(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(gate.listener_count(), 0);
    }

    #[test]
    fn failing_listener_does_not_skip_others() {
        let gate = SpecializationGate::new();
        let ran = Arc::new(AtomicBool::new(false));

        gate.on_specialize(|| Err(SecurityError::Cancelled)).unwrap();
        let flag = Arc::clone(&ran);
        gate.on_specialize(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let result = gate.signal();
        assert!(matches!(result, Err(SecurityError::Cancelled)));
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(gate.signal().unwrap(), SignalOutcome::AlreadySignaled);
    }
}
