// SPDX-License-Identifier: MIT

//! The two host-lifecycle edges this crate consumes.
//!
//! The embedding application's startup/shutdown framework is an external
//! collaborator this crate does not own. The coupling to it is reduced to
//! two broadcast-once edges: the host becoming fully initialized
//! (`IN_WAIT`), and the host beginning shutdown. Everything else a real
//! host framework reports is accepted and ignored.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// States a host lifecycle framework may report.
///
/// Only [`HostState::InWait`] is consumed; every other variant (including
/// ones a future host framework might add) is accepted and ignored, so this
/// type intentionally has an open-ended shape rather than being limited to
/// just the one state this crate cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostState {
    Uninitialized,
    Starting,
    /// The host has finished initializing and is waiting for work — the
    /// only edge the dispatcher gates its first worker spawn on.
    InWait,
    ShuttingDown,
    Stopped,
}

/// Callbacks a host lifecycle framework drives.
///
/// `state_change` reports the whole-host state; `feature_change` reports a
/// specific named feature's state. Both are accepted unconditionally; only
/// a `state_change(InWait)` has an observable effect (it flips the
/// [`ReadyGate`]).
pub trait HostLifecycleReporter: Send + Sync {
    fn state_change(&self, new_state: HostState);
    fn feature_change(&self, new_state: HostState, feature_name: &str);
}

/// The host-ready edge: an atomic flag plus a condvar, broadcast once.
///
/// [`Dispatcher::set_maintenance_threads_max`](crate::dispatcher::Dispatcher::set_maintenance_threads_max)
/// blocks on this gate before spawning any worker thread, so no action runs
/// a step before the host reports it is ready for work.
#[derive(Clone)]
pub struct ReadyGate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ReadyGate {
    pub fn new() -> Self {
        Self { inner: Arc::new((Mutex::new(false), Condvar::new())) }
    }

    /// Flip the gate open and wake every thread blocked on [`Self::wait`].
    ///
    /// Idempotent: flipping an already-open gate is a no-op broadcast.
    pub fn open(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock() = true;
        cvar.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block the calling thread until the gate is open.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut ready = lock.lock();
        while !*ready {
            cvar.wait(&mut ready);
        }
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`HostLifecycleReporter`] that forwards the one edge this crate cares
/// about to a [`ReadyGate`].
pub struct GateReporter {
    gate: ReadyGate,
}

impl GateReporter {
    pub fn new(gate: ReadyGate) -> Self {
        Self { gate }
    }
}

impl HostLifecycleReporter for GateReporter {
    fn state_change(&self, new_state: HostState) {
        if new_state == HostState::InWait {
            self.gate.open();
        }
    }

    fn feature_change(&self, _new_state: HostState, _feature_name: &str) {
        // Accepted, intentionally ignored: no feature-level state currently
        // changes this crate's behavior.
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
