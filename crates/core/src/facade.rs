// SPDX-License-Identifier: MIT

//! `MaintenanceFeature`: the public entry point combining the registry,
//! the dispatcher, and the host-lifecycle edges into one process-wide
//! facade.

use crate::action::ActionFactory;
use crate::clock::Clock;
use crate::description::ActionDescription;
use crate::dispatcher::{Dispatcher, SchedulerConfig};
use crate::document::RegistrySnapshot;
use crate::error::{ActionResult, SchedulerError};
use crate::lifecycle::ReadyGate;
use crate::registry::Registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Thin layer wiring [`Registry`] and [`Dispatcher`] together behind the
/// public surface spec.md §4.5 describes. Constructed once at host
/// feature-registration time and torn down at host shutdown, mirroring the
/// ancestor daemon's `Config`/`DaemonState` pairing: one struct owning
/// config plus the long-lived coordination state.
pub struct MaintenanceFeature<C: Clock + 'static> {
    registry: Registry,
    dispatcher: Dispatcher<C>,
    clock: C,
    factory: Arc<dyn ActionFactory>,
    ready: ReadyGate,
    shutdown: Arc<AtomicBool>,
}

impl<C: Clock + 'static> MaintenanceFeature<C> {
    pub fn new(clock: C, config: SchedulerConfig, factory: Arc<dyn ActionFactory>) -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Dispatcher::new(clock.clone(), config.actions_block_ms()),
            clock,
            factory,
            ready: ReadyGate::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The [`ReadyGate`] a host-lifecycle reporter should forward its
    /// `IN_WAIT` edge into (see [`crate::lifecycle::GateReporter`]).
    pub fn ready_gate(&self) -> &ReadyGate {
        &self.ready
    }

    /// Admit a description, deduplicating against any non-terminal action
    /// with the same identity (spec.md §4.3). Returns `TASK_DUPLICATE` if
    /// one already exists, `BAD_PARAMETER` if `name` is missing/unknown,
    /// `SHUTTING_DOWN` if shutdown has begun.
    ///
    /// When `execute_now` is true, the calling thread drives the action to
    /// completion before returning and receives its final `result`;
    /// otherwise the action is handed to the dispatcher and this returns
    /// as soon as admission succeeds, independent of eventual outcome.
    pub fn add_action(
        &self,
        description: ActionDescription,
        properties: serde_json::Value,
        execute_now: bool,
    ) -> Result<ActionResult, SchedulerError> {
        if self.shutdown.load(Ordering::SeqCst) {
            warn!("rejecting admission: shutting down");
            return Err(SchedulerError::ShuttingDown);
        }

        let dispatcher = &self.dispatcher;
        let (result, _action) = self.registry.admit(
            description,
            properties,
            execute_now,
            self.factory.as_ref(),
            &self.clock,
            &self.shutdown,
            |action| dispatcher.enqueue(action),
        )?;
        Ok(result)
    }

    /// Serialize the registry's current contents into the neutral
    /// structured document of spec.md §6.
    pub fn to_structured_document(&self) -> RegistrySnapshot {
        self.registry.serialize()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Configure the retry-backoff window. Safe to call at any time,
    /// including after workers have started — the dispatcher reads the
    /// current value on each loop iteration.
    pub fn set_seconds_actions_block(&self, seconds: u64) {
        self.dispatcher.set_actions_block_ms(seconds.saturating_mul(1000));
    }

    /// Block the calling thread until the host reports `IN_WAIT`, then
    /// atomically set the worker count and spawn the pool. Single-shot:
    /// calling this more than once per facade is undefined, matching
    /// spec.md §4.4.
    pub fn set_maintenance_threads_max(&self, n: usize) {
        self.dispatcher.start(n, &self.ready, self.shutdown.clone());
    }

    /// Begin shutdown: stop admitting new work, join every worker, and
    /// leave the registry's contents (terminal and non-terminal alike) in
    /// place for post-mortem inspection.
    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.dispatcher.shutdown();
    }

    pub fn evict_expired(&self, grace: std::time::Duration) {
        self.registry.evict_expired(self.clock.epoch_ms(), grace);
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
