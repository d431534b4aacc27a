// SPDX-License-Identifier: MIT

//! The shared, process-lifetime index of every admitted action.

use crate::action::{Action, ActionFactory};
use crate::clock::Clock;
use crate::description::ActionDescription;
use crate::document::{ActionRecord, RegistrySnapshot};
use crate::error::{ActionResult, SchedulerError};
use crate::id::{ActionId, ActionIdGen};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

struct Inner {
    ids: ActionIdGen,
    by_id: HashMap<ActionId, Arc<Action>>,
    /// Identity hash -> id of the current non-terminal action with that
    /// identity, if any. Evicted the moment the action goes terminal would
    /// be wrong (a terminal action is still looked up by hash in tests and
    /// diagnostics) so this only ever holds non-terminal entries and is
    /// cleared lazily by [`Registry::reindex_terminal`].
    non_terminal_by_hash: HashMap<u64, ActionId>,
    order: Vec<ActionId>,
}

/// Owns every [`Action`] ever admitted this process lifetime. Guarded by a
/// single mutex covering the id counter, the hash index, and the
/// insertion-order list — mirrors the shared-resource discipline of a
/// single lock over a small set of tightly related collections.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ids: ActionIdGen::new(),
                by_id: HashMap::new(),
                non_terminal_by_hash: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Admit a description, building a concrete [`Action`] via `factory` if
    /// no non-terminal action with the same identity already exists.
    ///
    /// `enqueue` is called with the new action iff `execute_now` is false;
    /// it is the registry's only coupling to the dispatcher, kept as a
    /// closure so this module does not need to know the dispatcher's type.
    /// When `execute_now` is true the action is driven to completion on the
    /// calling thread instead, and `enqueue` is never called.
    #[allow(clippy::too_many_arguments)]
    pub fn admit(
        &self,
        description: ActionDescription,
        properties: serde_json::Value,
        execute_now: bool,
        factory: &dyn ActionFactory,
        clock: &dyn Clock,
        shutdown: &AtomicBool,
        enqueue: impl FnOnce(Arc<Action>),
    ) -> Result<(ActionResult, Arc<Action>), SchedulerError> {
        let name = description.name()?.to_string();
        let hash = description.identity_hash();

        let action = {
            let mut inner = self.inner.lock();

            if let Some(&existing) = inner.non_terminal_by_hash.get(&hash) {
                let existing_action = inner.by_id[&existing].clone();
                warn!(existing = %existing, %hash, "rejecting duplicate admission");
                return Err(SchedulerError::TaskDuplicate { existing: existing_action.id() });
            }

            let step = factory
                .build(&name, &description, &properties)
                .ok_or_else(|| SchedulerError::BadParameter(format!("unknown action: {name}")))?;

            let id = inner.ids.next();
            let action = Arc::new(Action::new(
                id,
                Arc::new(description),
                properties,
                step,
                clock.epoch_ms(),
            ));

            inner.by_id.insert(id, action.clone());
            inner.non_terminal_by_hash.insert(hash, id);
            inner.order.push(id);
            debug!(%id, name, "admitted action");
            action
        };

        if execute_now {
            self.drive_to_completion(&action, clock, shutdown);
            let result = action.result();
            self.reindex_if_terminal(hash, &action);
            Ok((result, action))
        } else {
            enqueue(action.clone());
            self.reindex_if_terminal(hash, &action);
            Ok((ActionResult::ok(), action))
        }
    }

    fn drive_to_completion(&self, action: &Arc<Action>, clock: &dyn Clock, shutdown: &AtomicBool) {
        loop {
            match crate::action::step_once(action, clock.epoch_ms(), shutdown) {
                crate::action::StepTransition::Terminal(_) => break,
                crate::action::StepTransition::Continue => continue,
            }
        }
    }

    /// Remove a completed/failed action's non-terminal hash entry, so a
    /// future admission with the same identity is no longer rejected.
    fn reindex_if_terminal(&self, hash: u64, action: &Action) {
        if action.done() {
            let mut inner = self.inner.lock();
            if inner.non_terminal_by_hash.get(&hash) == Some(&action.id()) {
                inner.non_terminal_by_hash.remove(&hash);
            }
        }
    }

    pub fn lookup(&self, id: ActionId) -> Option<Arc<Action>> {
        self.inner.lock().by_id.get(&id).cloned()
    }

    pub fn lookup_by_hash(&self, hash: u64) -> Option<Arc<Action>> {
        let inner = self.inner.lock();
        inner.non_terminal_by_hash.get(&hash).and_then(|id| inner.by_id.get(id)).cloned()
    }

    /// Snapshot-stable iteration in admission order: the returned vector
    /// will not observe actions admitted after this call returns.
    pub fn iterate(&self) -> Vec<Arc<Action>> {
        let inner = self.inner.lock();
        inner.order.iter().map(|id| inner.by_id[id].clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize every action, in admission order, into a neutral
    /// structured document for diagnostics.
    pub fn serialize(&self) -> RegistrySnapshot {
        let records = self.iterate().iter().map(|a| ActionRecord::from_action(a)).collect();
        RegistrySnapshot { records }
    }

    /// Evict terminal actions whose `finished_at_ms` is older than `grace`,
    /// relative to `now_ms`. Non-terminal actions are never evicted. Not
    /// run on a background timer by this crate: the embedder calls this
    /// from whatever idle loop it already has, since an unrequested
    /// always-on background thread is more machinery than the policy
    /// ("MAY be evicted") demands.
    pub fn evict_expired(&self, now_ms: u64, grace: Duration) {
        let grace_ms = grace.as_millis() as u64;
        let mut inner = self.inner.lock();
        let expired: Vec<ActionId> = inner
            .order
            .iter()
            .filter(|id| {
                let action = &inner.by_id[id];
                action.done()
                    && action
                        .finished_at_ms()
                        .is_some_and(|finished| now_ms.saturating_sub(finished) >= grace_ms)
            })
            .copied()
            .collect();

        for id in &expired {
            inner.by_id.remove(id);
        }
        if !expired.is_empty() {
            let expired: std::collections::HashSet<_> = expired.into_iter().collect();
            inner.order.retain(|id| !expired.contains(id));
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
