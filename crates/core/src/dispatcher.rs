// SPDX-License-Identifier: MIT

//! The bounded worker pool: pops READY/eligible-WAITING actions off a FIFO
//! queue and drives them through one step each, re-enqueueing anything
//! still non-terminal.

use crate::action::{step_once, Action, StepTransition};
use crate::clock::Clock;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, debug_span, info};

/// The two config inputs recognized by the scheduler (spec.md §6).
///
/// Plain `Copy` fields rather than a file-backed config type: the spec
/// says these values come from "host config", i.e. the embedding
/// application decides how to source them, not this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Worker pool size. Zero disables the pool entirely (synchronous-only
    /// mode via `executeNow`).
    pub maintenance_threads_max: usize,
    /// Minimum delay between a step that returned `true` and the next
    /// attempt at the same action. Zero disables backoff.
    pub seconds_actions_block: u64,
}

impl SchedulerConfig {
    pub fn actions_block_ms(&self) -> u64 {
        self.seconds_actions_block.saturating_mul(1000)
    }

    crate::setters! {
        set { maintenance_threads_max: usize, seconds_actions_block: u64 }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { maintenance_threads_max: 0, seconds_actions_block: 0 }
    }
}

struct Shared {
    queue: Mutex<VecDeque<Arc<Action>>>,
    not_empty: Condvar,
    shutdown: AtomicBool,
    actions_block_ms: Mutex<u64>,
}

/// Bounded OS-thread worker pool driving queued actions to completion.
///
/// Guarded by its own mutex + condvar, independent of the [`crate::registry::Registry`]'s
/// lock, per spec.md §5's shared-resource discipline: the queue and the
/// registry are separate pieces of shared state with separate locks.
pub struct Dispatcher<C: Clock + 'static> {
    shared: Arc<Shared>,
    clock: C,
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl<C: Clock + 'static> Dispatcher<C> {
    pub fn new(clock: C, actions_block_ms: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                not_empty: Condvar::new(),
                shutdown: AtomicBool::new(false),
                actions_block_ms: Mutex::new(actions_block_ms),
            }),
            clock,
            workers: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn set_actions_block_ms(&self, ms: u64) {
        *self.shared.actions_block_ms.lock() = ms;
    }

    /// Push a newly-admitted or re-enqueued action to the tail of the
    /// queue and wake one waiting worker.
    pub fn enqueue(&self, action: Arc<Action>) {
        self.shared.queue.lock().push_back(action);
        self.shared.not_empty.notify_one();
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Spawn `count` worker threads, after blocking the calling thread on
    /// `ready` until the host reports `IN_WAIT` (spec.md §4.4). Single-shot:
    /// calling this more than once is undefined, matching the spec.
    pub fn start(&self, count: usize, ready: &crate::lifecycle::ReadyGate, shutdown_flag: Arc<AtomicBool>) {
        ready.wait();
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(workers = count, "starting maintenance dispatcher");

        let mut workers = self.workers.lock();
        for index in 0..count {
            let shared = self.shared.clone();
            let clock = self.clock.clone();
            let shutdown_flag = shutdown_flag.clone();
            match std::thread::Builder::new()
                .name(format!("maint-worker-{index}"))
                .spawn(move || worker_loop(shared, clock, shutdown_flag))
            {
                Ok(handle) => workers.push(handle),
                Err(error) => {
                    tracing::error!(%error, index, "failed to spawn maintenance worker thread");
                }
            }
        }
    }

    /// Begin shutdown: stop accepting new dispatch, wake every worker, and
    /// join them all. Terminal and non-terminal actions are left in the
    /// registry for post-mortem inspection — this only tears down the
    /// thread pool, never the registry.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.not_empty.notify_all();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Find and remove the first action in `queue` eligible to run now, per
/// `Action::eligible_now`. Not necessarily the head: a WAITING action at
/// the head still inside its backoff window must not block a READY action
/// further back in the queue.
fn pop_eligible(
    queue: &mut VecDeque<Arc<Action>>,
    now_ms: u64,
    actions_block_ms: u64,
) -> Option<Arc<Action>> {
    let position = queue.iter().position(|a| a.eligible_now(now_ms, actions_block_ms))?;
    queue.remove(position)
}

fn worker_loop<C: Clock>(shared: Arc<Shared>, clock: C, shutdown_flag: Arc<AtomicBool>) {
    loop {
        let actions_block_ms = *shared.actions_block_ms.lock();
        let action = {
            let mut queue = shared.queue.lock();
            loop {
                if shared.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(action) = pop_eligible(&mut queue, clock.epoch_ms(), actions_block_ms) {
                    break action;
                }
                // Nothing eligible right now. If the queue holds a WAITING
                // action, wake up before its backoff window elapses rather
                // than sleeping indefinitely; otherwise wait for enqueue or
                // shutdown to signal.
                if queue.is_empty() {
                    shared.not_empty.wait(&mut queue);
                } else {
                    let _ = shared.not_empty.wait_for(&mut queue, Duration::from_millis(50));
                }
            }
        };

        let span = debug_span!("maintenance_step", action_id = %action.id());
        let _enter = span.enter();
        let action_name = action.description().name().unwrap_or("").to_string();
        debug!(action_name, "dispatching step");

        match step_once(&action, clock.epoch_ms(), &shutdown_flag) {
            StepTransition::Continue => {
                shared.queue.lock().push_back(action);
                shared.not_empty.notify_one();
            }
            StepTransition::Terminal(state) => {
                info!(action_name, %state, result = ?action.result(), "action reached terminal state");
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
