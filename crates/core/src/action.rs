// SPDX-License-Identifier: MIT

//! The central entity: one unit of administrative work, its state machine,
//! and the plugin capability it is driven through.

use crate::description::ActionDescription;
use crate::error::ActionResult;
use crate::id::ActionId;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The states an action moves through from admission to a terminal outcome.
/// Wire codes deliberately skip 4, left open for a future state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ActionState {
    Ready = 1,
    Executing = 2,
    /// An action whose last step returned `true` with an ok result,
    /// parked until `actionsBlock` elapses since its last attempt.
    Waiting = 3,
    Complete = 5,
    Failed = 6,
}

crate::simple_display! {
    ActionState {
        Ready => "ready",
        Executing => "executing",
        Waiting => "waiting",
        Complete => "complete",
        Failed => "failed",
    }
}

impl ActionState {
    pub fn wire_code(self) -> i32 {
        self as i32
    }

    /// COMPLETE and FAILED are sticky terminal states: once reached, an
    /// action never transitions again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// The capability set a plugin action implements.
///
/// A capability trait rather than a base class, since the set of plugins
/// is open-ended and new ones are added without touching this crate.
///
/// The dispatcher guarantees only one of `first`/`next` is ever in flight
/// for a given action at a time, but makes no guarantee the calls land on
/// the same worker thread — hence `Send` but not `Sync`.
pub trait ActionStep: Send {
    /// Called exactly once, when progress is 0.
    fn first(&mut self, ctx: &ActionContext) -> bool;

    /// Called on every subsequent step, when progress is greater than 0.
    fn next(&mut self, ctx: &ActionContext) -> bool;
}

/// Builds a concrete [`ActionStep`] from a description's `name`.
///
/// Implementations MUST return `None` for an unrecognized `name` — the
/// facade turns that into [`crate::error::SchedulerError::BadParameter`].
/// Called with the registry mutex held, so it must not block on other
/// maintenance operations.
pub trait ActionFactory: Send + Sync {
    fn build(
        &self,
        name: &str,
        description: &ActionDescription,
        properties: &serde_json::Value,
    ) -> Option<Box<dyn ActionStep>>;
}

/// Capability interface passed to a plugin's `first`/`next` calls, in place
/// of a back-pointer to the owning facade.
pub struct ActionContext<'a> {
    action: &'a Action,
    now_ms: u64,
    shutdown: &'a AtomicBool,
}

impl<'a> ActionContext<'a> {
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Actions are expected to be short-step; a long one MAY poll this
    /// between steps by returning `true` and checking it on the next call.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn description(&self) -> &ActionDescription {
        &self.action.description
    }

    pub fn properties(&self) -> &serde_json::Value {
        &self.action.properties
    }

    /// Set a non-ok result before returning from `first`/`next` to signal
    /// failure. Calling this with `code == 0` is equivalent to leaving the
    /// result untouched.
    pub fn fail(&self, code: i32, message: impl Into<String>) {
        self.action.mutable.lock().result = ActionResult::failure(code, message);
    }
}

struct Mutable {
    state: ActionState,
    progress: u64,
    result: ActionResult,
    created_at_ms: u64,
    started_at_ms: Option<u64>,
    finished_at_ms: Option<u64>,
    last_attempt_at_ms: Option<u64>,
}

/// One unit of administrative work: identity, state machine, progress
/// counter, last result, timestamps, and the boxed plugin step.
pub struct Action {
    id: ActionId,
    description: Arc<ActionDescription>,
    properties: serde_json::Value,
    step: Mutex<Box<dyn ActionStep>>,
    mutable: Mutex<Mutable>,
}

impl Action {
    pub fn new(
        id: ActionId,
        description: Arc<ActionDescription>,
        properties: serde_json::Value,
        step: Box<dyn ActionStep>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            description,
            properties,
            step: Mutex::new(step),
            mutable: Mutex::new(Mutable {
                state: ActionState::Ready,
                progress: 0,
                result: ActionResult::ok(),
                created_at_ms,
                started_at_ms: None,
                finished_at_ms: None,
                last_attempt_at_ms: None,
            }),
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn description(&self) -> &Arc<ActionDescription> {
        &self.description
    }

    pub fn properties(&self) -> &serde_json::Value {
        &self.properties
    }

    pub fn state(&self) -> ActionState {
        self.mutable.lock().state
    }

    pub fn progress(&self) -> u64 {
        self.mutable.lock().progress
    }

    pub fn result(&self) -> ActionResult {
        self.mutable.lock().result.clone()
    }

    /// True iff `state()` is terminal (COMPLETE or FAILED).
    pub fn done(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn created_at_ms(&self) -> u64 {
        self.mutable.lock().created_at_ms
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.mutable.lock().started_at_ms
    }

    pub fn finished_at_ms(&self) -> Option<u64> {
        self.mutable.lock().finished_at_ms
    }

    pub fn last_attempt_at_ms(&self) -> Option<u64> {
        self.mutable.lock().last_attempt_at_ms
    }

    /// Is this action eligible to run right now, given the retry-backoff
    /// window? READY actions always are; WAITING actions are eligible once
    /// `actions_block` has elapsed since `last_attempt_at_ms`.
    pub fn eligible_now(&self, now_ms: u64, actions_block_ms: u64) -> bool {
        let m = self.mutable.lock();
        match m.state {
            ActionState::Ready => true,
            ActionState::Waiting => match m.last_attempt_at_ms {
                Some(last) => now_ms.saturating_sub(last) >= actions_block_ms,
                None => true,
            },
            ActionState::Executing | ActionState::Complete | ActionState::Failed => false,
        }
    }

    /// Mark the action EXECUTING, recording `started_at_ms`/`last_attempt_at_ms`.
    fn begin_step(&self, now_ms: u64) -> u64 {
        let mut m = self.mutable.lock();
        m.state = ActionState::Executing;
        if m.started_at_ms.is_none() {
            m.started_at_ms = Some(now_ms);
        }
        m.last_attempt_at_ms = Some(now_ms);
        m.progress
    }
}

/// Outcome of driving an action through exactly one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTransition {
    /// The step left the action non-terminal; re-enqueue at the tail.
    Continue,
    /// The step reached a terminal state.
    Terminal(ActionState),
}

/// Drive `action` through exactly one `first()`/`next()` call and classify
/// the result into the next state: a step returning `false` with an ok
/// result completes the action; any non-ok result fails it; a step
/// returning `true` with an ok result continues it.
///
/// Used by both the dispatcher's worker loop and the synchronous
/// `executeNow` admission path, so the two share identical step semantics.
/// A panicking step is caught and converted into `INTERNAL_ERROR` + FAILED
/// rather than unwinding into the caller.
pub fn step_once(action: &Action, now_ms: u64, shutdown: &AtomicBool) -> StepTransition {
    let progress_before = action.begin_step(now_ms);
    let ctx = ActionContext { action, now_ms, shutdown };

    let panic_result = {
        let mut step = action.step.lock();
        catch_unwind(AssertUnwindSafe(|| {
            if progress_before == 0 {
                step.first(&ctx)
            } else {
                step.next(&ctx)
            }
        }))
    };

    let mut m = action.mutable.lock();

    // Progress counts completed *continuing* steps, not the final call that
    // reaches a terminal state: spec.md §8's boundaries are explicit that
    // an action whose first (and only) call is terminal ends at progress 0,
    // and one whose Nth call is the terminal one ends at progress N-1 (the
    // N-1 prior calls that each returned `true`).
    let new_state = match panic_result {
        Err(_) => {
            m.result = ActionResult::internal_error("action step panicked");
            ActionState::Failed
        }
        Ok(more) => {
            if !m.result.is_ok() {
                ActionState::Failed
            } else if more {
                m.progress += 1;
                // Parked as WAITING rather than left EXECUTING, so
                // `eligible_now` can gate the next attempt behind the
                // retry-backoff window before re-dispatching it.
                ActionState::Waiting
            } else {
                ActionState::Complete
            }
        }
    };

    m.state = new_state;
    if new_state.is_terminal() {
        m.finished_at_ms = Some(now_ms);
    }

    if new_state.is_terminal() {
        StepTransition::Terminal(new_state)
    } else {
        StepTransition::Continue
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
