// SPDX-License-Identifier: MIT

//! Admission-time errors and per-action execution results.
//!
//! Two distinct error shapes exist here: admission errors (this module's
//! [`SchedulerError`]) are returned
//! synchronously to the caller of [`crate::facade::MaintenanceFeature::add_action`];
//! execution errors are never propagated to the admitter — they are
//! recorded on the [`crate::action::Action`] as an [`ActionResult`] and
//! observed through the registry.

use crate::id::ActionId;
use thiserror::Error;

/// Errors raised while admitting a description, never while executing one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The description is missing the reserved `name` key, or names a
    /// plugin the factory does not recognize, or a config value was
    /// invalid.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// A non-terminal action with the same identity hash already exists.
    #[error("duplicate action: an equivalent action (id {existing}) is already non-terminal")]
    TaskDuplicate { existing: ActionId },

    /// Admission was attempted after the dispatcher began shutting down.
    #[error("scheduler is shutting down")]
    ShuttingDown,
}

/// Reserved result codes. Plugins are free to use any other `i32` value as
/// their own failure code; only `OK` is reserved by this crate.
pub mod result_code {
    /// `result.code == 0` means success.
    pub const OK: i32 = 0;

    /// A step function terminated abnormally (panicked) instead of
    /// returning normally. The dispatcher converts that into this code
    /// and a FAILED transition rather than propagating the panic.
    pub const INTERNAL_ERROR: i32 = -1;
}

/// The outcome of driving an action, as stored on the action itself.
///
/// `code == 0` is success; any other value is a plugin- (or dispatcher-)
/// defined failure code. This is intentionally not a `Result<(), E>` —
/// it has to be `Clone`able and stored on a long-lived entity, and its
/// `message` is diagnostic text rather than a typed error a caller handles.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActionResult {
    pub code: i32,
    pub message: String,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self { code: result_code::OK, message: String::new() }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        debug_assert_ne!(code, result_code::OK, "failure() called with the success code");
        Self { code, message: message.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::failure(result_code::INTERNAL_ERROR, message)
    }

    pub fn is_ok(&self) -> bool {
        self.code == result_code::OK
    }
}

impl Default for ActionResult {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
