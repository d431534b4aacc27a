// SPDX-License-Identifier: MIT

//! Monotonic action identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an [`crate::action::Action`], assigned at admission.
///
/// IDs are monotonically increasing for the lifetime of the process that
/// allocated them, so id ordering always matches admission ordering.
/// Unlike the nanoid-based IDs used elsewhere in this lineage, an
/// `ActionId` is a plain counter — identity here is "the Nth action
/// admitted this process", not a random token meant to be unguessable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ActionId(u64);

impl ActionId {
    /// Construct an `ActionId` from a raw value.
    ///
    /// Only meant for deserialization and for the [`ActionIdGen`] below;
    /// application code should treat the value as opaque.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocates strictly increasing [`ActionId`]s.
///
/// A plain `AtomicU64` counter starting at 1 (0 is reserved as "no id" for
/// callers that want a sentinel). Shared behind the registry's mutex in
/// practice, but the counter itself is lock-free so cloning an `ActionIdGen`
/// handle is cheap and safe to hand to tests that want to pre-seed ids.
#[derive(Debug, Default)]
pub struct ActionIdGen {
    next: AtomicU64,
}

impl ActionIdGen {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Allocate the next id. Monotonic across calls from any thread.
    pub fn next(&self) -> ActionId {
        ActionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
