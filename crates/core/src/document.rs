// SPDX-License-Identifier: MIT

//! The neutral structured document a registry snapshot is serialized into.

use crate::action::{Action, ActionState};
use crate::id::ActionId;

/// One record in a serialized registry snapshot.
///
/// Field set and meaning mirror [`Action`]'s public accessors; this is the
/// wire projection rather than the live entity, so it is plain owned data
/// rather than anything mutex-guarded.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub state: i32,
    pub result_code: i32,
    pub result_message: String,
    pub progress: u64,
    pub name: String,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub finished_at_ms: Option<u64>,
}

impl ActionRecord {
    pub fn from_action(action: &Action) -> Self {
        let result = action.result();
        Self {
            id: action.id(),
            state: action.state().wire_code(),
            result_code: result.code,
            result_message: result.message,
            progress: action.progress(),
            name: action.description().name().unwrap_or("").to_string(),
            created_at_ms: action.created_at_ms(),
            started_at_ms: action.started_at_ms(),
            finished_at_ms: action.finished_at_ms(),
        }
    }

    pub fn state(&self) -> Option<ActionState> {
        match self.state {
            1 => Some(ActionState::Ready),
            2 => Some(ActionState::Executing),
            3 => Some(ActionState::Waiting),
            5 => Some(ActionState::Complete),
            6 => Some(ActionState::Failed),
            _ => None,
        }
    }
}

// A fixed field set, unlike `ActionDescription`'s open-ended map, so this
// is exactly what `builder!` is for.
crate::builder! {
    pub struct ActionRecordBuilder => ActionRecord {
        into {
            result_message: String = "",
            name: String = "test",
        }
        set {
            id: ActionId = ActionId::from_raw(1),
            state: i32 = 1,
            result_code: i32 = 0,
            progress: u64 = 0,
            created_at_ms: u64 = 0,
        }
        option {
            started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
        }
    }
}

/// An ordered, point-in-time view of every action in a registry, in
/// admission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RegistrySnapshot {
    pub records: Vec<ActionRecord>,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(bytes: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(bytes)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
